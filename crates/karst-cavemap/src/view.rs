//! Chunk-bound query views.
//!
//! A view pins everything a chunk query needs up front: the cube of
//! fragments whose rotated extent covers the chunk plus its margin, the 2×2
//! surface tiles under its footprint, and (at fine voxel sizes) the fractal
//! field that perturbs query heights. After construction every query is
//! lock-free; dropping the view releases the pinned fragments.
//!
//! Near the terrain surface the cave lattice yields to the surface biome so
//! the two maps meet without seams: any query within the surface band
//! returns the column's surface biome instead of a cave cell.

use std::sync::Arc;

use glam::IVec3;
use karst_math::{
    FRAGMENT_SHIFT, FRAGMENT_SIZE, GridPoint, rotate, select_grid_point, tetrahedron_at,
    vertical_extent,
};
use karst_terrain::{Biome, BiomeField, BiomeId, FractalNoise, SurfaceTile};

use crate::fragment::{BiomeFragment, FragmentPosition};
use crate::generator::GeneratorError;
use crate::seed::{derive_cell_seed, derive_column_seed};
use crate::service::CaveBiomeService;

/// How [`CaveBiomeMapView::bulk_interpolate_value`] writes its results.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BulkMode {
    /// Add `scale · value` onto the existing grid contents.
    Add,
}

/// Surface band extent below the surface height, in voxels.
const BAND_BELOW_VOXELS: i32 = 32;
/// Surface band extent above the surface height, in world units (plus one
/// voxel).
const BAND_ABOVE: i32 = 128;

/// Feature period of the z-perturbation field.
const PERTURB_PERIOD: f64 = 64.0;
/// Salt mixed into the world seed for the perturbation field.
const PERTURB_SEED_MIX: u64 = 0x7649_2368_4396;
/// Perturbation switches off at this voxel size and above.
const PERTURB_MAX_VOXEL: i32 = 8;

/// A transient snapshot of the cave biome map around one chunk.
pub struct CaveBiomeMapView<'a> {
    service: &'a CaveBiomeService,
    origin: IVec3,
    width: i32,
    voxel_size: i32,
    margin: i32,
    frag_start: IVec3,
    frags_per_axis: i32,
    fragments: Vec<Arc<BiomeFragment>>,
    surface_tiles: [Arc<SurfaceTile>; 4],
    z_perturb: Option<FractalNoise>,
}

impl<'a> CaveBiomeMapView<'a> {
    pub(crate) fn new(
        service: &'a CaveBiomeService,
        origin: IVec3,
        width: i32,
        voxel_size: i32,
        margin: i32,
    ) -> Result<Self, GeneratorError> {
        assert!(width > 0 && voxel_size > 0 && margin >= 0);
        assert!(
            width + 2 * margin <= SurfaceTile::span(voxel_size),
            "view footprint {width}+2·{margin} exceeds the 2×2 surface tile cover"
        );

        // The rotation stretches an axis-aligned box by up to this factor
        // per 1024 units; the extra fragment plus the expansion term keep
        // every query (and every interpolation anchor) inside coverage.
        let expansion = rotate(IVec3::splat(1024)).abs().max_element() as i64;
        let span = (width + margin + FRAGMENT_SIZE) as i64 * expansion;
        let per_frag = 1024 * FRAGMENT_SIZE as i64;
        let frags_per_axis = 1 + ((span + per_frag - 1) / per_frag) as i32;

        let center = rotate(origin + IVec3::splat(width / 2));
        let frag_start = IVec3::new(
            (center.x >> FRAGMENT_SHIFT) - frags_per_axis / 2,
            (center.y >> FRAGMENT_SHIFT) - frags_per_axis / 2,
            (center.z >> FRAGMENT_SHIFT) - frags_per_axis / 2,
        );

        let mut fragments = Vec::with_capacity((frags_per_axis.pow(3)) as usize);
        for fx in 0..frags_per_axis {
            for fy in 0..frags_per_axis {
                for fz in 0..frags_per_axis {
                    let coords = IVec3::new(
                        (frag_start.x + fx) << FRAGMENT_SHIFT,
                        (frag_start.y + fy) << FRAGMENT_SHIFT,
                        (frag_start.z + fz) << FRAGMENT_SHIFT,
                    );
                    fragments.push(service.fragment(FragmentPosition { coords, voxel_size })?);
                }
            }
        }

        let qx = origin.x - margin;
        let qy = origin.y - margin;
        let tile_span = SurfaceTile::span(voxel_size);
        let surface = service.surface();
        let surface_tiles = [
            surface.get_or_generate(qx, qy, voxel_size),
            surface.get_or_generate(qx, qy + tile_span, voxel_size),
            surface.get_or_generate(qx + tile_span, qy, voxel_size),
            surface.get_or_generate(qx + tile_span, qy + tile_span, voxel_size),
        ];

        let z_perturb = (voxel_size < PERTURB_MAX_VOXEL)
            .then(|| FractalNoise::new(service.world_seed() ^ PERTURB_SEED_MIX, PERTURB_PERIOD));

        Ok(Self {
            service,
            origin,
            width,
            voxel_size,
            margin,
            frag_start,
            frags_per_axis,
            fragments,
            surface_tiles,
            z_perturb,
        })
    }

    /// Surface height of the column at `(wx, wy)`.
    pub fn get_surface_height(&self, wx: i32, wy: i32) -> i32 {
        self.tile_for(wx, wy).get_height(wx, wy)
    }

    /// The biome at a position relative to the view origin.
    pub fn get_biome(&self, rel: IVec3) -> &Biome {
        let w = self.world_of(rel);
        let palette = self.service.palette();
        if let Some(id) = self.surface_biome(w) {
            return palette.get(id);
        }
        palette.get(self.resolve(self.cave_grid_point(w)))
    }

    /// The biome plus a stable 64-bit seed for it.
    pub fn get_biome_and_seed(&self, rel: IVec3) -> (&Biome, u64) {
        let w = self.world_of(rel);
        let palette = self.service.palette();
        if let Some(id) = self.surface_biome(w) {
            let seed = derive_column_seed(self.service.world_seed(), w.x, w.y);
            return (palette.get(id), seed);
        }
        let g = self.cave_grid_point(w);
        let seed = derive_cell_seed(self.service.world_seed(), g.pos, g.parity);
        (palette.get(self.resolve(g)), seed)
    }

    /// The biome, its seed, and how far up the column it keeps applying.
    ///
    /// On return `return_height` is the largest verified height `h` (a
    /// multiple of the voxel size, at most its input value) such that the
    /// column stays in the current biome below `h`: surface queries stay in
    /// the surface band, cave queries stay in the same lattice cell. Nothing
    /// is claimed about the position at `h` itself.
    pub fn get_biome_column_and_seed(
        &self,
        rel: IVec3,
        return_height: &mut i32,
    ) -> (&Biome, u64) {
        let w = self.world_of(rel);
        let vs = self.voxel_size;
        let palette = self.service.palette();

        let tile = self.tile_for(w.x, w.y);
        let height = tile.get_height(w.x, w.y);
        let (bottom, top) = self.surface_band(height);
        if (bottom..=top).contains(&w.z) {
            // Valid until the column exits the band upward.
            let exit = ((top - w.z) / vs) * vs + vs;
            *return_height = (*return_height).min(exit).max(0);
            let seed = derive_column_seed(self.service.world_seed(), w.x, w.y);
            return (palette.get(tile.get_biome(w.x, w.y)), seed);
        }
        if w.z < bottom {
            // Cap the cave run where the column would enter the band.
            let entry = ((bottom - w.z - 1) / vs) * vs + vs;
            *return_height = (*return_height).min(entry).max(0);
        }

        let column = IVec3::new(w.x, w.y, self.perturbed_z(w));
        let (g, run) = vertical_extent(column, vs, *return_height);
        *return_height = run;
        let seed = derive_cell_seed(self.service.world_seed(), g.pos, g.parity);
        (palette.get(self.resolve(g)), seed)
    }

    /// Barycentric interpolation of a biome scalar at a world position.
    ///
    /// Interpolation reads the raw cave lattice: neither the surface
    /// override nor the z-perturbation applies.
    pub fn interpolate_value(&self, w: IVec3, field: BiomeField) -> f32 {
        self.check_bounds(w - self.origin);
        let palette = self.service.palette();
        let tetra = tetrahedron_at(rotate(w));
        tetra
            .anchors
            .iter()
            .zip(tetra.weights)
            .map(|(anchor, weight)| weight * palette.get(self.resolve(*anchor)).field(field))
            .sum()
    }

    /// Evaluate [`Self::interpolate_value`] over a cubic grid of `side`
    /// points spaced `voxel_size` apart starting at `grid_origin`, writing
    /// `scale · value` into `out` per `mode`.
    ///
    /// `out` is indexed as `(x · side + y) · side + z` and must hold exactly
    /// `side³` values.
    pub fn bulk_interpolate_value(
        &self,
        field: BiomeField,
        grid_origin: IVec3,
        voxel_size: i32,
        side: usize,
        out: &mut [f32],
        mode: BulkMode,
        scale: f32,
    ) {
        assert_eq!(out.len(), side.pow(3), "output grid size mismatch");
        let mut index = 0;
        for gx in 0..side as i32 {
            for gy in 0..side as i32 {
                for gz in 0..side as i32 {
                    let w = grid_origin + IVec3::new(gx, gy, gz) * voxel_size;
                    let value = self.interpolate_value(w, field);
                    match mode {
                        BulkMode::Add => out[index] += scale * value,
                    }
                    index += 1;
                }
            }
        }
    }

    pub(crate) fn fragments(&self) -> &[Arc<BiomeFragment>] {
        &self.fragments
    }

    // --- internals ---

    fn check_bounds(&self, rel: IVec3) {
        let lo = -self.margin;
        let hi = self.width + self.margin;
        assert!(
            (lo..hi).contains(&rel.x) && (lo..hi).contains(&rel.y) && (lo..hi).contains(&rel.z),
            "query {rel} outside view bounds [{lo}, {hi})"
        );
    }

    fn world_of(&self, rel: IVec3) -> IVec3 {
        self.check_bounds(rel);
        self.origin + rel
    }

    fn tile_for(&self, wx: i32, wy: i32) -> &SurfaceTile {
        let span = SurfaceTile::span(self.voxel_size);
        let (ox, oy) = self.surface_tiles[0].origin();
        let ix = (wx >= ox + span) as usize;
        let iy = (wy >= oy + span) as usize;
        &self.surface_tiles[ix * 2 + iy]
    }

    #[inline]
    fn surface_band(&self, surface_height: i32) -> (i32, i32) {
        (
            surface_height - BAND_BELOW_VOXELS * self.voxel_size,
            surface_height + BAND_ABOVE + self.voxel_size,
        )
    }

    /// The surface biome if `w` falls inside the surface band of its column.
    fn surface_biome(&self, w: IVec3) -> Option<BiomeId> {
        let tile = self.tile_for(w.x, w.y);
        let (bottom, top) = self.surface_band(tile.get_height(w.x, w.y));
        (bottom..=top)
            .contains(&w.z)
            .then(|| tile.get_biome(w.x, w.y))
    }

    #[inline]
    fn perturbed_z(&self, w: IVec3) -> i32 {
        match &self.z_perturb {
            Some(noise) => w.z + noise.get_value(w.x, w.y).round() as i32,
            None => w.z,
        }
    }

    fn cave_grid_point(&self, w: IVec3) -> GridPoint {
        let softened = IVec3::new(w.x, w.y, self.perturbed_z(w));
        select_grid_point(rotate(softened))
    }

    /// Fragment-array lookup of a grid point's biome.
    fn resolve(&self, g: GridPoint) -> BiomeId {
        let f = IVec3::new(
            (g.pos.x >> FRAGMENT_SHIFT) - self.frag_start.x,
            (g.pos.y >> FRAGMENT_SHIFT) - self.frag_start.y,
            (g.pos.z >> FRAGMENT_SHIFT) - self.frag_start.z,
        );
        let n = self.frags_per_axis;
        assert!(
            (0..n).contains(&f.x) && (0..n).contains(&f.y) && (0..n).contains(&f.z),
            "grid point {} outside view coverage",
            g.pos
        );
        let index = ((f.x * n + f.y) * n + f.z) as usize;
        self.fragments[index].get(g)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::CELLS_PER_FRAGMENT;
    use crate::generator::{
        CaveBiomeGenerator, GeneratorError, GeneratorRegistry, RandomBiomeGenerator,
    };
    use karst_config::{GeneratorConfig, SurfaceConfig, WorldGenConfig};
    use karst_math::{CELL_SHIFT, LatticeParity};
    use karst_terrain::{BiomePalette, SurfaceMap};
    use std::sync::Mutex;
    use std::sync::Weak;

    /// Deterministic generator: biome index is a fixed linear pattern of the
    /// global cell coordinates, identical on both sub-lattices.
    struct PatternGenerator {
        ids: Vec<BiomeId>,
    }

    impl CaveBiomeGenerator for PatternGenerator {
        fn id(&self) -> &str {
            "test:pattern"
        }
        fn priority(&self) -> i32 {
            0
        }
        fn generator_seed(&self) -> u64 {
            0
        }
        fn init(&mut self, _: &GeneratorConfig) -> Result<(), GeneratorError> {
            Ok(())
        }
        fn generate(
            &self,
            fragment: &mut crate::fragment::BiomeFragment,
            _: u64,
        ) -> Result<(), GeneratorError> {
            let n = self.ids.len() as i32;
            for index in 0..CELLS_PER_FRAGMENT {
                let cell = fragment.cell_origin(index);
                let (cx, cy, cz) = (cell.x >> CELL_SHIFT, cell.y >> CELL_SHIFT, cell.z >> CELL_SHIFT);
                let pick = self.ids[(cx + 3 * cy + 7 * cz).rem_euclid(n) as usize];
                fragment.set_cell(index, LatticeParity::Even, pick);
                fragment.set_cell(index, LatticeParity::Odd, pick);
            }
            Ok(())
        }
    }

    struct FailingGenerator;

    impl CaveBiomeGenerator for FailingGenerator {
        fn id(&self) -> &str {
            "test:failing"
        }
        fn priority(&self) -> i32 {
            0
        }
        fn generator_seed(&self) -> u64 {
            0
        }
        fn init(&mut self, _: &GeneratorConfig) -> Result<(), GeneratorError> {
            Ok(())
        }
        fn generate(
            &self,
            _: &mut crate::fragment::BiomeFragment,
            _: u64,
        ) -> Result<(), GeneratorError> {
            Err(GeneratorError::Failed {
                id: "test:failing".to_string(),
                reason: "synthetic".to_string(),
            })
        }
    }

    fn test_biome(name: &str) -> Biome {
        Biome {
            name: name.to_string(),
            roughness: 1.0,
            hills: 0.25,
            mountains: 0.0,
            caves: 0.5,
        }
    }

    enum Gen {
        Pattern,
        Random,
        Failing,
    }

    /// A service with four cave biomes b0..b3 and one surface biome
    /// "topsoil" over a perfectly flat surface at `base_height`.
    fn make_service(seed: u64, base_height: i32, generator: Gen) -> CaveBiomeService {
        let mut palette = BiomePalette::new();
        let cave_ids: Vec<BiomeId> = (0..4)
            .map(|i| palette.register(test_biome(&format!("b{i}"))).unwrap())
            .collect();
        let topsoil = palette.register(test_biome("topsoil")).unwrap();
        let palette = Arc::new(palette);

        let surface_config = SurfaceConfig {
            amplitude: 0.0,
            base_height,
            ..Default::default()
        };
        let surface = Arc::new(SurfaceMap::new(
            &palette,
            vec![topsoil],
            seed,
            &surface_config,
        ));

        let mut registry = GeneratorRegistry::new();
        match generator {
            Gen::Pattern => registry.register(Box::new(PatternGenerator { ids: cave_ids })),
            Gen::Random => registry.register(Box::new(RandomBiomeGenerator::new(
                Arc::clone(&palette),
                cave_ids,
            ))),
            Gen::Failing => registry.register(Box::new(FailingGenerator)),
        }
        let profile = registry
            .into_profile(&WorldGenConfig::default(), seed)
            .unwrap();
        CaveBiomeService::new(profile, palette, surface)
    }

    /// Surface far above everything: cave queries below never hit the band.
    const SKY_HIGH: i32 = 10_000;

    #[test]
    fn test_biome_at_world_origin() {
        // Seed 12345: the origin lies in cell (0,0,0) of the even lattice
        // (the perturbation field is zero at the origin), so the pattern
        // assigns b0.
        let service = make_service(12_345, SKY_HIGH, Gen::Pattern);
        let view = service.view(IVec3::splat(-64), 128, 1, 32).unwrap();
        let (biome, seed_a) = view.get_biome_and_seed(IVec3::splat(64));
        assert_eq!(biome.name, "b0");

        // The seed output is stable across runs and service instances.
        let service_b = make_service(12_345, SKY_HIGH, Gen::Pattern);
        let view_b = service_b.view(IVec3::splat(-64), 128, 1, 32).unwrap();
        let (_, seed_b) = view_b.get_biome_and_seed(IVec3::splat(64));
        assert_eq!(seed_a, seed_b);
    }

    #[test]
    fn test_point_query_deterministic_across_services() {
        // World point (64,64,64) resolves through rotation, perturbation
        // and grid selection; whatever it lands on must be identical for
        // every service built from the same seed.
        let a = make_service(12_345, SKY_HIGH, Gen::Random);
        let b = make_service(12_345, SKY_HIGH, Gen::Random);
        let view_a = a.view(IVec3::ZERO, 128, 1, 32).unwrap();
        let view_b = b.view(IVec3::ZERO, 128, 1, 32).unwrap();
        for rel in [
            IVec3::new(64, 64, 64),
            IVec3::new(0, 0, 0),
            IVec3::new(127, 1, 90),
            IVec3::new(-20, 150, 3),
        ] {
            let (biome_a, seed_a) = view_a.get_biome_and_seed(rel);
            let (biome_b, seed_b) = view_b.get_biome_and_seed(rel);
            assert_eq!(biome_a.name, biome_b.name, "biome diverged at {rel}");
            assert_eq!(seed_a, seed_b, "seed diverged at {rel}");
        }
    }

    #[test]
    fn test_world_seed_changes_the_map() {
        let a = make_service(1, SKY_HIGH, Gen::Random);
        let b = make_service(2, SKY_HIGH, Gen::Random);
        let view_a = a.view(IVec3::ZERO, 192, 1, 32).unwrap();
        let view_b = b.view(IVec3::ZERO, 192, 1, 32).unwrap();
        let diverged = (0..64).any(|i| {
            let rel = IVec3::new(i * 3, i * 2, i);
            view_a.get_biome(rel).name != view_b.get_biome(rel).name
        });
        assert!(diverged, "different world seeds must change the map");
    }

    #[test]
    fn test_column_height_contract() {
        // S3: at (1000,1000,0) the column reports a positive run whose last
        // verified voxel still carries the starting biome.
        let service = make_service(12_345, SKY_HIGH, Gen::Pattern);
        let view = service.view(IVec3::new(904, 904, -32), 192, 1, 32).unwrap();
        let rel = IVec3::new(96, 96, 32);

        let mut height = 1000;
        let (biome, _) = view.get_biome_column_and_seed(rel, &mut height);
        assert!(height > 0, "column run must be positive");
        assert!(height <= 1000);
        assert_eq!(
            view.get_biome(rel + IVec3::new(0, 0, height - 1)).name,
            biome.name,
            "biome changed below the reported height"
        );
        assert_eq!(view.get_biome(rel).name, biome.name);
    }

    #[test]
    fn test_column_height_deterministic() {
        let service = make_service(777, SKY_HIGH, Gen::Pattern);
        let view = service.view(IVec3::ZERO, 192, 1, 32).unwrap();
        for i in 0..32 {
            let rel = IVec3::new(i * 5, 160 - i * 5, i);
            let mut h1 = 500;
            let mut h2 = 500;
            let (b1, s1) = view.get_biome_column_and_seed(rel, &mut h1);
            let (b2, s2) = view.get_biome_column_and_seed(rel, &mut h2);
            assert_eq!(h1, h2);
            assert_eq!(b1.name, b2.name);
            assert_eq!(s1, s2);
        }
    }

    #[test]
    fn test_interpolation_partition_of_unity() {
        // S4: every biome has roughness 1.0, so interpolation must return
        // 1.0 everywhere up to f32 rounding.
        let service = make_service(12_345, SKY_HIGH, Gen::Pattern);
        let view = service.view(IVec3::ZERO, 64, 1, 32).unwrap();
        for x in 0..64 {
            for y in 0..64 {
                for z in 0..64 {
                    let v = view.interpolate_value(IVec3::new(x, y, z), BiomeField::Roughness);
                    assert!(
                        (v - 1.0).abs() < 1e-5,
                        "interpolation broke partition of unity at ({x},{y},{z}): {v}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_uniform_field_interpolates_exactly() {
        // Every biome carries caves = 0.5, so any barycentric combination
        // must land back on 0.5.
        let service = make_service(9, SKY_HIGH, Gen::Random);
        let view = service.view(IVec3::ZERO, 64, 1, 32).unwrap();
        for i in 0..200 {
            let w = IVec3::new(i % 64, (i * 7) % 64, (i * 13) % 64);
            let v = view.interpolate_value(w, BiomeField::Caves);
            assert!(
                (0.5 - 1e-4..=0.5 + 1e-4).contains(&v),
                "uniform field must interpolate to itself, got {v}"
            );
        }
    }

    #[test]
    fn test_bulk_interpolation_accumulates() {
        let service = make_service(5, SKY_HIGH, Gen::Pattern);
        let view = service.view(IVec3::ZERO, 64, 1, 32).unwrap();
        let side = 8;
        let mut grid = vec![1.0_f32; side * side * side];
        let origin = IVec3::splat(16);
        view.bulk_interpolate_value(
            BiomeField::Roughness,
            origin,
            2,
            side,
            &mut grid,
            BulkMode::Add,
            0.5,
        );
        let mut index = 0;
        for x in 0..side as i32 {
            for y in 0..side as i32 {
                for z in 0..side as i32 {
                    let w = origin + IVec3::new(x, y, z) * 2;
                    let expected = 1.0 + 0.5 * view.interpolate_value(w, BiomeField::Roughness);
                    assert!(
                        (grid[index] - expected).abs() < 1e-6,
                        "bulk mismatch at {w}: {} vs {expected}",
                        grid[index]
                    );
                    index += 1;
                }
            }
        }
    }

    #[test]
    fn test_overlapping_views_share_fragments() {
        // S5: fragments under two overlapping views are the same
        // allocations, not copies.
        let service = make_service(12_345, SKY_HIGH, Gen::Pattern);
        let view_a = service.view(IVec3::ZERO, 128, 1, 32).unwrap();
        let view_b = service.view(IVec3::splat(64), 128, 1, 32).unwrap();
        let mut shared = 0;
        for fa in view_a.fragments() {
            for fb in view_b.fragments() {
                if fa.position() == fb.position() {
                    assert!(Arc::ptr_eq(fa, fb), "duplicate fragment for one position");
                    shared += 1;
                }
            }
        }
        assert!(shared > 0, "overlapping views must share fragments");
    }

    #[test]
    fn test_parallel_views_release_all_fragments() {
        // S6: 1024 views across 8 threads; once the views are gone and the
        // cache cleared, every fragment is destroyed.
        let service = make_service(42, SKY_HIGH, Gen::Pattern);
        let weaks: Mutex<Vec<Weak<crate::fragment::BiomeFragment>>> = Mutex::new(Vec::new());
        std::thread::scope(|scope| {
            for thread in 0..8 {
                let service = &service;
                let weaks = &weaks;
                scope.spawn(move || {
                    for i in 0..128 {
                        let origin = IVec3::new((thread * 16 + i % 16) as i32, (i / 16) * 8, 0);
                        let view = service.view(origin, 128, 1, 32).unwrap();
                        let mut collected: Vec<_> =
                            view.fragments().iter().map(Arc::downgrade).collect();
                        weaks.lock().unwrap().append(&mut collected);
                        let _ = view.get_biome(IVec3::new(5, 5, 5));
                    }
                });
            }
        });
        service.clear_cache();
        assert_eq!(service.cached_fragments(), 0);
        let weaks = weaks.into_inner().unwrap();
        assert!(!weaks.is_empty());
        assert!(
            weaks.iter().all(|w| w.upgrade().is_none()),
            "fragments survived cache clear and view teardown"
        );
    }

    #[test]
    fn test_surface_band_overrides_cave() {
        // Property 7: inside [h - 32·vs, h + 128 + vs] the surface biome
        // wins; outside, the cave lattice answers.
        let service = make_service(3, 0, Gen::Pattern);
        let view = service.view(IVec3::new(0, 0, -64), 192, 1, 32).unwrap();
        assert_eq!(view.get_surface_height(10, 10), 0);

        let biome_at = |z: i32| view.get_biome(IVec3::new(10, 10, z + 64)).name.clone();
        assert_eq!(biome_at(-32), "topsoil", "band bottom included");
        assert_eq!(biome_at(129), "topsoil", "band top included");
        assert_ne!(biome_at(-33), "topsoil", "below the band is cave");
        assert_ne!(biome_at(130), "topsoil", "above the band is cave");
    }

    #[test]
    fn test_column_clamps_at_band_entry() {
        let service = make_service(3, 0, Gen::Pattern);
        let view = service.view(IVec3::new(0, 0, -64), 192, 1, 32).unwrap();

        // Below the band: the cave run stops before z = -32.
        let mut height = 1000;
        let (biome, _) = view.get_biome_column_and_seed(IVec3::new(10, 10, 4), &mut height);
        assert_ne!(biome.name, "topsoil");
        assert!(height > 0);
        assert!(height <= 28, "run {height} crosses into the surface band");

        // Inside the band: the surface run stops at the band's top exit.
        let mut height = 1000;
        let (biome, _) = view.get_biome_column_and_seed(IVec3::new(10, 10, 164), &mut height);
        assert_eq!(biome.name, "topsoil");
        assert!(height > 0);
        assert!(height <= 30, "run {height} exceeds the band top at z=129");
    }

    #[test]
    fn test_coarse_voxels_skip_perturbation() {
        // At voxel size 8 the perturbation is off: queries resolve exactly
        // to the lattice prediction.
        let service = make_service(11, SKY_HIGH, Gen::Pattern);
        let view = service.view(IVec3::ZERO, 256, 8, 256).unwrap();
        for i in 0..64 {
            let rel = IVec3::new(i * 4, 256 - i * 4, i * 8 - 200);
            let w = rel; // origin is zero
            let g = select_grid_point(rotate(w));
            let expected = (g.pos.x >> CELL_SHIFT)
                + 3 * (g.pos.y >> CELL_SHIFT)
                + 7 * (g.pos.z >> CELL_SHIFT);
            let expected = format!("b{}", expected.rem_euclid(4));
            assert_eq!(view.get_biome(rel).name, expected, "mismatch at {rel}");
        }
    }

    #[test]
    fn test_failing_generator_caches_nothing() {
        let service = make_service(1, SKY_HIGH, Gen::Failing);
        let err = service.view(IVec3::ZERO, 128, 1, 32);
        assert!(err.is_err());
        assert_eq!(service.cached_fragments(), 0);
    }

    #[test]
    #[should_panic(expected = "outside view bounds")]
    fn test_out_of_bounds_query_panics() {
        let service = make_service(1, SKY_HIGH, Gen::Pattern);
        let view = service.view(IVec3::ZERO, 128, 1, 32).unwrap();
        view.get_biome(IVec3::new(-33, 0, 0));
    }

    #[test]
    #[should_panic(expected = "outside view bounds")]
    fn test_out_of_bounds_interpolation_panics() {
        let service = make_service(1, SKY_HIGH, Gen::Pattern);
        let view = service.view(IVec3::ZERO, 128, 1, 32).unwrap();
        view.interpolate_value(IVec3::new(0, 0, 161), BiomeField::Hills);
    }
}
