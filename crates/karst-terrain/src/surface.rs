//! Surface tiles: cached per-column height and surface biome.
//!
//! The cave biome map only ever asks the surface two questions — how high is
//! this column, and which biome sits on top of it — so the surface is served
//! as immutable square tiles behind a shared cache. Tiles are keyed by
//! origin and voxel size; once published through an `Arc` they are never
//! mutated.

use std::sync::{Arc, Mutex};

use noise::{NoiseFn, Simplex};
use rustc_hash::FxHashMap;

use karst_config::SurfaceConfig;

use crate::biome::{BiomeId, BiomePalette};
use crate::heightmap::HeightField;

/// Columns along one side of a surface tile.
pub const MAP_TILE_SIZE: i32 = 256;

/// Frequency of the surface-biome selector noise.
const BIOME_FREQUENCY: f64 = 0.004;

/// One immutable square of surface data.
pub struct SurfaceTile {
    origin_x: i32,
    origin_y: i32,
    voxel_size: i32,
    heights: Box<[i32]>,
    biomes: Box<[BiomeId]>,
}

impl SurfaceTile {
    /// World-unit span of a tile at the given voxel size.
    #[inline]
    pub fn span(voxel_size: i32) -> i32 {
        MAP_TILE_SIZE * voxel_size
    }

    /// Tile origin (lower corner) in world units.
    #[inline]
    pub fn origin(&self) -> (i32, i32) {
        (self.origin_x, self.origin_y)
    }

    #[inline]
    fn column(&self, wx: i32, wy: i32) -> usize {
        let lx = (wx - self.origin_x) / self.voxel_size;
        let ly = (wy - self.origin_y) / self.voxel_size;
        assert!(
            (0..MAP_TILE_SIZE).contains(&lx) && (0..MAP_TILE_SIZE).contains(&ly),
            "column ({wx}, {wy}) outside tile at ({}, {})",
            self.origin_x,
            self.origin_y
        );
        (lx * MAP_TILE_SIZE + ly) as usize
    }

    /// Surface height of the column containing `(wx, wy)`.
    #[inline]
    pub fn get_height(&self, wx: i32, wy: i32) -> i32 {
        self.heights[self.column(wx, wy)]
    }

    /// Surface biome of the column containing `(wx, wy)`.
    #[inline]
    pub fn get_biome(&self, wx: i32, wy: i32) -> BiomeId {
        self.biomes[self.column(wx, wy)]
    }
}

/// Generates and caches surface tiles.
pub struct SurfaceMap {
    height_field: HeightField,
    biome_noise: Simplex,
    surface_biomes: Vec<BiomeId>,
    tiles: Mutex<FxHashMap<(i32, i32, i32), Arc<SurfaceTile>>>,
}

impl SurfaceMap {
    /// Creates a surface map assigning columns biomes from `surface_biomes`.
    ///
    /// The biome selector noise is decorrelated from the height noise by a
    /// seed offset, the way every paired noise field here is.
    pub fn new(
        palette: &BiomePalette,
        surface_biomes: Vec<BiomeId>,
        seed: u64,
        config: &SurfaceConfig,
    ) -> Self {
        assert!(
            !surface_biomes.is_empty(),
            "surface map needs at least one biome"
        );
        debug_assert!(surface_biomes.iter().all(|id| (id.0 as usize) < palette.len()));
        Self {
            height_field: HeightField::new(seed, config),
            biome_noise: Simplex::new(seed.wrapping_add(0x51BE_11E5) as u32),
            surface_biomes,
            tiles: Mutex::new(FxHashMap::default()),
        }
    }

    /// The tile containing the column `(wx, wy)` at the given voxel size,
    /// generating it on first access.
    pub fn get_or_generate(&self, wx: i32, wy: i32, voxel_size: i32) -> Arc<SurfaceTile> {
        let span = SurfaceTile::span(voxel_size);
        let origin_x = wx.div_euclid(span) * span;
        let origin_y = wy.div_euclid(span) * span;
        let key = (origin_x, origin_y, voxel_size);

        let mut tiles = self.tiles.lock().unwrap();
        if let Some(tile) = tiles.get(&key) {
            return Arc::clone(tile);
        }
        let tile = Arc::new(self.generate(origin_x, origin_y, voxel_size));
        tracing::debug!(origin_x, origin_y, voxel_size, "generated surface tile");
        tiles.insert(key, Arc::clone(&tile));
        tile
    }

    /// Surface height shortcut for callers without a tile in hand.
    pub fn height(&self, wx: i32, wy: i32) -> i32 {
        self.height_field.sample(wx, wy)
    }

    fn generate(&self, origin_x: i32, origin_y: i32, voxel_size: i32) -> SurfaceTile {
        let count = (MAP_TILE_SIZE * MAP_TILE_SIZE) as usize;
        let mut heights = Vec::with_capacity(count);
        let mut biomes = Vec::with_capacity(count);
        for lx in 0..MAP_TILE_SIZE {
            for ly in 0..MAP_TILE_SIZE {
                let wx = origin_x + lx * voxel_size;
                let wy = origin_y + ly * voxel_size;
                heights.push(self.height_field.sample(wx, wy));
                biomes.push(self.pick_biome(wx, wy));
            }
        }
        SurfaceTile {
            origin_x,
            origin_y,
            voxel_size,
            heights: heights.into_boxed_slice(),
            biomes: biomes.into_boxed_slice(),
        }
    }

    fn pick_biome(&self, wx: i32, wy: i32) -> BiomeId {
        let v = self
            .biome_noise
            .get([wx as f64 * BIOME_FREQUENCY, wy as f64 * BIOME_FREQUENCY]);
        let n = self.surface_biomes.len();
        let idx = (((v + 1.0) * 0.5) * n as f64) as usize;
        self.surface_biomes[idx.min(n - 1)]
    }
}
