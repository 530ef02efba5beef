//! Biome fragments: precomputed cubes of rotated-lattice cells.
//!
//! A fragment covers [`FRAGMENT_SIZE`]³ units of rotated space as 16³ cells,
//! each carrying one biome per sub-lattice. Fragments are filled by the
//! generator chain while exclusively owned, then published behind an `Arc`
//! and never touched again; the cache and every live view share the same
//! allocation.

use glam::IVec3;
use karst_math::{
    CELL_SHIFT, CELLS_PER_AXIS, FRAGMENT_SIZE, GridPoint, LatticeParity,
};
use karst_terrain::BiomeId;

/// Cells in one fragment.
pub const CELLS_PER_FRAGMENT: usize =
    (CELLS_PER_AXIS * CELLS_PER_AXIS * CELLS_PER_AXIS) as usize;

/// Identity of a fragment: its aligned corner in rotated space plus the
/// voxel size it was generated for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FragmentPosition {
    /// Lower corner, a multiple of [`FRAGMENT_SIZE`] on every axis.
    pub coords: IVec3,
    pub voxel_size: i32,
}

impl FragmentPosition {
    /// The fragment containing a rotated-space point.
    #[inline]
    pub fn containing(r: IVec3, voxel_size: i32) -> Self {
        let mask = !(FRAGMENT_SIZE - 1);
        Self {
            coords: IVec3::new(r.x & mask, r.y & mask, r.z & mask),
            voxel_size,
        }
    }
}

/// An immutable cube of biome cells.
pub struct BiomeFragment {
    pos: FragmentPosition,
    cells: Box<[[BiomeId; 2]]>,
}

impl BiomeFragment {
    /// Allocates a fragment with every cell of both sub-lattices set to
    /// `fill`. Generators overwrite the cells before the fragment is
    /// published.
    pub fn new(pos: FragmentPosition, fill: BiomeId) -> Self {
        debug_assert!(pos.coords.x & (FRAGMENT_SIZE - 1) == 0);
        debug_assert!(pos.coords.y & (FRAGMENT_SIZE - 1) == 0);
        debug_assert!(pos.coords.z & (FRAGMENT_SIZE - 1) == 0);
        Self {
            pos,
            cells: vec![[fill; 2]; CELLS_PER_FRAGMENT].into_boxed_slice(),
        }
    }

    #[inline]
    pub fn position(&self) -> FragmentPosition {
        self.pos
    }

    /// Flat index of the cell containing a rotated-space point. Only the
    /// fragment-local bits participate, so any point of the fragment (site
    /// or interior) resolves without pre-masking.
    #[inline]
    pub fn cell_index(p: IVec3) -> usize {
        let local_mask = FRAGMENT_SIZE - 1;
        let cx = (p.x & local_mask) >> CELL_SHIFT;
        let cy = (p.y & local_mask) >> CELL_SHIFT;
        let cz = (p.z & local_mask) >> CELL_SHIFT;
        ((cx * CELLS_PER_AXIS + cy) * CELLS_PER_AXIS + cz) as usize
    }

    /// Rotated-space corner of a cell by flat index, in world-lattice
    /// (not fragment-local) coordinates.
    #[inline]
    pub fn cell_origin(&self, index: usize) -> IVec3 {
        let index = index as i32;
        let cz = index % CELLS_PER_AXIS;
        let cy = (index / CELLS_PER_AXIS) % CELLS_PER_AXIS;
        let cx = index / (CELLS_PER_AXIS * CELLS_PER_AXIS);
        self.pos.coords + IVec3::new(cx << CELL_SHIFT, cy << CELL_SHIFT, cz << CELL_SHIFT)
    }

    /// The biome at a resolved grid point.
    #[inline]
    pub fn get(&self, g: GridPoint) -> BiomeId {
        self.cells[Self::cell_index(g.pos)][g.parity.index()]
    }

    /// Sets one sub-lattice entry of one cell. Only callable before the
    /// fragment is shared.
    #[inline]
    pub fn set_cell(&mut self, index: usize, parity: LatticeParity, id: BiomeId) {
        self.cells[index][parity.index()] = id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(x: i32, y: i32, z: i32) -> FragmentPosition {
        FragmentPosition {
            coords: IVec3::new(x, y, z),
            voxel_size: 1,
        }
    }

    #[test]
    fn test_containing_aligns_down() {
        let p = FragmentPosition::containing(IVec3::new(2049, -1, 0), 1);
        assert_eq!(p.coords, IVec3::new(2048, -2048, 0));
    }

    #[test]
    fn test_cell_index_is_local() {
        // Identical local coordinates in different fragments share an index.
        let a = BiomeFragment::cell_index(IVec3::new(130, 260, 390));
        let b = BiomeFragment::cell_index(IVec3::new(130 + 2048, 260 - 4096, 390));
        assert_eq!(a, b);
        assert!(a < CELLS_PER_FRAGMENT);
    }

    #[test]
    fn test_cell_index_covers_fragment_exactly() {
        let mut seen = vec![false; CELLS_PER_FRAGMENT];
        for cx in 0..16 {
            for cy in 0..16 {
                for cz in 0..16 {
                    let idx =
                        BiomeFragment::cell_index(IVec3::new(cx * 128 + 5, cy * 128, cz * 128 + 127));
                    assert!(!seen[idx], "index {idx} hit twice");
                    seen[idx] = true;
                }
            }
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_cell_origin_round_trips() {
        let frag = BiomeFragment::new(pos(-2048, 4096, 0), BiomeId(0));
        for index in [0_usize, 1, 255, 4095] {
            let origin = frag.cell_origin(index);
            assert_eq!(BiomeFragment::cell_index(origin), index);
        }
    }

    #[test]
    fn test_set_then_get_per_parity() {
        let mut frag = BiomeFragment::new(pos(0, 0, 0), BiomeId(0));
        let site = IVec3::new(256, 128, 0);
        let idx = BiomeFragment::cell_index(site);
        frag.set_cell(idx, LatticeParity::Even, BiomeId(3));
        frag.set_cell(idx, LatticeParity::Odd, BiomeId(5));
        assert_eq!(
            frag.get(GridPoint {
                pos: site,
                parity: LatticeParity::Even
            }),
            BiomeId(3)
        );
        assert_eq!(
            frag.get(GridPoint {
                pos: site + IVec3::new(64, 64, 64),
                parity: LatticeParity::Odd
            }),
            BiomeId(5)
        );
    }

    #[test]
    fn test_negative_coordinates_resolve() {
        let frag = BiomeFragment::new(pos(-2048, -2048, -2048), BiomeId(7));
        let g = GridPoint {
            pos: IVec3::new(-64, -1984, -128),
            parity: LatticeParity::Odd,
        };
        assert_eq!(frag.get(g), BiomeId(7));
    }
}
