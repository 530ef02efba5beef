//! Dual sub-lattice cell selection in rotated space.
//!
//! Lattice space is tiled twice over by cells of side [`CELL_SIZE`]: the
//! *even* sub-lattice has its sites on multiples of 128 per axis, the *odd*
//! sub-lattice is offset by the half period on all axes, so its sites are
//! the odd multiples of 64. A query point resolves to the nearest even site
//! unless it sits in the corner region beyond the inscribed octahedron
//! (L1 distance > 3·128/4), in which case the enclosing odd site wins. The
//! octahedron threshold is what shapes biome cells into quasi-hexagonal
//! volumes instead of axis-aligned boxes; changing it (or the sign rule)
//! moves every biome boundary in every existing world.

use glam::IVec3;

use crate::rotation::{Z_COLUMN, rotate_wide, shrink};

/// Log2 of the lattice cell side.
pub const CELL_SHIFT: u32 = 7;
/// Side length of one lattice cell.
pub const CELL_SIZE: i32 = 1 << CELL_SHIFT;
/// Log2 of the fragment side.
pub const FRAGMENT_SHIFT: u32 = 11;
/// Side length of one fragment of lattice space.
pub const FRAGMENT_SIZE: i32 = 1 << FRAGMENT_SHIFT;
/// Cells along one fragment axis.
pub const CELLS_PER_AXIS: i32 = FRAGMENT_SIZE / CELL_SIZE;

/// L1 radius of the even cell's core region.
const SELECT_THRESHOLD: i32 = 3 * CELL_SIZE / 4;

/// Upper bound on how far a single cell extends along the world z axis:
/// ⌈128·√5/2⌉, the projected diameter of a cell.
pub const MAX_VERTICAL_RUN: i32 = 144;

/// Which of the two interleaved sub-lattices a grid point belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LatticeParity {
    /// Sites on multiples of 128 per axis.
    Even,
    /// Sites on odd multiples of 64 per axis.
    Odd,
}

impl LatticeParity {
    /// Storage index of this sub-lattice inside a fragment cell.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            LatticeParity::Even => 0,
            LatticeParity::Odd => 1,
        }
    }
}

/// A resolved lattice site: the cell a query point belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridPoint {
    /// Site position in rotated space.
    pub pos: IVec3,
    /// Which sub-lattice the site is on.
    pub parity: LatticeParity,
}

/// Nearest even-lattice coordinate (round half up to a multiple of 128).
#[inline]
fn nearest_even(c: i32) -> i32 {
    (c + CELL_SIZE / 2) & !(CELL_SIZE - 1)
}

/// Half-cell step toward the enclosing odd site. Zero distance counts as
/// positive so odd sites stay odd multiples of 64 on every axis.
#[inline]
fn half_step(d: i32) -> i32 {
    if d >= 0 { CELL_SIZE / 2 } else { -(CELL_SIZE / 2) }
}

/// Resolve the sub-lattice site governing a rotated-space point.
#[must_use]
pub fn select_grid_point(r: IVec3) -> GridPoint {
    let even = IVec3::new(nearest_even(r.x), nearest_even(r.y), nearest_even(r.z));
    let d = r - even;
    if d.x.abs() + d.y.abs() + d.z.abs() > SELECT_THRESHOLD {
        let pos = even + IVec3::new(half_step(d.x), half_step(d.y), half_step(d.z));
        GridPoint {
            pos,
            parity: LatticeParity::Odd,
        }
    } else {
        GridPoint {
            pos: even,
            parity: LatticeParity::Even,
        }
    }
}

/// Resolve the cell at a world point and how far up the world z axis it
/// keeps applying.
///
/// Returns `(grid_point, height)` with `height` a multiple of `voxel_size`
/// no greater than `max_height`. The starting point, `height - voxel_size`,
/// and every probed offset below `height` resolved to the same cell. A
/// cell's projection on the z axis is at most [`MAX_VERTICAL_RUN`], which
/// caps the search interval, so the binary search needs at most nine probes
/// regardless of `max_height`.
///
/// The walk adds multiples of [`Z_COLUMN`] to the full-precision rotated
/// image instead of re-rotating, so no rounding error accumulates across
/// probes.
#[must_use]
pub fn vertical_extent(w: IVec3, voxel_size: i32, max_height: i32) -> (GridPoint, i32) {
    debug_assert!(voxel_size > 0, "voxel size must be positive");
    let pre = rotate_wide(w);
    let start = select_grid_point(shrink(pre));

    let cap = max_height.min(MAX_VERTICAL_RUN) / voxel_size;
    if cap <= 0 {
        return (start, 0);
    }
    let matches =
        |steps: i32| select_grid_point(shrink(pre + Z_COLUMN * (steps * voxel_size) as i64)) == start;

    let (mut lo, mut hi) = if matches(cap) {
        if cap == 1 || matches(cap - 1) {
            return (start, cap * voxel_size);
        }
        // The cap re-entered the cell over a gap; report the gap instead.
        (0, cap - 1)
    } else {
        (0, cap)
    };
    while hi - lo > 1 {
        let mid = lo + (hi - lo) / 2;
        if matches(mid) {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    (start, hi * voxel_size)
}
