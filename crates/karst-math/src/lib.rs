//! Integer geometry for the rotated cave-biome lattice.
//!
//! Everything in this crate is exact integer arithmetic: the fixed-point
//! rotation between world and lattice space, the dual sub-lattice cell
//! selection, and the tetrahedral anchor construction used for scalar
//! interpolation. Floating point appears only in the final barycentric
//! weights, after all positional decisions have been made.

mod lattice;
mod rotation;
mod tetra;

pub use lattice::{
    CELL_SHIFT, CELL_SIZE, CELLS_PER_AXIS, FRAGMENT_SHIFT, FRAGMENT_SIZE, GridPoint,
    LatticeParity, MAX_VERTICAL_RUN, select_grid_point, vertical_extent,
};
pub use rotation::{ROTATION, SHIFT, Z_COLUMN, rotate, rotate_inverse, rotate_wide, shrink};
pub use tetra::{Tetrahedron, tetrahedron_at};
