//! Tetrahedral anchor construction for scalar interpolation.
//!
//! A query point in rotated space is enclosed by four lattice sites: the
//! nearest even site, a second even site one cell along the dominant
//! distance axis, the enclosing odd site, and a second odd site likewise.
//! The barycentric weights of the point within that tetrahedron interpolate
//! any per-biome scalar continuously across cell boundaries.
//!
//! The dominant-axis rules differ on purpose: the even pair breaks ties with
//! strict `>` (earliest axis wins), the odd pair with `>=` (latest axis
//! wins). Per axis the two distances sum to half a cell, so the even argmax
//! is the odd argmin; with opposing tie-breaks the two advance axes can
//! never coincide and the tetrahedron never degenerates. Its determinant is
//! ±2²⁰ for every input.

use glam::{I64Vec3, IVec3};

use crate::lattice::{CELL_SIZE, GridPoint, LatticeParity};

/// Four anchor sites around a point and its barycentric weights.
///
/// `anchors[0]` and `anchors[1]` are odd-lattice sites, `anchors[2]` and
/// `anchors[3]` even-lattice sites; `weights[i]` belongs to `anchors[i]`
/// and the four weights sum to one.
#[derive(Clone, Copy, Debug)]
pub struct Tetrahedron {
    pub anchors: [GridPoint; 4],
    pub weights: [f32; 4],
}

/// Index of the component with the strictly greatest magnitude; earlier
/// axes win ties.
#[inline]
fn dominant_axis_strict(d: IVec3) -> usize {
    let mut axis = 0;
    if d.y.abs() > d.x.abs() {
        axis = 1;
    }
    if d.z.abs() > d[axis].abs() {
        axis = 2;
    }
    axis
}

/// Index of the component with the greatest magnitude; later axes win ties.
#[inline]
fn dominant_axis_weak(d: IVec3) -> usize {
    let mut axis = 0;
    if d.y.abs() >= d.x.abs() {
        axis = 1;
    }
    if d.z.abs() >= d[axis].abs() {
        axis = 2;
    }
    axis
}

/// One full cell toward the query point; zero counts as positive.
#[inline]
fn full_step(d: i32) -> i32 {
    if d >= 0 { CELL_SIZE } else { -CELL_SIZE }
}

/// Build the enclosing tetrahedron of a rotated-space point.
#[must_use]
pub fn tetrahedron_at(r: IVec3) -> Tetrahedron {
    let mask = !(CELL_SIZE - 1);
    let half = CELL_SIZE / 2;

    let even = IVec3::new(
        (r.x + half) & mask,
        (r.y + half) & mask,
        (r.z + half) & mask,
    );
    let d0 = r - even;
    let mut even2 = even;
    let a = dominant_axis_strict(d0);
    even2[a] += full_step(d0[a]);

    let odd = IVec3::new(
        (r.x & mask) + half,
        (r.y & mask) + half,
        (r.z & mask) + half,
    );
    let d1 = r - odd;
    let mut odd2 = odd;
    let b = dominant_axis_weak(d1);
    odd2[b] += full_step(d1[b]);

    // Columns of the anchor matrix relative to the primary even site. The
    // inverse rows are the pairwise cross products over the determinant.
    let c1 = (odd2 - even).as_i64vec3();
    let c2 = (odd - even).as_i64vec3();
    let c3 = (even2 - even).as_i64vec3();
    let det = c1.dot(c2.cross(c3));
    debug_assert_eq!(det.abs(), 1 << 20, "anchor tetrahedron degenerated at {r}");

    let d: I64Vec3 = d0.as_i64vec3();
    let inv_det = 1.0 / det as f32;
    let l1 = c2.cross(c3).dot(d) as f32 * inv_det;
    let l2 = c3.cross(c1).dot(d) as f32 * inv_det;
    let l3 = c1.cross(c2).dot(d) as f32 * inv_det;
    let l4 = 1.0 - l1 - l2 - l3;

    Tetrahedron {
        anchors: [
            GridPoint {
                pos: odd2,
                parity: LatticeParity::Odd,
            },
            GridPoint {
                pos: odd,
                parity: LatticeParity::Odd,
            },
            GridPoint {
                pos: even2,
                parity: LatticeParity::Even,
            },
            GridPoint {
                pos: even,
                parity: LatticeParity::Even,
            },
        ],
        weights: [l1, l2, l3, l4],
    }
}
