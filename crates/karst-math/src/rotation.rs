//! Fixed-point rotation between world space and lattice space.
//!
//! The rotation matrix is built from three orthogonal Pythagorean quadruples
//! of norm 25 — (20,0,15), (9,20,−12), (−12,15,16) — scaled to 2³⁰ fixed
//! point. Because the rows are exactly orthogonal in integer arithmetic,
//! `R·Rᵀ = (2³⁰ − 24)²·I` holds exactly and the transpose serves as the
//! inverse transform. Cell boundaries derived from this matrix are bit-exact
//! on every platform; substituting a floating-point rotation would let them
//! drift between runs.

use glam::{I64Vec3, IVec3};

/// Fixed-point fractional bits of the rotation matrix.
pub const SHIFT: u32 = 30;

/// Scale factor: one twenty-fifth in 2³⁰ fixed point.
const F: i64 = (1 << SHIFT) / 25;

/// Row-major rotation matrix, world → lattice.
pub const ROTATION: [[i64; 3]; 3] = [
    [20 * F, 0, 15 * F],
    [9 * F, 20 * F, -12 * F],
    [-12 * F, 15 * F, 16 * F],
];

/// Third column of [`ROTATION`]: how the unshifted lattice image of a point
/// moves when its world z coordinate grows by one. Used by the vertical
/// column walk, which keeps full precision instead of re-rotating.
pub const Z_COLUMN: I64Vec3 = I64Vec3::new(15 * F, -12 * F, 16 * F);

#[inline]
fn apply(m: &[[i64; 3]; 3], v: IVec3) -> IVec3 {
    let v = v.as_i64vec3();
    IVec3::new(
        ((m[0][0] * v.x + m[0][1] * v.y + m[0][2] * v.z) >> SHIFT) as i32,
        ((m[1][0] * v.x + m[1][1] * v.y + m[1][2] * v.z) >> SHIFT) as i32,
        ((m[2][0] * v.x + m[2][1] * v.y + m[2][2] * v.z) >> SHIFT) as i32,
    )
}

/// Rotate a world position into lattice space.
///
/// Each component is a 64-bit dot product arithmetically shifted right by
/// [`SHIFT`], so the result is the floor of the exact rational image. The
/// composition with [`rotate_inverse`] recovers the input up to a
/// per-component error in `{-2, -1, 0}`; it is deterministic but not an
/// exact bijection (the fixed-point scale is 24/2³⁰ short of unity).
#[inline]
#[must_use]
pub fn rotate(v: IVec3) -> IVec3 {
    apply(&ROTATION, v)
}

/// Rotate a lattice position back into world space using the transpose.
#[inline]
#[must_use]
pub fn rotate_inverse(v: IVec3) -> IVec3 {
    const TRANSPOSED: [[i64; 3]; 3] = [
        [ROTATION[0][0], ROTATION[1][0], ROTATION[2][0]],
        [ROTATION[0][1], ROTATION[1][1], ROTATION[2][1]],
        [ROTATION[0][2], ROTATION[1][2], ROTATION[2][2]],
    ];
    apply(&TRANSPOSED, v)
}

/// Rotate without the final shift, keeping all 30 fractional bits.
///
/// `shrink(rotate_wide(v)) == rotate(v)` for every input; the wide form
/// exists so callers stepping along an axis can add multiples of a matrix
/// column without accumulating rounding error.
#[inline]
#[must_use]
pub fn rotate_wide(v: IVec3) -> I64Vec3 {
    let v = v.as_i64vec3();
    I64Vec3::new(
        ROTATION[0][0] * v.x + ROTATION[0][1] * v.y + ROTATION[0][2] * v.z,
        ROTATION[1][0] * v.x + ROTATION[1][1] * v.y + ROTATION[1][2] * v.z,
        ROTATION[2][0] * v.x + ROTATION[2][1] * v.y + ROTATION[2][2] * v.z,
    )
}

/// Drop the fractional bits of a wide lattice position.
#[inline]
#[must_use]
pub fn shrink(v: I64Vec3) -> IVec3 {
    IVec3::new(
        (v.x >> SHIFT) as i32,
        (v.y >> SHIFT) as i32,
        (v.z >> SHIFT) as i32,
    )
}
