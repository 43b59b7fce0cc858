//! Math type re-exports and bridge-specific math utilities.
//!
//! Re-exports the `glam` types that cross the boundary and provides the
//! handedness-mirroring helpers shared by the per-kind sample accessors.

// Re-export glam types used across the public surface
pub use glam::{DMat4, Mat4, Quat, Vec2, Vec3, Vec4};

/// Mirror a point/vector across the YZ plane (x negated).
#[inline]
pub fn mirror_vec3(v: Vec3) -> Vec3 {
    Vec3::new(-v.x, v.y, v.z)
}

/// Mirror a rotation across the YZ plane.
///
/// Conjugation of the rotation by diag(-1, 1, 1): the x component of the
/// quaternion is kept, y and z are negated.
#[inline]
pub fn mirror_quat(q: Quat) -> Quat {
    Quat::from_xyzw(q.x, -q.y, -q.z, q.w)
}

/// Mirror every element of a point/vector buffer in place.
pub fn mirror_vec3_slice(vs: &mut [Vec3]) {
    for v in vs.iter_mut() {
        v.x = -v.x;
    }
}

/// Convert XYZ euler angles in degrees to a unit quaternion.
///
/// Matches the `xformOp:rotateXYZ` convention: rotation about X applied
/// first, then Y, then Z.
pub fn euler_xyz_degrees_to_quat(e: Vec3) -> Quat {
    Quat::from_euler(
        glam::EulerRot::ZYX,
        e.z.to_radians(),
        e.y.to_radians(),
        e.x.to_radians(),
    )
}
