//! Vector and rotation helpers on top of `glam`.
//!
//! Conventions: +Y is up, +Z is forward and +X is right for an unrotated entity.
//! Yaw is a rotation about +Y in radians.

pub use glam::{Quat, Vec3};
use glam::EulerRot;

/// Heading about +Y, in radians.
pub fn yaw(rotation: Quat) -> f32 {
    rotation.to_euler(EulerRot::YXZ).0
}

/// Horizontal (XZ-plane) part of the vector.
pub fn horizontal(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// Removes the component of `v` along `normal`. A zero normal leaves `v` as is.
pub fn project_on_plane(v: Vec3, normal: Vec3) -> Vec3 {
    if normal.length_squared() == 0.0 {
        return v;
    }
    v.reject_from(normal)
}

/// Wraps an angle into (-PI, PI].
pub fn wrap_angle(angle: f32) -> f32 {
    let tau = std::f32::consts::TAU;
    let mut wrapped = angle % tau;
    if wrapped > std::f32::consts::PI {
        wrapped -= tau;
    } else if wrapped <= -std::f32::consts::PI {
        wrapped += tau;
    }
    wrapped
}
