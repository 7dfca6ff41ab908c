//! # void_math - Spatial primitives
//!
//! The small amount of math the streaming library needs: a 3D vector and the
//! axis-aligned box used for stream zones and the moving stream boundary.

pub mod vector;
pub mod bounds;

pub use vector::Vec3;
pub use bounds::AABB;

/// Common math constants
pub mod consts {
    pub const EPSILON: f32 = 1e-6;
}

/// Linear interpolation
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Move `current` toward `target` by at most `step`, never overshooting
#[inline]
pub fn approach(current: f32, target: f32, step: f32) -> f32 {
    if current < target {
        (current + step).min(target)
    } else {
        (current - step).max(target)
    }
}
