// Re-export glam for convenience
pub use glam::*;

// Lumen math types
mod aabb;
mod frame;
mod interval;
mod ray;
mod transform;
pub mod warp;

pub use aabb::Aabb;
pub use frame::Frame;
pub use interval::Interval;
pub use ray::Ray;
pub use transform::Transform;

/// Linear RGB color (values typically 0-1, unbounded for radiance).
pub type Color = Vec3;

/// Arithmetic mean of the three color channels.
#[inline]
pub fn mean(c: Color) -> f32 {
    (c.x + c.y + c.z) / 3.0
}
