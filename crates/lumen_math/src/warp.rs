//! Warping functions from the unit square to directions.
//!
//! Each warp has a matching pdf with respect to solid angle.

use crate::{Vec2, Vec3};
use std::f32::consts::{FRAC_1_PI, PI};

/// Uniformly distributed direction on the unit sphere.
pub fn square_to_uniform_sphere(u: Vec2) -> Vec3 {
    let z = 1.0 - 2.0 * u.x;
    let r = (1.0 - z * z).max(0.0).sqrt();
    let phi = 2.0 * PI * u.y;
    Vec3::new(r * phi.cos(), r * phi.sin(), z)
}

pub fn uniform_sphere_pdf() -> f32 {
    0.25 * FRAC_1_PI
}

/// Uniformly distributed direction on the upper (+Z) hemisphere.
pub fn square_to_uniform_hemisphere(u: Vec2) -> Vec3 {
    let z = u.x;
    let r = (1.0 - z * z).max(0.0).sqrt();
    let phi = 2.0 * PI * u.y;
    Vec3::new(r * phi.cos(), r * phi.sin(), z)
}

pub fn uniform_hemisphere_pdf() -> f32 {
    0.5 * FRAC_1_PI
}

/// Concentric mapping of the unit square onto the unit disk (Shirley & Chiu).
pub fn square_to_concentric_disk(u: Vec2) -> Vec2 {
    let offset = 2.0 * u - Vec2::ONE;
    if offset.x == 0.0 && offset.y == 0.0 {
        return Vec2::ZERO;
    }

    let (r, theta) = if offset.x.abs() > offset.y.abs() {
        (offset.x, 0.25 * PI * (offset.y / offset.x))
    } else {
        (offset.y, 0.5 * PI - 0.25 * PI * (offset.x / offset.y))
    };
    r * Vec2::new(theta.cos(), theta.sin())
}

/// Cosine-weighted direction on the upper (+Z) hemisphere (Malley's method).
pub fn square_to_cosine_hemisphere(u: Vec2) -> Vec3 {
    let d = square_to_concentric_disk(u);
    let z = (1.0 - d.x * d.x - d.y * d.y).max(0.0).sqrt();
    Vec3::new(d.x, d.y, z)
}

pub fn cosine_hemisphere_pdf(w: Vec3) -> f32 {
    w.z.max(0.0) * FRAC_1_PI
}

/// Spherical uv coordinates of a unit direction, both in [0, 1].
pub fn direction_to_sphere_uv(d: Vec3) -> Vec2 {
    let u = (d.y.atan2(d.x) + PI) / (2.0 * PI);
    let v = d.z.clamp(-1.0, 1.0).acos() * FRAC_1_PI;
    Vec2::new(u, v)
}

/// Reflect `w` about `n`; both point away from the surface.
#[inline]
pub fn reflect(w: Vec3, n: Vec3) -> Vec3 {
    2.0 * w.dot(n) * n - w
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(n: usize) -> impl Iterator<Item = Vec2> {
        (0..n).flat_map(move |i| {
            (0..n).map(move |j| Vec2::new((i as f32 + 0.5) / n as f32, (j as f32 + 0.5) / n as f32))
        })
    }

    #[test]
    fn test_sphere_samples_are_unit() {
        for u in grid(16) {
            assert!((square_to_uniform_sphere(u).length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_cosine_hemisphere_upper() {
        for u in grid(16) {
            let w = square_to_cosine_hemisphere(u);
            assert!(w.z >= 0.0);
            assert!((w.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_cosine_hemisphere_mean_cosine() {
        // E[cos] under cosine weighting is 2/3
        let n = 64;
        let mean: f32 = grid(n).map(|u| square_to_cosine_hemisphere(u).z).sum::<f32>() / (n * n) as f32;
        assert!((mean - 2.0 / 3.0).abs() < 0.01, "mean cosine {mean}");
    }

    #[test]
    fn test_reflect() {
        let w = Vec3::new(1.0, 0.0, 1.0).normalize();
        let r = reflect(w, Vec3::Z);
        assert!((r - Vec3::new(-1.0, 0.0, 1.0).normalize()).length() < 1e-6);
    }

    #[test]
    fn test_sphere_uv_range() {
        for u in grid(8) {
            let uv = direction_to_sphere_uv(square_to_uniform_sphere(u));
            assert!((0.0..=1.0).contains(&uv.x));
            assert!((0.0..=1.0).contains(&uv.y));
        }
    }
}
