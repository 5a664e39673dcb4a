//! GGX (Trowbridge-Reitz) microfacet helpers.
//!
//! All directions are in the local shading frame, normal along +Z.

use lumen_math::{warp, Color, Frame, Vec2, Vec3};
use std::f32::consts::PI;

/// Smallest distribution width used, to keep near-specular lobes finite.
pub const MIN_ALPHA: f32 = 1e-3;

/// Distribution width for a perceptual roughness value.
#[inline]
pub fn roughness_to_alpha(roughness: f32) -> f32 {
    (roughness * roughness).max(MIN_ALPHA)
}

/// GGX/Trowbridge-Reitz distribution.
#[inline]
pub fn ggx_d(n_dot_h: f32, alpha: f32) -> f32 {
    let a2 = alpha * alpha;
    let denom = n_dot_h * n_dot_h * (a2 - 1.0) + 1.0;
    a2 / (PI * denom * denom)
}

/// Smith masking term for direction `w` and microfacet normal `wh`.
pub fn smith_g1(alpha: f32, wh: Vec3, w: Vec3) -> f32 {
    // Backfacing microfacets are never visible
    if w.dot(wh) * Frame::cos_theta(w) <= 0.0 {
        return 0.0;
    }
    if Frame::abs_cos_theta(w) >= 1.0 {
        return 1.0;
    }
    let a2_tan2 = alpha * alpha * Frame::tan2_theta(w);
    2.0 / (1.0 + (1.0 + a2_tan2).sqrt())
}

/// Sample a microfacet normal from the distribution of normals visible from
/// `wo` (Heitz 2018, "Sampling the GGX Distribution of Visible Normals").
pub fn sample_ggx_vndf(alpha: f32, wo: Vec3, u: Vec2) -> Vec3 {
    // Stretch the view direction to the hemisphere configuration
    let mut vh = Vec3::new(alpha * wo.x, alpha * wo.y, wo.z).normalize_or_zero();
    if vh.z < 0.0 {
        vh = -vh;
    }

    let t1 = if vh.z < 0.99999 {
        Vec3::Z.cross(vh).normalize()
    } else {
        Vec3::X
    };
    let t2 = vh.cross(t1);

    // Warp a disk sample onto the visible part of the projected hemisphere
    let p = warp::square_to_concentric_disk(u);
    let h = (1.0 - p.x * p.x).max(0.0).sqrt();
    let s = 0.5 * (1.0 + vh.z);
    let py = (1.0 - s) * h + s * p.y;
    let pz = (1.0 - p.x * p.x - py * py).max(0.0).sqrt();

    let nh = p.x * t1 + py * t2 + pz * vh;

    // Unstretch
    Vec3::new(alpha * nh.x, alpha * nh.y, nh.z.max(1e-6)).normalize()
}

/// Schlick weight for Fresnel.
#[inline]
pub fn schlick_weight(cos_theta: f32) -> f32 {
    let x = (1.0 - cos_theta).clamp(0.0, 1.0);
    let x2 = x * x;
    x2 * x2 * x // (1 - cos_theta)^5
}

/// Schlick Fresnel approximation for a scalar reflectance at normal incidence.
#[inline]
pub fn schlick(f0: f32, cos_theta: f32) -> f32 {
    f0 + (1.0 - f0) * schlick_weight(cos_theta)
}

/// Reflectance of the rough conductor model (cosine included).
pub fn rough_reflection(alpha: f32, wo: Vec3, wi: Vec3, reflectance: Color) -> Color {
    let cos_o = Frame::cos_theta(wo);
    if cos_o == 0.0 {
        return Color::ZERO;
    }
    let wh = (wi + wo).normalize_or_zero();
    let d = ggx_d(Frame::cos_theta(wh), alpha);
    let g = smith_g1(alpha, wh, wi) * smith_g1(alpha, wh, wo);
    reflectance * (d * g / (4.0 * cos_o))
}
