//! Surface scattering models.
//!
//! Every model works in the local shading frame (normal along +Z) and
//! exposes the same three operations:
//!
//! - `evaluate(uv, wo, wi)`: scattered radiance factor, cosine included
//! - `sample(uv, wo, rng)`: a continuation direction with weight
//!   `value * cos / pdf` already divided out
//! - `albedo(uv)`: approximate total reflectance, for auxiliary outputs

use crate::microfacet;
use crate::principled::Principled;
use lumen_core::{Sampler, Texture};
use lumen_math::{warp, Color, Vec2, Vec3};
use std::f32::consts::{FRAC_1_PI, PI};

/// Result of evaluating a BSDF for a pair of directions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BsdfEval {
    Value(Color),
    /// The direction pair has zero probability of being queried (e.g. a
    /// perfect mirror evaluated off its reflection direction).
    Invalid,
}

impl BsdfEval {
    /// The value, or black for invalid evaluations.
    pub fn value(&self) -> Color {
        match self {
            BsdfEval::Value(value) => *value,
            BsdfEval::Invalid => Color::ZERO,
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, BsdfEval::Invalid)
    }
}

/// A sampled continuation direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BsdfSample {
    pub wi: Vec3,
    /// `value * cos / pdf`
    pub weight: Color,
}

/// Lambertian reflection.
#[derive(Debug, Clone)]
pub struct Diffuse {
    pub albedo: Texture,
}

impl Diffuse {
    pub fn new(albedo: impl Into<Texture>) -> Self {
        Self {
            albedo: albedo.into(),
        }
    }

    pub fn evaluate(&self, uv: Vec2, _wo: Vec3, wi: Vec3) -> BsdfEval {
        BsdfEval::Value(self.albedo.evaluate(uv) * wi.z.max(0.0) * FRAC_1_PI)
    }

    pub fn sample(&self, uv: Vec2, _wo: Vec3, rng: &mut dyn Sampler) -> Option<BsdfSample> {
        let wi = warp::square_to_cosine_hemisphere(rng.next_2d()).normalize_or_zero();
        Some(BsdfSample {
            wi,
            weight: self.albedo.evaluate(uv),
        })
    }
}

/// Perfect mirror.
#[derive(Debug, Clone)]
pub struct Conductor {
    pub reflectance: Texture,
}

impl Conductor {
    pub fn new(reflectance: impl Into<Texture>) -> Self {
        Self {
            reflectance: reflectance.into(),
        }
    }

    pub fn sample(&self, uv: Vec2, wo: Vec3) -> Option<BsdfSample> {
        Some(BsdfSample {
            wi: warp::reflect(wo, Vec3::Z).normalize_or_zero(),
            weight: self.reflectance.evaluate(uv),
        })
    }
}

/// Conductor with a GGX microfacet surface.
#[derive(Debug, Clone)]
pub struct RoughConductor {
    pub reflectance: Texture,
    pub roughness: Texture,
}

impl RoughConductor {
    pub fn new(reflectance: impl Into<Texture>, roughness: impl Into<Texture>) -> Self {
        Self {
            reflectance: reflectance.into(),
            roughness: roughness.into(),
        }
    }

    fn alpha(&self, uv: Vec2) -> f32 {
        microfacet::roughness_to_alpha(self.roughness.scalar(uv))
    }

    pub fn evaluate(&self, uv: Vec2, wo: Vec3, wi: Vec3) -> BsdfEval {
        BsdfEval::Value(microfacet::rough_reflection(
            self.alpha(uv),
            wo,
            wi,
            self.reflectance.evaluate(uv),
        ))
    }

    /// Visible-normal sampling; D and G1(wo) cancel against the pdf, leaving
    /// only the masking of the reflected direction.
    pub fn sample(&self, uv: Vec2, wo: Vec3, rng: &mut dyn Sampler) -> Option<BsdfSample> {
        let alpha = self.alpha(uv);
        let wh = microfacet::sample_ggx_vndf(alpha, wo, rng.next_2d());
        let wi = warp::reflect(wo, wh);
        Some(BsdfSample {
            wi,
            weight: self.reflectance.evaluate(uv) * microfacet::smith_g1(alpha, wh, wi),
        })
    }

    pub fn albedo(&self, uv: Vec2) -> Color {
        0.5 * (self.reflectance.evaluate(uv) + self.roughness.evaluate(uv))
    }
}

/// Stand-in BSDF for participating media.
///
/// The enclosing instance already randomizes the shading normal at each
/// scattering event, so sampling returns the fixed local +Z direction and
/// weights it with the Henyey-Greenstein phase value.
#[derive(Debug, Clone)]
pub struct PrincipledVolume {
    pub color: Color,
    pub absorption: f32,
    /// Henyey-Greenstein asymmetry `g` in (-1, 1)
    pub phase: f32,
}

impl PrincipledVolume {
    pub fn new(color: Color, absorption: f32, phase: f32) -> Self {
        Self {
            color,
            absorption,
            phase,
        }
    }

    pub fn evaluate(&self, wo: Vec3, wi: Vec3) -> BsdfEval {
        let p = henyey_greenstein(self.phase, (-wo).dot(wi));
        BsdfEval::Value(self.color * p * self.absorption)
    }

    pub fn sample(&self, wo: Vec3) -> Option<BsdfSample> {
        let up = Vec3::Z;
        let p = henyey_greenstein(self.phase, (-wo).dot(up));
        Some(BsdfSample {
            wi: up,
            weight: self.color * p * self.absorption,
        })
    }
}

/// Henyey-Greenstein phase function.
pub fn henyey_greenstein(g: f32, cos_theta: f32) -> f32 {
    let denom = 1.0 + g * g - 2.0 * g * cos_theta;
    if denom <= 0.0 {
        return 0.0;
    }
    (1.0 - g * g) / (4.0 * PI * denom * denom.sqrt())
}

/// Any scattering model that can be bound to an instance.
#[derive(Debug, Clone)]
pub enum Bsdf {
    Diffuse(Diffuse),
    Conductor(Conductor),
    RoughConductor(RoughConductor),
    Principled(Principled),
    Volume(PrincipledVolume),
}

impl Bsdf {
    pub fn evaluate(&self, uv: Vec2, wo: Vec3, wi: Vec3) -> BsdfEval {
        match self {
            Bsdf::Diffuse(bsdf) => bsdf.evaluate(uv, wo, wi),
            // Probability of hitting the mirror direction exactly is zero
            Bsdf::Conductor(_) => BsdfEval::Invalid,
            Bsdf::RoughConductor(bsdf) => bsdf.evaluate(uv, wo, wi),
            Bsdf::Principled(bsdf) => bsdf.evaluate(uv, wo, wi),
            Bsdf::Volume(bsdf) => bsdf.evaluate(wo, wi),
        }
    }

    pub fn sample(&self, uv: Vec2, wo: Vec3, rng: &mut dyn Sampler) -> Option<BsdfSample> {
        match self {
            Bsdf::Diffuse(bsdf) => bsdf.sample(uv, wo, rng),
            Bsdf::Conductor(bsdf) => bsdf.sample(uv, wo),
            Bsdf::RoughConductor(bsdf) => bsdf.sample(uv, wo, rng),
            Bsdf::Principled(bsdf) => bsdf.sample(uv, wo, rng),
            Bsdf::Volume(bsdf) => bsdf.sample(wo),
        }
    }

    pub fn albedo(&self, uv: Vec2) -> Color {
        match self {
            Bsdf::Diffuse(bsdf) => bsdf.albedo.evaluate(uv),
            Bsdf::Conductor(bsdf) => bsdf.reflectance.evaluate(uv),
            Bsdf::RoughConductor(bsdf) => bsdf.albedo(uv),
            Bsdf::Principled(bsdf) => bsdf.albedo(uv),
            Bsdf::Volume(bsdf) => bsdf.color,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lumen_core::Independent;
    use lumen_math::Frame;

    /// ∫ evaluate(wo, wi) dwi over the sphere, on a stratified grid.
    pub(crate) fn integrate_evaluate(bsdf: &Bsdf, wo: Vec3, n: usize) -> Color {
        let mut sum = Color::ZERO;
        for i in 0..n {
            for j in 0..n {
                let u = Vec2::new((i as f32 + 0.5) / n as f32, (j as f32 + 0.5) / n as f32);
                let wi = warp::square_to_uniform_sphere(u);
                sum += bsdf.evaluate(Vec2::ZERO, wo, wi).value() / warp::uniform_sphere_pdf();
            }
        }
        sum / (n * n) as f32
    }

    /// Mean sampled weight over `count` draws.
    pub(crate) fn mean_sample_weight(bsdf: &Bsdf, wo: Vec3, count: usize, seed: u64) -> Color {
        let mut rng = Independent::new(seed);
        let mut sum = Color::ZERO;
        for _ in 0..count {
            if let Some(sample) = bsdf.sample(Vec2::ZERO, wo, &mut rng) {
                sum += sample.weight;
            }
        }
        sum / count as f32
    }

    fn assert_color_close(a: Color, b: Color, tolerance: f32, what: &str) {
        assert!(
            (a - b).abs().max_element() < tolerance,
            "{what}: {a:?} vs {b:?} (tolerance {tolerance})"
        );
    }

    #[test]
    fn test_diffuse_integrates_to_albedo() {
        let albedo = Color::new(0.8, 0.5, 0.2);
        let bsdf = Bsdf::Diffuse(Diffuse::new(albedo));
        let wo = Vec3::new(0.3, 0.1, 0.9).normalize();

        let integral = integrate_evaluate(&bsdf, wo, 256);
        assert_color_close(integral, albedo, 0.01, "diffuse integral");
    }

    #[test]
    fn test_diffuse_sample_weight_is_albedo() {
        let albedo = Color::new(0.8, 0.5, 0.2);
        let bsdf = Bsdf::Diffuse(Diffuse::new(albedo));
        let mut rng = Independent::new(42);

        for _ in 0..100 {
            let sample = bsdf.sample(Vec2::ZERO, Vec3::Z, &mut rng).expect("diffuse always samples");
            assert!(sample.wi.z >= 0.0);
            assert_eq!(sample.weight, albedo);
        }
    }

    #[test]
    fn test_diffuse_below_horizon_is_black() {
        let bsdf = Diffuse::new(Color::ONE);
        let value = bsdf.evaluate(Vec2::ZERO, Vec3::Z, Vec3::new(0.0, 0.6, -0.8)).value();
        assert_eq!(value, Color::ZERO);
    }

    #[test]
    fn test_conductor_mirrors() {
        let bsdf = Bsdf::Conductor(Conductor::new(Color::new(0.9, 0.6, 0.3)));
        let wo = Vec3::new(0.5, -0.3, 0.8).normalize();
        let mut rng = Independent::new(1);

        let sample = bsdf.sample(Vec2::ZERO, wo, &mut rng).expect("mirror always samples");
        assert!((sample.wi - Vec3::new(-wo.x, -wo.y, wo.z)).length() < 1e-5);
        assert_eq!(sample.weight, Color::new(0.9, 0.6, 0.3));

        assert!(bsdf.evaluate(Vec2::ZERO, wo, sample.wi).is_invalid());
    }

    #[test]
    fn test_rough_conductor_weight_matches_evaluate() {
        let reflectance = Color::new(0.9, 0.7, 0.5);
        let wo = Vec3::new(0.3, -0.4, 0.7).normalize();
        let mut rng = Independent::new(42);

        for roughness in [0.0, 0.05, 0.2, 0.5, 0.8, 1.0] {
            let bsdf = RoughConductor::new(reflectance, Texture::constant(roughness));
            let alpha = microfacet::roughness_to_alpha(roughness);

            for _ in 0..200 {
                let sample = bsdf.sample(Vec2::ZERO, wo, &mut rng).expect("always samples");
                if sample.wi.z <= 0.0 {
                    continue;
                }

                // pdf of the reflected direction under visible-normal sampling
                let wh = (wo + sample.wi).normalize();
                let d = microfacet::ggx_d(wh.z, alpha);
                let pdf = microfacet::smith_g1(alpha, wh, wo) * d / (4.0 * Frame::cos_theta(wo));
                if pdf <= 0.0 || !pdf.is_finite() {
                    continue;
                }

                let value = bsdf.evaluate(Vec2::ZERO, wo, sample.wi).value();
                let implied = value / pdf;
                let tolerance = 1e-3 * sample.weight.max_element().max(1.0);
                assert!(
                    (implied - sample.weight).abs().max_element() < tolerance,
                    "roughness {roughness}: implied {implied:?} vs weight {:?}",
                    sample.weight
                );
            }
        }
    }

    #[test]
    fn test_rough_conductor_sampling_matches_integral() {
        let bsdf = Bsdf::RoughConductor(RoughConductor::new(Color::new(0.9, 0.7, 0.5), Texture::constant(0.6)));
        let wo = Vec3::new(0.4, 0.2, 0.8).normalize();

        let integral = integrate_evaluate(&bsdf, wo, 512);
        let sampled = mean_sample_weight(&bsdf, wo, 200_000, 7);
        assert_color_close(sampled, integral, 0.02, "rough conductor");
    }

    #[test]
    fn test_rough_conductor_albedo() {
        let bsdf = RoughConductor::new(Color::splat(0.8), Texture::constant(0.4));
        assert!((bsdf.albedo(Vec2::ZERO) - Color::splat(0.6)).length() < 1e-6);
    }

    #[test]
    fn test_henyey_greenstein_normalized() {
        // Isotropic case is 1/(4π) everywhere
        assert!((henyey_greenstein(0.0, 0.3) - 0.25 * FRAC_1_PI).abs() < 1e-6);

        // Integrates to one over the sphere
        for g in [-0.5, 0.0, 0.3, 0.7] {
            let n = 4096;
            let sum: f32 = (0..n)
                .map(|i| {
                    let cos = 1.0 - 2.0 * (i as f32 + 0.5) / n as f32;
                    henyey_greenstein(g, cos)
                })
                .sum();
            let integral = sum / n as f32 * 4.0 * PI;
            assert!((integral - 1.0).abs() < 0.01, "g = {g}: {integral}");
        }
    }

    #[test]
    fn test_volume_phase_surrogate() {
        let bsdf = Bsdf::Volume(PrincipledVolume::new(Color::new(1.0, 0.5, 0.25), 2.0, 0.0));
        let mut rng = Independent::new(3);
        let wo = Vec3::new(0.0, 0.6, 0.8);

        let sample = bsdf.sample(Vec2::ZERO, wo, &mut rng).expect("always samples");
        assert_eq!(sample.wi, Vec3::Z);

        let expected = Color::new(1.0, 0.5, 0.25) * 2.0 * 0.25 * FRAC_1_PI;
        assert!((sample.weight - expected).length() < 1e-6);
        assert!((bsdf.evaluate(Vec2::ZERO, wo, Vec3::X).value() - expected).length() < 1e-6);
        assert_eq!(bsdf.albedo(Vec2::ZERO), Color::new(1.0, 0.5, 0.25));
    }
}
