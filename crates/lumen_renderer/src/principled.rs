//! Principled BSDF: a diffuse base layered under a GGX specular lobe.
//!
//! Loosely follows "Physically Based Shading at Disney" (Burley 2012), reduced
//! to base color, roughness, metallic and specular parameters plus an
//! optional transparency mask. The energy split between the two lobes comes
//! from a Schlick Fresnel term evaluated at `wo`.

use crate::bsdf::{BsdfEval, BsdfSample};
use crate::microfacet;
use lumen_core::{Sampler, Texture};
use lumen_math::{mean, warp, Color, Frame, Vec2, Vec3};
use std::f32::consts::FRAC_1_PI;

/// Dielectric reflectance at normal incidence for `specular = 1`.
const DIELECTRIC_F0: f32 = 0.08;

#[derive(Debug, Clone, Copy)]
struct DiffuseLobe {
    color: Color,
}

impl DiffuseLobe {
    fn evaluate(&self, wi: Vec3) -> Color {
        self.color * wi.z.max(0.0) * FRAC_1_PI
    }

    fn sample(&self, rng: &mut dyn Sampler) -> BsdfSample {
        BsdfSample {
            wi: warp::square_to_cosine_hemisphere(rng.next_2d()).normalize_or_zero(),
            weight: self.color,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct MetallicLobe {
    alpha: f32,
    color: Color,
}

impl MetallicLobe {
    fn evaluate(&self, wo: Vec3, wi: Vec3) -> BsdfEval {
        if !Frame::same_hemisphere(wi, wo) {
            return BsdfEval::Invalid;
        }
        BsdfEval::Value(microfacet::rough_reflection(self.alpha, wo, wi, self.color))
    }

    fn sample(&self, wo: Vec3, rng: &mut dyn Sampler) -> BsdfSample {
        let wh = microfacet::sample_ggx_vndf(self.alpha, wo, rng.next_2d());
        let wi = warp::reflect(wo, wh);
        BsdfSample {
            wi,
            weight: self.color * microfacet::smith_g1(self.alpha, wh, wi),
        }
    }
}

/// Both lobes at one shading point, with the probability of picking diffuse.
#[derive(Debug, Clone, Copy)]
struct Lobes {
    diffuse_probability: f32,
    diffuse: DiffuseLobe,
    metallic: MetallicLobe,
}

/// Principled material.
#[derive(Debug, Clone)]
pub struct Principled {
    pub base_color: Texture,

    /// Perceptual roughness: 0 = smooth/glossy, 1 = rough
    pub roughness: Texture,

    /// 0 = dielectric, 1 = metal
    pub metallic: Texture,

    /// Scales the Fresnel reflectance of the specular lobe
    pub specular: Texture,

    /// Probability of scattering at all; the rest passes straight through
    pub transparency: Option<Texture>,
}

impl Default for Principled {
    fn default() -> Self {
        Self {
            base_color: Texture::constant(0.8),
            roughness: Texture::constant(0.5),
            metallic: Texture::constant(0.0),
            specular: Texture::constant(0.5),
            transparency: None,
        }
    }
}

impl Principled {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a metallic material.
    pub fn metal(color: Color, roughness: f32) -> Self {
        Self {
            base_color: Texture::Constant(color),
            roughness: Texture::constant(roughness),
            metallic: Texture::constant(1.0),
            specular: Texture::constant(1.0),
            transparency: None,
        }
    }

    /// Create a glossy plastic-like material.
    pub fn plastic(color: Color, roughness: f32) -> Self {
        Self {
            base_color: Texture::Constant(color),
            roughness: Texture::constant(roughness),
            ..Default::default()
        }
    }

    /// Builder method to set base color.
    pub fn with_base_color(mut self, base_color: impl Into<Texture>) -> Self {
        self.base_color = base_color.into();
        self
    }

    /// Builder method to set roughness.
    pub fn with_roughness(mut self, roughness: impl Into<Texture>) -> Self {
        self.roughness = roughness.into();
        self
    }

    /// Builder method to set metallic.
    pub fn with_metallic(mut self, metallic: impl Into<Texture>) -> Self {
        self.metallic = metallic.into();
        self
    }

    /// Builder method to set specular.
    pub fn with_specular(mut self, specular: impl Into<Texture>) -> Self {
        self.specular = specular.into();
        self
    }

    /// Builder method to set a transparency mask.
    pub fn with_transparency(mut self, transparency: impl Into<Texture>) -> Self {
        self.transparency = Some(transparency.into());
        self
    }

    fn lobes(&self, uv: Vec2, wo: Vec3) -> Lobes {
        let base_color = self.base_color.evaluate(uv);
        let alpha = microfacet::roughness_to_alpha(self.roughness.scalar(uv));
        let specular = self.specular.scalar(uv);
        let metallic = self.metallic.scalar(uv);
        let f = specular * microfacet::schlick((1.0 - metallic) * DIELECTRIC_F0, Frame::cos_theta(wo));

        let diffuse = DiffuseLobe {
            color: (1.0 - f) * (1.0 - metallic) * base_color,
        };
        let metallic = MetallicLobe {
            alpha,
            color: Color::splat(f) + (1.0 - f) * metallic * base_color,
        };

        let diffuse_albedo = mean(diffuse.color);
        let total_albedo = diffuse_albedo + mean(metallic.color);
        Lobes {
            diffuse_probability: if total_albedo > 0.0 {
                diffuse_albedo / total_albedo
            } else {
                1.0
            },
            diffuse,
            metallic,
        }
    }

    pub fn evaluate(&self, uv: Vec2, wo: Vec3, wi: Vec3) -> BsdfEval {
        let lobes = self.lobes(uv, wo);
        BsdfEval::Value(lobes.diffuse.evaluate(wi) + lobes.metallic.evaluate(wo, wi).value())
    }

    pub fn sample(&self, uv: Vec2, wo: Vec3, rng: &mut dyn Sampler) -> Option<BsdfSample> {
        if let Some(transparency) = &self.transparency {
            if rng.next() > transparency.scalar(uv) {
                return Some(BsdfSample {
                    wi: -wo,
                    weight: Color::ONE,
                });
            }
        }

        let lobes = self.lobes(uv, wo);
        let p = lobes.diffuse_probability;
        if rng.next() < p {
            let sample = lobes.diffuse.sample(rng);
            Some(BsdfSample {
                wi: sample.wi,
                weight: sample.weight / p,
            })
        } else {
            let sample = lobes.metallic.sample(wo, rng);
            Some(BsdfSample {
                wi: sample.wi,
                weight: sample.weight / (1.0 - p),
            })
        }
    }

    pub fn albedo(&self, uv: Vec2) -> Color {
        self.base_color.evaluate(uv)
    }
}
