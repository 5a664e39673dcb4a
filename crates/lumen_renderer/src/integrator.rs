//! Per-pixel radiance estimators.

use crate::error::SceneError;
use crate::intersection::Intersection;
use crate::scene::Scene;
use lumen_core::Sampler;
use lumen_math::{Color, Ray, Vec3};
use std::str::FromStr;

/// Default number of path vertices for the path tracer.
pub const DEFAULT_DEPTH: u32 = 2;

/// Quantity shown by the debug integrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugMode {
    Normal,
    Tangent,
    Bitangent,
    Distance,
    Uv,
}

impl FromStr for DebugMode {
    type Err = SceneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(DebugMode::Normal),
            "tangent" => Ok(DebugMode::Tangent),
            "bitangent" => Ok(DebugMode::Bitangent),
            "distance" => Ok(DebugMode::Distance),
            "uv" => Ok(DebugMode::Uv),
            _ => Err(SceneError::UnknownDebugMode(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Integrator {
    /// Unidirectional path tracing with optional next event estimation.
    PathTracer { depth: u32, nee: bool },
    /// Emission plus one bounce of direct light.
    Direct,
    /// BSDF albedo of the first hit.
    Albedo,
    /// Shading normal of the first hit, optionally remapped to [0, 1].
    Normals { remap: bool },
    Debug { mode: DebugMode, remap: bool },
}

impl Default for Integrator {
    fn default() -> Self {
        Integrator::PathTracer {
            depth: DEFAULT_DEPTH,
            nee: true,
        }
    }
}

impl Integrator {
    /// Integrator by name with default settings. Debug modes are spelled
    /// `debug:<mode>`, e.g. `debug:uv`.
    pub fn from_name(name: &str) -> Result<Self, SceneError> {
        match name {
            "pathtracer" => Ok(Integrator::default()),
            "direct" => Ok(Integrator::Direct),
            "albedo" => Ok(Integrator::Albedo),
            "normals" => Ok(Integrator::Normals { remap: true }),
            "debug" => Ok(Integrator::Debug {
                mode: DebugMode::Normal,
                remap: true,
            }),
            _ => match name.strip_prefix("debug:") {
                Some(mode) => Ok(Integrator::Debug {
                    mode: mode.parse()?,
                    remap: true,
                }),
                None => Err(SceneError::UnknownIntegrator(name.to_string())),
            },
        }
    }

    /// Override the path depth; only affects the path tracer.
    pub fn with_depth(self, depth: u32) -> Self {
        match self {
            Integrator::PathTracer { nee, .. } => Integrator::PathTracer { depth, nee },
            other => other,
        }
    }

    /// Radiance arriving along `ray` (unit direction).
    pub fn li(&self, scene: &Scene, ray: &Ray, rng: &mut dyn Sampler) -> Color {
        match *self {
            Integrator::PathTracer { depth, nee } => trace_path(scene, ray, depth, nee, rng),
            Integrator::Direct => trace_path(scene, ray, 2, true, rng),
            Integrator::Albedo => {
                let its = scene.intersect(ray, rng);
                its.instance
                    .and_then(|instance| instance.bsdf())
                    .map_or(Color::ZERO, |bsdf| bsdf.albedo(its.surface.uv))
            }
            Integrator::Normals { remap } => {
                let its = scene.intersect(ray, rng);
                let normal = if its.is_hit() { its.frame().normal } else { Vec3::ZERO };
                visualize(normal, remap)
            }
            Integrator::Debug { mode, remap } => {
                let its = scene.intersect(ray, rng);
                if !its.is_hit() {
                    return visualize(Vec3::ZERO, remap);
                }
                let value = match mode {
                    DebugMode::Normal => its.frame().normal,
                    DebugMode::Tangent => its.frame().tangent,
                    DebugMode::Bitangent => its.frame().bitangent,
                    DebugMode::Distance => Vec3::splat(its.t),
                    DebugMode::Uv => its.surface.uv.extend(0.0),
                };
                visualize(value, remap)
            }
        }
    }
}

fn visualize(value: Vec3, remap: bool) -> Color {
    if remap {
        (value + Vec3::ONE) * 0.5
    } else {
        value
    }
}

/// Direct light reaching `its` from one randomly selected light, scaled by
/// the path weight. Lights that paths can hit on their own contribute
/// nothing here.
pub fn next_event_estimation(scene: &Scene, its: &Intersection, weight: Color, rng: &mut dyn Sampler) -> Color {
    let Some((light, probability)) = scene.sample_light(rng) else {
        return Color::ZERO;
    };
    let Some(sample) = light.sample_direct(its.position(), rng) else {
        return Color::ZERO;
    };
    if light.can_be_intersected() {
        return Color::ZERO;
    }

    let shadow_ray = Ray::new(its.position(), sample.wi);
    if scene.is_occluded(&shadow_ray, sample.distance, rng) {
        return Color::ZERO;
    }

    weight * its.evaluate_bsdf(sample.wi).value() * sample.weight / probability
}

fn trace_path(scene: &Scene, ray: &Ray, depth: u32, nee: bool, rng: &mut dyn Sampler) -> Color {
    let mut radiance = Color::ZERO;
    let mut weight = Color::ONE;
    let mut ray = *ray;
    let use_lights = nee && scene.has_lights();

    for bounce in 0..depth {
        let its = scene.intersect(&ray, rng);
        if !its.is_hit() {
            radiance += scene.evaluate_background(ray.direction) * weight;
            return radiance;
        }

        radiance += its.evaluate_emission() * weight;
        if bounce + 1 == depth {
            return radiance;
        }

        if use_lights {
            radiance += next_event_estimation(scene, &its, weight, rng);
        }

        let Some(sample) = its.sample_bsdf(rng) else {
            return radiance;
        };
        weight *= sample.weight;
        ray = Ray::new(its.position(), sample.wi.normalize_or_zero());
    }

    radiance
}
