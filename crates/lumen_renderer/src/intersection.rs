//! Surface events and ray intersections.

use crate::bsdf::{BsdfEval, BsdfSample};
use crate::instance::Instance;
use lumen_core::Sampler;
use lumen_math::{Color, Frame, Vec2, Vec3};

/// Smallest hit distance accepted by surface tests, to avoid re-hitting the
/// surface a ray was spawned from.
pub const EPSILON: f32 = 1e-4;

/// A point on a surface with its shading frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceEvent {
    pub position: Vec3,
    pub uv: Vec2,
    pub frame: Frame,
    /// Sampling density of this point; per unit area for area samples.
    pub pdf: f32,
}

impl Default for SurfaceEvent {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            uv: Vec2::ZERO,
            frame: Frame::default(),
            pdf: 0.0,
        }
    }
}

/// A surface point produced by sampling a shape directly.
pub type AreaSample = SurfaceEvent;

/// Record of a ray-instance intersection.
///
/// `t` starts at the query's maximum distance and is only ever decreased by
/// successful tests. A test that rejects its hit leaves the record untouched.
#[derive(Debug, Clone, Copy)]
pub struct Intersection<'a> {
    /// Hit distance along the (unit length) world ray
    pub t: f32,
    /// Direction towards the ray origin, world space
    pub wo: Vec3,
    pub surface: SurfaceEvent,
    /// Owning instance, `None` until something is hit
    pub instance: Option<&'a Instance>,
}

impl<'a> Intersection<'a> {
    /// An empty record for a ray travelling along `direction`.
    pub fn new(direction: Vec3) -> Self {
        Self::with_max_distance(direction, f32::INFINITY)
    }

    pub fn with_max_distance(direction: Vec3, t: f32) -> Self {
        Self {
            t,
            wo: -direction,
            surface: SurfaceEvent::default(),
            instance: None,
        }
    }

    pub fn is_hit(&self) -> bool {
        self.instance.is_some()
    }

    pub fn position(&self) -> Vec3 {
        self.surface.position
    }

    pub fn frame(&self) -> &Frame {
        &self.surface.frame
    }

    /// Radiance emitted by the hit surface towards `wo`.
    pub fn evaluate_emission(&self) -> Color {
        match self.instance {
            Some(instance) => {
                let wo = self.surface.frame.to_local(self.wo);
                instance.evaluate_emission(self.surface.uv, wo)
            }
            None => Color::ZERO,
        }
    }

    /// BSDF value (cosine included) for light arriving from world direction `wi`.
    pub fn evaluate_bsdf(&self, wi: Vec3) -> BsdfEval {
        let Some(bsdf) = self.instance.and_then(|instance| instance.bsdf()) else {
            return BsdfEval::Invalid;
        };
        let frame = &self.surface.frame;
        bsdf.evaluate(self.surface.uv, frame.to_local(self.wo), frame.to_local(wi))
    }

    /// Sample a continuation direction; `wi` of the result is in world space.
    pub fn sample_bsdf(&self, rng: &mut dyn Sampler) -> Option<BsdfSample> {
        let bsdf = self.instance.and_then(|instance| instance.bsdf())?;
        let frame = &self.surface.frame;
        let sample = bsdf.sample(self.surface.uv, frame.to_local(self.wo), rng)?;
        Some(BsdfSample {
            wi: frame.to_world(sample.wi),
            weight: sample.weight,
        })
    }
}

impl PartialEq for Intersection<'_> {
    fn eq(&self, other: &Self) -> bool {
        let same_instance = match (self.instance, other.instance) {
            (Some(a), Some(b)) => std::ptr::eq(a, b),
            (None, None) => true,
            _ => false,
        };
        same_instance && self.t == other.t && self.wo == other.wo && self.surface == other.surface
    }
}
