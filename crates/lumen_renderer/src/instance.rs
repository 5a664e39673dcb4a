//! Shapes placed in the world together with their appearance.
//!
//! An instance maps world rays into the local space of its shape, runs the
//! shape test there and maps the result back. On the way it applies the
//! alpha mask, swaps the surface hit for a scattering event inside an
//! attached volume, and rebuilds the shading frame (flip, normal map).

use crate::bsdf::Bsdf;
use crate::emission::Emission;
use crate::intersection::{AreaSample, Intersection, SurfaceEvent};
use crate::shape::Shape;
use crate::volume::Volume;
use lumen_core::{Sampler, Texture};
use lumen_math::{warp, Aabb, Color, Frame, Ray, Transform, Vec2, Vec3};
use std::sync::Arc;

/// Minimum surface thickness when probing for the far side of a volume,
/// relative to the local/world distance ratio.
const VOLUME_PROBE_EPSILON: f32 = 0.001;

#[derive(Debug, Clone)]
pub struct Instance {
    shape: Arc<Shape>,
    transform: Transform,
    bsdf: Option<Arc<Bsdf>>,
    emission: Option<Arc<Emission>>,
    volume: Option<Arc<Volume>>,
    normal_map: Option<Arc<Texture>>,
    alpha: Option<Arc<Texture>>,
    flip_normal: bool,
    visible: bool,
}

impl Instance {
    pub fn new(shape: impl Into<Arc<Shape>>) -> Self {
        Self {
            shape: shape.into(),
            transform: Transform::IDENTITY,
            bsdf: None,
            emission: None,
            volume: None,
            normal_map: None,
            alpha: None,
            flip_normal: false,
            visible: true,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_bsdf(mut self, bsdf: impl Into<Arc<Bsdf>>) -> Self {
        self.bsdf = Some(bsdf.into());
        self
    }

    pub fn with_emission(mut self, emission: impl Into<Arc<Emission>>) -> Self {
        self.emission = Some(emission.into());
        self
    }

    pub fn with_volume(mut self, volume: impl Into<Arc<Volume>>) -> Self {
        self.volume = Some(volume.into());
        self
    }

    /// Tangent-space normal map, decoded as `2 * tex(uv) - 1`.
    pub fn with_normal_map(mut self, normal_map: impl Into<Arc<Texture>>) -> Self {
        self.normal_map = Some(normal_map.into());
        self
    }

    /// Coverage mask; hits are kept with probability `alpha(uv)`.
    pub fn with_alpha(mut self, alpha: impl Into<Arc<Texture>>) -> Self {
        self.alpha = Some(alpha.into());
        self
    }

    pub fn with_flipped_normal(mut self, flip_normal: bool) -> Self {
        self.flip_normal = flip_normal;
        self
    }

    /// Invisible instances are left out of the scene's intersection structure
    /// but can still be sampled, e.g. as area lights.
    pub fn with_visibility(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn bsdf(&self) -> Option<&Bsdf> {
        self.bsdf.as_deref()
    }

    pub fn emission(&self) -> Option<&Emission> {
        self.emission.as_deref()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Emitted radiance towards the local direction `wo`.
    pub fn evaluate_emission(&self, uv: Vec2, wo: Vec3) -> Color {
        self.emission
            .as_ref()
            .map_or(Color::ZERO, |emission| emission.evaluate(uv, wo))
    }

    fn is_transparent(&self, uv: Vec2, rng: &mut dyn Sampler) -> bool {
        match &self.alpha {
            Some(alpha) => rng.next() > alpha.scalar(uv),
            None => false,
        }
    }

    /// Intersect a world ray. On a miss `its` is left exactly as it was.
    pub fn intersect<'a>(&'a self, world_ray: &Ray, its: &mut Intersection<'a>, rng: &mut dyn Sampler) -> bool {
        let previous = *its;

        let local_ray = self.transform.inverse_ray(world_ray);
        let scale = local_ray.direction.length();
        if scale == 0.0 || !scale.is_finite() {
            return false;
        }
        let local_ray = local_ray.normalized();
        its.t *= scale;

        if !self.shape.intersect(&local_ray, its, rng) {
            *its = previous;
            return false;
        }

        if self.is_transparent(its.surface.uv, rng) {
            *its = previous;
            return false;
        }

        if let Some(volume) = &self.volume {
            return self.intersect_volume(volume, world_ray, &local_ray, scale, previous, its, rng);
        }

        its.instance = Some(self);
        its.t /= scale;
        self.transform_frame(&mut its.surface);
        true
    }

    /// Replace a surface hit by a collision inside the attached volume.
    #[allow(clippy::too_many_arguments)]
    fn intersect_volume<'a>(
        &'a self,
        volume: &Volume,
        world_ray: &Ray,
        local_ray: &Ray,
        scale: f32,
        previous: Intersection<'a>,
        its: &mut Intersection<'a>,
        rng: &mut dyn Sampler,
    ) -> bool {
        let epsilon = VOLUME_PROBE_EPSILON * scale;

        // Probe for a second crossing just past the first one
        let probe_ray = Ray::new(local_ray.at(its.t + epsilon), local_ray.direction);
        let mut probe = Intersection::new(local_ray.direction);
        let (its_t, inside_t) = if self.shape.intersect(&probe_ray, &mut probe, rng) {
            // Entered from outside: the medium spans both crossings
            (its.t, probe.t + epsilon)
        } else {
            // Started inside: the medium spans origin to first crossing
            (0.0, its.t)
        };

        match volume.sample_distance(its_t, inside_t, scale, local_ray, rng) {
            Some(distance) if distance < previous.t => {
                let normal = warp::square_to_uniform_sphere(rng.next_2d());
                its.instance = Some(self);
                its.t = distance;
                its.surface.position = world_ray.at(distance);
                its.surface.frame = Frame::from_normal(normal);
                true
            }
            _ => {
                *its = previous;
                false
            }
        }
    }

    /// Map a local surface event to world space and rebuild its frame.
    pub fn transform_frame(&self, surface: &mut SurfaceEvent) {
        surface.position = self.transform.apply_point(surface.position);

        let tangent = self.transform.apply_vector(surface.frame.tangent);
        let bitangent = self.transform.apply_vector(surface.frame.bitangent);

        // Local area to world area
        let area = tangent.cross(bitangent).length();
        surface.pdf = if area > 0.0 { surface.pdf / area } else { 0.0 };

        let tangent = tangent.normalize_or_zero();
        let mut bitangent = bitangent.normalize_or_zero();
        if self.flip_normal {
            bitangent = -bitangent;
        }

        // Gram-Schmidt
        let bitangent = (bitangent - tangent * bitangent.dot(tangent)).normalize_or_zero();
        let normal = tangent.cross(bitangent);
        surface.frame = Frame {
            tangent,
            bitangent: normal.cross(tangent),
            normal,
        };

        if let Some(normal_map) = &self.normal_map {
            let local = 2.0 * normal_map.evaluate(surface.uv) - Vec3::ONE;
            let mapped = surface.frame.to_world(local.normalize_or_zero());
            if mapped != Vec3::ZERO {
                surface.frame = Frame::from_normal(mapped.normalize());
            }
        }
    }

    pub fn bounding_box(&self) -> Aabb {
        self.transform.apply_aabb(&self.shape.bounding_box())
    }

    pub fn centroid(&self) -> Vec3 {
        self.transform.apply_point(self.shape.centroid())
    }

    /// Sample a point on the instance surface, pdf per unit world area.
    pub fn sample_area(&self, rng: &mut dyn Sampler) -> Option<AreaSample> {
        let mut sample = self.shape.sample_area(rng)?;
        self.transform_frame(&mut sample);
        Some(sample)
    }
}
