//! Light sources for next event estimation.

use crate::error::{SceneError, SceneResult};
use crate::instance::Instance;
use lumen_core::Sampler;
use lumen_math::{Color, Vec3};
use std::f32::consts::PI;
use std::sync::Arc;

/// Angular tolerance at the outer edge of a spot cone, radians.
const EDGE_EPSILON: f32 = 1e-5;

/// A direction towards a light with its contribution already divided by
/// the sampling density.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectLightSample {
    /// World direction from the shading point towards the light
    pub wi: Vec3,
    pub weight: Color,
    /// Distance to the light; infinite for directional lights
    pub distance: f32,
}

/// Emissive instance sampled by area.
#[derive(Debug, Clone)]
pub struct AreaLight {
    instance: Arc<Instance>,
}

impl AreaLight {
    /// Fails if the instance cannot be sampled or does not emit.
    pub fn new(instance: Arc<Instance>) -> SceneResult<Self> {
        if !instance.shape().supports_area_sampling() {
            return Err(SceneError::AreaSamplingUnsupported(instance.shape().kind()));
        }
        if instance.emission().is_none() {
            return Err(SceneError::MissingEmission);
        }
        Ok(Self { instance })
    }

    pub fn instance(&self) -> &Arc<Instance> {
        &self.instance
    }

    pub fn sample_direct(&self, origin: Vec3, rng: &mut dyn Sampler) -> Option<DirectLightSample> {
        let sample = self.instance.sample_area(rng)?;
        let offset = sample.position - origin;
        let distance = offset.length();
        if sample.pdf == 0.0 || distance == 0.0 {
            return None;
        }

        let wi = offset / distance;
        let local_wi = sample.frame.to_local(wi).normalize_or_zero();
        let emission = self.instance.evaluate_emission(sample.uv, -local_wi);
        let weight = emission * local_wi.z.abs() / (distance * distance * sample.pdf);
        Some(DirectLightSample { wi, weight, distance })
    }
}

/// Isotropic point emitter.
#[derive(Debug, Clone, Copy)]
pub struct PointLight {
    pub position: Vec3,
    pub power: Color,
}

impl PointLight {
    pub fn new(position: Vec3, power: Color) -> Self {
        Self { position, power }
    }

    pub fn sample_direct(&self, origin: Vec3) -> Option<DirectLightSample> {
        let offset = self.position - origin;
        let distance = offset.length();
        if distance == 0.0 {
            return None;
        }
        Some(DirectLightSample {
            wi: offset / distance,
            weight: self.power / (4.0 * PI * distance * distance),
            distance,
        })
    }
}

/// Light arriving from a fixed direction, e.g. the sun.
#[derive(Debug, Clone, Copy)]
pub struct DirectionalLight {
    /// Unit direction towards the light
    pub direction: Vec3,
    pub intensity: Color,
}

impl DirectionalLight {
    pub fn new(direction: Vec3, intensity: Color) -> Self {
        Self {
            direction: direction.normalize_or_zero(),
            intensity,
        }
    }

    pub fn sample_direct(&self) -> DirectLightSample {
        DirectLightSample {
            wi: self.direction,
            weight: self.intensity,
            distance: f32::INFINITY,
        }
    }
}

/// Cone of light with a linear falloff at its border.
#[derive(Debug, Clone, Copy)]
pub struct SpotLight {
    pub position: Vec3,
    /// Unit axis of the cone, pointing away from the light
    pub direction: Vec3,
    pub intensity: Color,
    /// Half-angle of full intensity, radians
    angle: f32,
    /// Angular width of the falloff band, radians
    falloff: f32,
}

impl SpotLight {
    /// `angle` and `falloff` are full cone angles in degrees.
    pub fn new(position: Vec3, direction: Vec3, intensity: Color, angle: f32, falloff: f32) -> Self {
        Self {
            position,
            direction: direction.normalize_or_zero(),
            intensity,
            angle: (angle * 0.5).to_radians(),
            falloff: (falloff * 0.5).to_radians(),
        }
    }

    /// Fraction of the intensity emitted at `angle` radians off the axis.
    ///
    /// The outer edge itself is dark; angles within `EDGE_EPSILON` of it
    /// absorb the rounding of the `acos` that produced them.
    fn attenuation(&self, angle: f32) -> f32 {
        if angle >= self.angle + self.falloff - EDGE_EPSILON {
            0.0
        } else if angle > self.angle {
            (1.0 - (angle - self.angle) / self.falloff).clamp(0.0, 1.0)
        } else {
            1.0
        }
    }

    pub fn sample_direct(&self, origin: Vec3) -> Option<DirectLightSample> {
        let offset = origin - self.position;
        let distance = offset.length();
        if distance == 0.0 {
            return None;
        }

        let dir = offset / distance;
        let angle = self.direction.dot(dir).clamp(-1.0, 1.0).acos();
        Some(DirectLightSample {
            wi: -dir,
            weight: self.intensity * self.attenuation(angle),
            distance,
        })
    }
}

#[derive(Debug, Clone)]
pub enum Light {
    Area(AreaLight),
    Point(PointLight),
    Directional(DirectionalLight),
    Spot(SpotLight),
}

impl Light {
    /// Sample a direction towards the light as seen from `origin`.
    pub fn sample_direct(&self, origin: Vec3, rng: &mut dyn Sampler) -> Option<DirectLightSample> {
        match self {
            Light::Area(light) => light.sample_direct(origin, rng),
            Light::Point(light) => light.sample_direct(origin),
            Light::Directional(light) => Some(light.sample_direct()),
            Light::Spot(light) => light.sample_direct(origin),
        }
    }

    /// Whether paths can hit this light on their own (and would count its
    /// emission twice if it were also sampled directly).
    pub fn can_be_intersected(&self) -> bool {
        match self {
            Light::Area(light) => light.instance.is_visible(),
            Light::Point(_) | Light::Directional(_) | Light::Spot(_) => false,
        }
    }
}

impl From<AreaLight> for Light {
    fn from(light: AreaLight) -> Self {
        Light::Area(light)
    }
}

impl From<PointLight> for Light {
    fn from(light: PointLight) -> Self {
        Light::Point(light)
    }
}

impl From<DirectionalLight> for Light {
    fn from(light: DirectionalLight) -> Self {
        Light::Directional(light)
    }
}

impl From<SpotLight> for Light {
    fn from(light: SpotLight) -> Self {
        Light::Spot(light)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emission::Emission;
    use crate::sdf::{Sdf, SdfKind};
    use crate::shape::Shape;
    use lumen_core::Independent;
    use lumen_math::{Quat, Transform};

    #[test]
    fn test_point_light_inverse_square() {
        let light = PointLight::new(Vec3::new(0.0, 0.0, 2.0), Color::splat(100.0));
        let sample = light.sample_direct(Vec3::ZERO).expect("valid sample");

        assert_eq!(sample.wi, Vec3::Z);
        assert_eq!(sample.distance, 2.0);
        let recovered = sample.weight * 4.0 * PI * 4.0;
        assert!((recovered - Color::splat(100.0)).length() < 1e-3);

        assert!(light.sample_direct(Vec3::new(0.0, 0.0, 2.0)).is_none());
    }

    #[test]
    fn test_directional_light() {
        let light = Light::Directional(DirectionalLight::new(Vec3::new(0.0, 0.0, 2.0), Color::ONE));
        let mut rng = Independent::new(0);
        let sample = light.sample_direct(Vec3::new(5.0, 5.0, 5.0), &mut rng).expect("always samples");

        assert_eq!(sample.wi, Vec3::Z);
        assert!(sample.distance.is_infinite());
        assert!(!light.can_be_intersected());
    }

    #[test]
    fn test_spot_light_falloff() {
        // 60 degree cone with a 20 degree falloff band, pointing down
        let light = SpotLight::new(Vec3::ZERO, -Vec3::Z, Color::ONE, 60.0, 20.0);
        let at_angle = |degrees: f32| {
            let d = Vec3::new(degrees.to_radians().sin(), 0.0, -degrees.to_radians().cos());
            light.sample_direct(d * 3.0).expect("valid sample").weight.x
        };

        assert_eq!(at_angle(0.0), 1.0);
        assert_eq!(at_angle(29.0), 1.0);
        assert!((at_angle(35.0) - 0.5).abs() < 1e-3);
        assert!(at_angle(39.9) < 0.02);
        assert_eq!(at_angle(41.0), 0.0);

        // Continuous at the inner edge
        assert!((at_angle(30.01) - 1.0).abs() < 1e-2);

        // Dark exactly at the outer edge
        assert_eq!(at_angle(40.0), 0.0);
        assert_eq!(light.attenuation(light.angle + light.falloff), 0.0);
        assert_eq!(light.attenuation((light.angle + light.falloff).cos().acos()), 0.0);

        let sample = light.sample_direct(Vec3::new(0.0, 0.0, -3.0)).expect("valid sample");
        assert!((sample.wi - Vec3::Z).length() < 1e-6);
        assert_eq!(sample.distance, 3.0);
    }

    #[test]
    fn test_area_light_requires_sampling_and_emission() {
        let sdf = Arc::new(Instance::new(Shape::Sdf(Sdf::new(SdfKind::Sphere, 0.0))).with_emission(Emission::lambertian(Color::ONE)));
        assert!(matches!(AreaLight::new(sdf), Err(SceneError::AreaSamplingUnsupported("sdf"))));

        let dark = Arc::new(Instance::new(Shape::sphere()));
        assert!(matches!(AreaLight::new(dark), Err(SceneError::MissingEmission)));
    }

    #[test]
    fn test_area_light_matches_solid_angle() {
        // A small emitting rectangle facing down, 4 units above the origin:
        // the estimate should approach emission * solid angle * cos
        let transform = Transform::from_scale_rotation_translation(
            Vec3::splat(0.05),
            Quat::from_rotation_x(PI),
            Vec3::new(0.0, 0.0, 4.0),
        )
        .expect("invertible");
        let instance = Arc::new(
            Instance::new(Shape::rectangle())
                .with_transform(transform)
                .with_emission(Emission::lambertian(Color::splat(10.0))),
        );
        let light = Light::Area(AreaLight::new(instance).expect("valid area light"));
        assert!(light.can_be_intersected());

        let mut rng = Independent::new(42);
        let n = 1000;
        let mut sum = Color::ZERO;
        for _ in 0..n {
            let sample = light.sample_direct(Vec3::ZERO, &mut rng).expect("valid sample");
            assert!(sample.wi.z > 0.99);
            sum += sample.weight;
        }
        let estimate = sum / n as f32;

        // Area 0.01, distance 4, facing the origin
        let expected = 10.0 * 0.01 / 16.0;
        assert!((estimate.x - expected).abs() < expected * 0.01, "{} vs {expected}", estimate.x);
    }

    #[test]
    fn test_area_light_back_side_is_dark() {
        // Rectangle faces +z, origin is below it
        let instance = Arc::new(
            Instance::new(Shape::rectangle())
                .with_transform(Transform::from_translation(Vec3::new(0.0, 0.0, 2.0)))
                .with_emission(Emission::lambertian(Color::ONE))
                .with_visibility(false),
        );
        let light = Light::Area(AreaLight::new(instance).expect("valid area light"));
        assert!(!light.can_be_intersected());

        let mut rng = Independent::new(1);
        let sample = light.sample_direct(Vec3::ZERO, &mut rng).expect("valid sample");
        assert_eq!(sample.weight, Color::ZERO);
    }
}
