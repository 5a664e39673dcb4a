//! The renderable world: instances, lights and background.

use crate::bvh::BvhNode;
use crate::instance::Instance;
use crate::intersection::Intersection;
use crate::light::Light;
use lumen_core::Sampler;
use lumen_math::{Aabb, Color, Ray, Vec3};
use std::sync::Arc;

/// Radiance arriving from directions that leave the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Background {
    Constant(Color),
    /// White at the horizon blending to blue at the zenith (+z is up).
    Sky,
}

impl Default for Background {
    fn default() -> Self {
        Background::Constant(Color::ZERO)
    }
}

impl Background {
    pub fn evaluate(&self, direction: Vec3) -> Color {
        match self {
            Background::Constant(color) => *color,
            Background::Sky => {
                let unit_direction = direction.normalize_or_zero();
                let a = 0.5 * (unit_direction.z + 1.0);
                let white = Color::new(1.0, 1.0, 1.0);
                let blue = Color::new(0.5, 0.7, 1.0);
                white * (1.0 - a) + blue * a
            }
        }
    }
}

/// Immutable scene shared by all render threads.
#[derive(Debug)]
pub struct Scene {
    instances: Vec<Arc<Instance>>,
    /// Indices into `instances` of everything rays can hit
    visible: Vec<usize>,
    bvh: BvhNode,
    lights: Vec<Light>,
    background: Background,
}

impl Scene {
    pub fn new(instances: Vec<Arc<Instance>>, lights: Vec<Light>, background: Background) -> Self {
        let visible: Vec<usize> = instances
            .iter()
            .enumerate()
            .filter(|(_, instance)| instance.is_visible())
            .map(|(index, _)| index)
            .collect();

        let bboxes: Vec<Aabb> = visible.iter().map(|&i| instances[i].bounding_box()).collect();
        let centroids: Vec<Vec3> = visible.iter().map(|&i| instances[i].centroid()).collect();
        let bvh = BvhNode::new(&bboxes, &centroids);

        log::info!(
            "Built scene with {} instances ({} visible) and {} lights",
            instances.len(),
            visible.len(),
            lights.len()
        );

        Self {
            instances,
            visible,
            bvh,
            lights,
            background,
        }
    }

    pub fn instances(&self) -> &[Arc<Instance>] {
        &self.instances
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn bounding_box(&self) -> Aabb {
        self.bvh.bounding_box()
    }

    /// Closest hit along a ray with unit direction.
    pub fn intersect(&self, ray: &Ray, rng: &mut dyn Sampler) -> Intersection<'_> {
        let mut its = Intersection::new(ray.direction);
        self.intersect_until(ray, &mut its, rng);
        its
    }

    fn intersect_until<'a>(&'a self, ray: &Ray, its: &mut Intersection<'a>, rng: &mut dyn Sampler) -> bool {
        let t_max = its.t;
        self.bvh.intersect(ray, t_max, &mut |index| {
            let instance = &self.instances[self.visible[index]];
            if instance.intersect(ray, its, rng) {
                Some(its.t)
            } else {
                None
            }
        })
    }

    /// Whether anything blocks the ray before `max_distance`.
    pub fn is_occluded(&self, ray: &Ray, max_distance: f32, rng: &mut dyn Sampler) -> bool {
        let mut its = Intersection::with_max_distance(ray.direction, max_distance);
        self.intersect_until(ray, &mut its, rng)
    }

    pub fn has_lights(&self) -> bool {
        !self.lights.is_empty()
    }

    /// Pick a light uniformly; returns it with its selection probability.
    pub fn sample_light(&self, rng: &mut dyn Sampler) -> Option<(&Light, f32)> {
        let count = self.lights.len();
        if count == 0 {
            return None;
        }
        let index = ((rng.next() * count as f32) as usize).min(count - 1);
        Some((&self.lights[index], 1.0 / count as f32))
    }

    pub fn evaluate_background(&self, direction: Vec3) -> Color {
        self.background.evaluate(direction)
    }
}
