//! Geometric shapes in their local coordinate system.
//!
//! Shapes know nothing about transforms or materials; an `Instance` places
//! them in the world. A shape test only ever tightens `its.t`: a candidate
//! farther than the current `its.t` is reported as a miss.

use crate::intersection::{AreaSample, Intersection, SurfaceEvent, EPSILON};
use crate::mesh::TriangleMesh;
use crate::sdf::Sdf;
use lumen_core::Sampler;
use lumen_math::{warp, Aabb, Frame, Ray, Vec2, Vec3};
use std::f32::consts::FRAC_1_PI;

/// Unit sphere centred at the origin.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sphere;

impl Sphere {
    const EPSILON: f32 = 3e-5;

    fn populate(surface: &mut SurfaceEvent, position: Vec3) {
        let normal = position.normalize();
        surface.position = normal;
        surface.frame = Frame::from_normal(normal);
        surface.uv = warp::direction_to_sphere_uv(normal);
        surface.pdf = 0.25 * FRAC_1_PI;
    }

    pub fn intersect(&self, ray: &Ray, its: &mut Intersection) -> bool {
        let oc = ray.origin;
        let a = ray.direction.length_squared();
        let b = 2.0 * ray.direction.dot(oc);
        let c = oc.length_squared() - 1.0;
        let discriminant = b * b - 4.0 * a * c;
        if discriminant < Self::EPSILON {
            return false;
        }

        let sqrt_d = discriminant.sqrt();
        let t_near = (-b - sqrt_d) / a * 0.5;
        let t_far = (-b + sqrt_d) / a * 0.5;

        let t = if t_near >= Self::EPSILON {
            t_near
        } else if t_far >= Self::EPSILON {
            // Origin inside the sphere
            t_far
        } else {
            return false;
        };

        if t > its.t {
            return false;
        }
        its.t = t;
        Self::populate(&mut its.surface, ray.at(t));
        true
    }

    pub fn sample_area(&self, rng: &mut dyn Sampler) -> AreaSample {
        let mut sample = AreaSample::default();
        Self::populate(&mut sample, warp::square_to_uniform_sphere(rng.next_2d()));
        sample
    }
}

/// The square `[-1, 1]^2` in the z = 0 plane, facing +z.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rectangle;

impl Rectangle {
    fn populate(surface: &mut SurfaceEvent, position: Vec3) {
        surface.position = position;
        surface.uv = Vec2::new((position.x + 1.0) * 0.5, (position.y + 1.0) * 0.5);
        surface.frame = Frame::default();
        surface.pdf = 0.25;
    }

    pub fn intersect(&self, ray: &Ray, its: &mut Intersection) -> bool {
        if ray.direction.z == 0.0 {
            return false;
        }

        let t = -ray.origin.z / ray.direction.z;
        if t < EPSILON || t > its.t {
            return false;
        }

        let position = ray.at(t);
        if position.x.abs() > 1.0 || position.y.abs() > 1.0 {
            return false;
        }

        its.t = t;
        Self::populate(&mut its.surface, Vec3::new(position.x, position.y, 0.0));
        true
    }

    pub fn sample_area(&self, rng: &mut dyn Sampler) -> AreaSample {
        let u = rng.next_2d() * 2.0 - Vec2::ONE;
        let mut sample = AreaSample::default();
        Self::populate(&mut sample, Vec3::new(u.x, u.y, 0.0));
        sample
    }
}

/// Any shape that can be instanced.
#[derive(Debug, Clone)]
pub enum Shape {
    Sphere(Sphere),
    Rectangle(Rectangle),
    Sdf(Sdf),
    Mesh(TriangleMesh),
}

impl Shape {
    pub fn sphere() -> Self {
        Shape::Sphere(Sphere)
    }

    pub fn rectangle() -> Self {
        Shape::Rectangle(Rectangle)
    }

    /// Short name used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Shape::Sphere(_) => "sphere",
            Shape::Rectangle(_) => "rectangle",
            Shape::Sdf(_) => "sdf",
            Shape::Mesh(_) => "mesh",
        }
    }

    /// Intersect a local ray with unit-length direction. Only tightens `its`.
    pub fn intersect(&self, ray: &Ray, its: &mut Intersection, _rng: &mut dyn Sampler) -> bool {
        match self {
            Shape::Sphere(sphere) => sphere.intersect(ray, its),
            Shape::Rectangle(rectangle) => rectangle.intersect(ray, its),
            Shape::Sdf(sdf) => sdf.intersect(ray, its),
            Shape::Mesh(mesh) => mesh.intersect(ray, its),
        }
    }

    pub fn bounding_box(&self) -> Aabb {
        match self {
            Shape::Sphere(_) | Shape::Sdf(_) => Aabb::from_points(-Vec3::ONE, Vec3::ONE),
            Shape::Rectangle(_) => Aabb::from_points(Vec3::new(-1.0, -1.0, 0.0), Vec3::new(1.0, 1.0, 0.0)),
            Shape::Mesh(mesh) => mesh.bounding_box(),
        }
    }

    pub fn centroid(&self) -> Vec3 {
        match self {
            Shape::Sphere(_) | Shape::Rectangle(_) | Shape::Sdf(_) => Vec3::ZERO,
            Shape::Mesh(mesh) => mesh.bounding_box().centroid(),
        }
    }

    pub fn supports_area_sampling(&self) -> bool {
        matches!(self, Shape::Sphere(_) | Shape::Rectangle(_))
    }

    /// Uniformly sample a point on the surface, pdf per unit local area.
    pub fn sample_area(&self, rng: &mut dyn Sampler) -> Option<AreaSample> {
        match self {
            Shape::Sphere(sphere) => Some(sphere.sample_area(rng)),
            Shape::Rectangle(rectangle) => Some(rectangle.sample_area(rng)),
            Shape::Sdf(_) | Shape::Mesh(_) => None,
        }
    }
}

impl From<Sdf> for Shape {
    fn from(sdf: Sdf) -> Self {
        Shape::Sdf(sdf)
    }
}

impl From<TriangleMesh> for Shape {
    fn from(mesh: TriangleMesh) -> Self {
        Shape::Mesh(mesh)
    }
}
