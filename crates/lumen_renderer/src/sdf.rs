//! Implicit surfaces rendered by sphere tracing a signed distance function.

use crate::error::SceneError;
use crate::intersection::{Intersection, EPSILON};
use lumen_math::{Frame, Ray, Vec2, Vec3};
use std::str::FromStr;

const MAX_STEPS: usize = 500;
const MAX_DISTANCE: f32 = 100.0;

/// Marching starts this far along the ray so a surface does not re-hit itself.
const MIN_T: f32 = 1e-3;

const MANDELBULB_ITERATIONS: usize = 18;

/// The distance functions available to [`Sdf`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdfKind {
    /// Unit sphere.
    Sphere,
    /// Box of half-size 0.5 with rounded edges.
    Box,
    /// Mandelbulb fractal of power `3 + round`.
    Mandelbulb,
}

impl FromStr for SdfKind {
    type Err = SceneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sphere" => Ok(SdfKind::Sphere),
            "box" => Ok(SdfKind::Box),
            "mandelbulb" => Ok(SdfKind::Mandelbulb),
            _ => Err(SceneError::UnknownSdfShape(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Sdf {
    kind: SdfKind,
    /// Edge rounding for boxes, extra power for the Mandelbulb.
    round: f32,
}

impl Sdf {
    pub fn new(kind: SdfKind, round: f32) -> Self {
        Self { kind, round }
    }

    pub fn kind(&self) -> SdfKind {
        self.kind
    }

    /// Signed distance from `p` to the surface.
    pub fn distance(&self, p: Vec3) -> f32 {
        match self.kind {
            SdfKind::Sphere => p.length() - 1.0,
            SdfKind::Box => {
                let q = p.abs() - Vec3::splat(0.5);
                q.max(Vec3::ZERO).length() + q.max_element().min(0.0) - self.round
            }
            SdfKind::Mandelbulb => self.mandelbulb_distance(p),
        }
    }

    fn mandelbulb_distance(&self, p: Vec3) -> f32 {
        let power = 3.0 + self.round;
        let mut z = p;
        let mut dr = 1.0f32;
        let mut r = 0.0f32;

        for _ in 0..MANDELBULB_ITERATIONS {
            r = z.length();
            if r > 4.0 {
                break;
            }

            // Polar coordinates, scaled and rotated
            let theta = (z.z / r).acos() * power;
            let phi = z.y.atan2(z.x) * power;
            dr = r.powf(power - 1.0) * power * dr + 1.0;

            let zr = r.powf(power);
            z = zr * Vec3::new(theta.sin() * phi.cos(), phi.sin() * theta.sin(), theta.cos()) + p;
        }

        0.5 * r.ln() * r / dr
    }

    /// Surface normal from the central-difference gradient.
    pub fn normal(&self, p: Vec3) -> Vec3 {
        let h = EPSILON;
        let dx = Vec3::new(h, 0.0, 0.0);
        let dy = Vec3::new(0.0, h, 0.0);
        let dz = Vec3::new(0.0, 0.0, h);
        Vec3::new(
            self.distance(p + dx) - self.distance(p - dx),
            self.distance(p + dy) - self.distance(p - dy),
            self.distance(p + dz) - self.distance(p - dz),
        )
        .normalize_or_zero()
    }

    pub fn intersect(&self, ray: &Ray, its: &mut Intersection) -> bool {
        let mut t = MIN_T;
        for _ in 0..MAX_STEPS {
            let dist = self.distance(ray.at(t));

            if dist.abs() < EPSILON {
                let t_hit = t + dist;
                if t_hit < MIN_T || t_hit > its.t {
                    return false;
                }

                let position = ray.at(t_hit);
                let normal = self.normal(position);
                if normal == Vec3::ZERO {
                    return false;
                }

                its.t = t_hit;
                its.surface.position = position;
                its.surface.uv = Vec2::ZERO;
                its.surface.frame = Frame::from_normal(normal);
                its.surface.pdf = 0.0;
                return true;
            }

            t += dist;
            if t > MAX_DISTANCE || t > its.t {
                return false;
            }
        }
        false
    }
}
