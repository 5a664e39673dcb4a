//! Camera for ray generation.
//!
//! In local coordinates the camera sits at the origin and looks along +z,
//! with +x to the right of the image and +y up. A transform places it in
//! the world.

use crate::error::{SceneError, SceneResult};
use lumen_core::Sampler;
use lumen_math::{warp, Mat4, Ray, Transform, UVec2, Vec2, Vec3};
use std::str::FromStr;

/// Image axis the field of view is measured along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FovAxis {
    #[default]
    X,
    Y,
    /// Same as `X`.
    Z,
}

impl FromStr for FovAxis {
    type Err = SceneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "x" => Ok(FovAxis::X),
            "y" => Ok(FovAxis::Y),
            "z" => Ok(FovAxis::Z),
            _ => Err(SceneError::InvalidFovAxis(s.to_string())),
        }
    }
}

/// Camera-to-world transform for a camera at `origin` looking at `target`.
pub fn look_at(origin: Vec3, target: Vec3, up: Vec3) -> SceneResult<Transform> {
    let forward = (target - origin).normalize_or_zero();
    let right = forward.cross(up).normalize_or_zero();
    if forward == Vec3::ZERO || right == Vec3::ZERO {
        return Err(SceneError::SingularTransform);
    }
    let true_up = right.cross(forward);

    let matrix = Mat4::from_cols(
        right.extend(0.0),
        true_up.extend(0.0),
        forward.extend(0.0),
        origin.extend(1.0),
    );
    Transform::from_matrix(matrix).ok_or(SceneError::SingularTransform)
}

/// Perspective camera, optionally with a thin lens for depth of field.
#[derive(Debug, Clone)]
pub struct Camera {
    resolution: UVec2,
    transform: Transform,
    /// Half-extent of the image plane at unit distance
    plane: Vec2,
    /// Lens radius; zero is a pinhole
    aperture: f32,
    /// Distance of the plane in perfect focus
    focal_distance: f32,
}

impl Camera {
    /// Create a pinhole camera. `fov` is in degrees.
    pub fn new(width: u32, height: u32, fov: f32, fov_axis: FovAxis, transform: Transform) -> Self {
        let aspect = width as f32 / height.max(1) as f32;
        let size = (fov.to_radians() * 0.5).tan();
        let plane = match fov_axis {
            FovAxis::X | FovAxis::Z => Vec2::new(size, size / aspect),
            FovAxis::Y => Vec2::new(size * aspect, size),
        };

        Self {
            resolution: UVec2::new(width, height),
            transform,
            plane,
            aperture: 0.0,
            focal_distance: 1.0,
        }
    }

    /// Set lens settings.
    pub fn with_lens(mut self, aperture: f32, focal_distance: f32) -> Self {
        self.aperture = aperture.max(0.0);
        self.focal_distance = focal_distance;
        self
    }

    pub fn resolution(&self) -> UVec2 {
        self.resolution
    }

    pub fn width(&self) -> u32 {
        self.resolution.x
    }

    pub fn height(&self) -> u32 {
        self.resolution.y
    }

    /// World ray with unit direction through normalized image coordinates in
    /// `[-1, 1]^2`, (-1, -1) being the bottom left corner.
    pub fn sample(&self, normalized: Vec2, rng: &mut dyn Sampler) -> Ray {
        let direction = Vec3::new(normalized.x * self.plane.x, normalized.y * self.plane.y, 1.0).normalize();

        let local = if self.aperture > 0.0 {
            let lens = self.aperture * warp::square_to_concentric_disk(rng.next_2d());
            let origin = Vec3::new(lens.x, lens.y, 0.0);
            let focus = direction * (self.focal_distance / direction.z);
            Ray::new(origin, (focus - origin).normalize())
        } else {
            Ray::new(Vec3::ZERO, direction)
        };

        self.transform.apply_ray(&local).normalized()
    }
}
