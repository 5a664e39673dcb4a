// Affine transforms for instancing
//
// Wraps glam::Mat4 together with its cached inverse so rays can be taken
// into local space without re-inverting per query.

use crate::{Aabb, Mat4, Quat, Ray, Vec3};

/// Determinants below this magnitude are treated as singular.
const MIN_DETERMINANT: f32 = 1e-12;

/// An invertible local-to-world transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    matrix: Mat4,
    inverse: Mat4,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        matrix: Mat4::IDENTITY,
        inverse: Mat4::IDENTITY,
    };

    /// Build a transform from a matrix.
    ///
    /// Returns `None` if the matrix is singular or not finite.
    pub fn from_matrix(matrix: Mat4) -> Option<Self> {
        let det = matrix.determinant();
        if !det.is_finite() || det.abs() < MIN_DETERMINANT {
            return None;
        }
        Some(Self {
            matrix,
            inverse: matrix.inverse(),
        })
    }

    /// Order: Scale -> Rotate -> Translate (SRT)
    pub fn from_scale_rotation_translation(scale: Vec3, rotation: Quat, translation: Vec3) -> Option<Self> {
        Self::from_matrix(Mat4::from_scale_rotation_translation(scale, rotation, translation))
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            matrix: Mat4::from_translation(translation),
            inverse: Mat4::from_translation(-translation),
        }
    }

    /// Local-to-world matrix.
    pub fn matrix(&self) -> Mat4 {
        self.matrix
    }

    /// `self` applied after `first`.
    pub fn compose(&self, first: &Transform) -> Transform {
        Transform {
            matrix: self.matrix * first.matrix,
            inverse: first.inverse * self.inverse,
        }
    }

    #[inline]
    pub fn apply_point(&self, p: Vec3) -> Vec3 {
        self.matrix.transform_point3(p)
    }

    /// Transform a direction (w = 0, translation has no effect).
    #[inline]
    pub fn apply_vector(&self, v: Vec3) -> Vec3 {
        self.matrix.transform_vector3(v)
    }

    #[inline]
    pub fn inverse_point(&self, p: Vec3) -> Vec3 {
        self.inverse.transform_point3(p)
    }

    #[inline]
    pub fn inverse_vector(&self, v: Vec3) -> Vec3 {
        self.inverse.transform_vector3(v)
    }

    /// Map a ray to world space. The direction is not renormalized.
    pub fn apply_ray(&self, ray: &Ray) -> Ray {
        Ray::new(self.apply_point(ray.origin), self.apply_vector(ray.direction))
    }

    /// Map a world ray into local space. The direction is not renormalized,
    /// its length is the local/world distance ratio.
    pub fn inverse_ray(&self, ray: &Ray) -> Ray {
        Ray::new(self.inverse_point(ray.origin), self.inverse_vector(ray.direction))
    }

    /// World-space bounds of a local box.
    ///
    /// Transforms all 8 corners and extends the result over them. Unbounded
    /// boxes map straight to the full box.
    pub fn apply_aabb(&self, aabb: &Aabb) -> Aabb {
        if aabb.is_unbounded() {
            return Aabb::FULL;
        }

        let mut result = Aabb::EMPTY;
        for index in 0..8 {
            result.extend(self.apply_point(aabb.corner(index)));
        }
        result
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_translation_point_and_vector() {
        let t = Transform::from_translation(Vec3::new(10.0, 20.0, 30.0));
        assert_eq!(t.apply_point(Vec3::new(1.0, 2.0, 3.0)), Vec3::new(11.0, 22.0, 33.0));

        // Translation should NOT affect vectors (w=0)
        assert_eq!(t.apply_vector(Vec3::X), Vec3::X);
    }

    #[test]
    fn test_rotation_vector() {
        let t = Transform::from_scale_rotation_translation(Vec3::ONE, Quat::from_rotation_z(PI / 2.0), Vec3::ZERO)
            .expect("rotation is invertible");
        let v = t.apply_vector(Vec3::X);

        // X vector should rotate to Y vector
        assert!((v - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn test_inverse_ray_tracks_scale() {
        let t = Transform::from_scale_rotation_translation(Vec3::splat(2.0), Quat::IDENTITY, Vec3::ZERO)
            .expect("scale is invertible");
        let world = Ray::new(Vec3::new(4.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0));
        let local = t.inverse_ray(&world);

        assert!((local.origin - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-6);
        // Local direction shrinks by the scale: world distance 1 is local distance 0.5
        assert!((local.direction.length() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_round_trip() {
        let t = Transform::from_scale_rotation_translation(
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_rotation_y(PI / 4.0),
            Vec3::new(5.0, 3.0, 2.0),
        )
        .expect("invertible");

        let p = Vec3::new(5.0, 3.0, 2.0);
        let back = t.inverse_point(t.apply_point(p));
        assert!((back - p).length() < 1e-4);
    }

    #[test]
    fn test_singular_matrix_rejected() {
        let flat = Mat4::from_scale(Vec3::new(1.0, 0.0, 1.0));
        assert!(Transform::from_matrix(flat).is_none());
    }

    #[test]
    fn test_compose_order() {
        let scale = Transform::from_scale_rotation_translation(Vec3::splat(2.0), Quat::IDENTITY, Vec3::ZERO)
            .expect("invertible");
        let translate = Transform::from_translation(Vec3::new(1.0, 0.0, 0.0));

        // Scale first, then translate
        let t = translate.compose(&scale);
        assert_eq!(t.apply_point(Vec3::X), Vec3::new(3.0, 0.0, 0.0));
        assert!((t.inverse_point(Vec3::new(3.0, 0.0, 0.0)) - Vec3::X).length() < 1e-6);
    }

    #[test]
    fn test_apply_aabb_translation() {
        let t = Transform::from_translation(Vec3::splat(5.0));
        let transformed = t.apply_aabb(&Aabb::from_points(Vec3::ZERO, Vec3::ONE));

        assert!((transformed.min() - Vec3::splat(5.0)).length() < 1e-3);
        assert!((transformed.max() - Vec3::splat(6.0)).length() < 1e-3);
    }

    #[test]
    fn test_apply_aabb_rotation_grows_box() {
        let t = Transform::from_scale_rotation_translation(Vec3::ONE, Quat::from_rotation_z(PI / 4.0), Vec3::ZERO)
            .expect("invertible");
        let transformed = t.apply_aabb(&Aabb::from_points(Vec3::splat(-1.0), Vec3::splat(1.0)));

        let half_diagonal = 2.0f32.sqrt();
        assert!((transformed.x.max - half_diagonal).abs() < 1e-4);
        assert!((transformed.y.min + half_diagonal).abs() < 1e-4);
    }

    #[test]
    fn test_apply_aabb_unbounded_fast_path() {
        let t = Transform::from_translation(Vec3::ONE);
        let half_space = Aabb::new(
            crate::Interval::new(0.0, f32::INFINITY),
            crate::Interval::new(0.0, 1.0),
            crate::Interval::new(0.0, 1.0),
        );
        assert_eq!(t.apply_aabb(&half_space), Aabb::FULL);
    }
}
