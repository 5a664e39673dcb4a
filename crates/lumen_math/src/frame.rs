use crate::Vec3;

/// Orthonormal shading basis. In local coordinates the normal is +Z.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub tangent: Vec3,
    pub bitangent: Vec3,
    pub normal: Vec3,
}

impl Frame {
    /// Build a frame around a unit normal.
    ///
    /// Branchless basis from Duff et al. 2017 ("Building an Orthonormal
    /// Basis, Revisited"); `tangent × bitangent == normal`.
    pub fn from_normal(n: Vec3) -> Self {
        let sign = if n.z >= 0.0 { 1.0 } else { -1.0 };
        let a = -1.0 / (sign + n.z);
        let b = n.x * n.y * a;

        let tangent = Vec3::new(1.0 + sign * n.x * n.x * a, sign * b, -sign * n.x);
        let bitangent = Vec3::new(b, sign + n.y * n.y * a, -n.y);

        Self {
            tangent,
            bitangent,
            normal: n,
        }
    }

    /// Express a world direction in this frame.
    #[inline]
    pub fn to_local(&self, v: Vec3) -> Vec3 {
        Vec3::new(v.dot(self.tangent), v.dot(self.bitangent), v.dot(self.normal))
    }

    /// Express a local direction in world space.
    #[inline]
    pub fn to_world(&self, v: Vec3) -> Vec3 {
        self.tangent * v.x + self.bitangent * v.y + self.normal * v.z
    }

    #[inline]
    pub fn cos_theta(w: Vec3) -> f32 {
        w.z
    }

    #[inline]
    pub fn abs_cos_theta(w: Vec3) -> f32 {
        w.z.abs()
    }

    /// Squared tangent of the polar angle; infinite at grazing angles.
    #[inline]
    pub fn tan2_theta(w: Vec3) -> f32 {
        let cos2 = w.z * w.z;
        (1.0 - cos2).max(0.0) / cos2
    }

    #[inline]
    pub fn same_hemisphere(a: Vec3, b: Vec3) -> bool {
        a.z * b.z > 0.0
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self {
            tangent: Vec3::X,
            bitangent: Vec3::Y,
            normal: Vec3::Z,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_orthonormal(frame: &Frame) {
        assert!(frame.tangent.dot(frame.normal).abs() < 1e-5);
        assert!(frame.bitangent.dot(frame.normal).abs() < 1e-5);
        assert!(frame.tangent.dot(frame.bitangent).abs() < 1e-5);
        assert!((frame.tangent.length() - 1.0).abs() < 1e-5);
        assert!((frame.bitangent.length() - 1.0).abs() < 1e-5);
        assert!((frame.tangent.cross(frame.bitangent) - frame.normal).length() < 1e-5);
    }

    #[test]
    fn test_orthonormal_basis() {
        for n in [
            Vec3::Y,
            Vec3::Z,
            -Vec3::Z,
            Vec3::new(1.0, 2.0, -3.0).normalize(),
            Vec3::new(-0.3, 0.1, 0.9).normalize(),
        ] {
            assert_orthonormal(&Frame::from_normal(n));
        }
    }

    #[test]
    fn test_local_world_round_trip() {
        let frame = Frame::from_normal(Vec3::new(0.2, -0.7, 0.4).normalize());
        let v = Vec3::new(0.3, 0.5, -0.8);
        let back = frame.to_world(frame.to_local(v));
        assert!((back - v).length() < 1e-5);

        // The normal maps to +Z
        assert!((frame.to_local(frame.normal) - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn test_hemisphere_helpers() {
        assert!(Frame::same_hemisphere(Vec3::new(0.0, 0.3, 0.2), Vec3::Z));
        assert!(!Frame::same_hemisphere(Vec3::new(0.0, 0.3, -0.2), Vec3::Z));
        assert_eq!(Frame::tan2_theta(Vec3::Z), 0.0);
        assert!(Frame::tan2_theta(Vec3::X).is_infinite());
    }
}
