//! Triangle meshes.
//!
//! Triangles share one vertex buffer and are tested with the Möller-Trumbore
//! algorithm through a per-mesh BVH.

use crate::bvh::BvhNode;
use crate::error::{SceneError, SceneResult};
use crate::intersection::{Intersection, EPSILON};
use lumen_math::{Aabb, Frame, Ray, Vec2, Vec3};
use std::path::Path;

/// Determinants below this are treated as rays parallel to the triangle.
const PARALLEL_EPSILON: f32 = 1e-8;

#[derive(Debug, Clone)]
pub struct TriangleMesh {
    positions: Vec<Vec3>,
    /// Per-vertex normals, empty or one per position
    normals: Vec<Vec3>,
    /// Per-vertex texture coordinates, empty or one per position
    uvs: Vec<Vec2>,
    triangles: Vec<[u32; 3]>,
    /// Interpolate vertex normals instead of using the face normal
    smooth: bool,
    bvh: BvhNode,
    bbox: Aabb,
}

impl TriangleMesh {
    /// Build a mesh from vertex buffers. `normals` and `uvs` are either empty
    /// or have one entry per position.
    pub fn new(positions: Vec<Vec3>, normals: Vec<Vec3>, uvs: Vec<Vec2>, triangles: Vec<[u32; 3]>, smooth: bool) -> Self {
        // Drop triangles that reference missing vertices
        let vertex_count = positions.len();
        let triangles: Vec<[u32; 3]> = triangles
            .into_iter()
            .filter(|tri| tri.iter().all(|&i| (i as usize) < vertex_count))
            .collect();

        let bboxes: Vec<Aabb> = triangles
            .iter()
            .map(|tri| {
                let [a, b, c] = tri.map(|i| positions[i as usize]);
                Aabb::from_points(a.min(b).min(c), a.max(b).max(c))
            })
            .collect();
        let centroids: Vec<Vec3> = triangles
            .iter()
            .map(|tri| tri.iter().map(|&i| positions[i as usize]).sum::<Vec3>() / 3.0)
            .collect();

        let bvh = BvhNode::new(&bboxes, &centroids);
        let bbox = bvh.bounding_box();

        let normals = if normals.len() == vertex_count { normals } else { Vec::new() };
        let uvs = if uvs.len() == vertex_count { uvs } else { Vec::new() };

        Self {
            positions,
            normals,
            uvs,
            triangles,
            smooth,
            bvh,
            bbox,
        }
    }

    /// Load every model of an OBJ file into a single mesh.
    pub fn load_obj(path: impl AsRef<Path>, smooth: bool) -> SceneResult<Self> {
        let path = path.as_ref();
        let (models, _materials) = tobj::load_obj(
            path,
            &tobj::LoadOptions {
                single_index: true,
                triangulate: true,
                ..Default::default()
            },
        )
        .map_err(|source| SceneError::Mesh {
            path: path.display().to_string(),
            source,
        })?;

        let mut positions = Vec::new();
        let mut normals = Vec::new();
        let mut uvs = Vec::new();
        let mut triangles = Vec::new();
        let mut missing_normals = false;
        let mut missing_uvs = false;

        for model in &models {
            let mesh = &model.mesh;
            let offset = positions.len() as u32;
            let vertex_count = mesh.positions.len() / 3;

            positions.extend(mesh.positions.chunks_exact(3).map(Vec3::from_slice));

            if mesh.normals.len() == mesh.positions.len() {
                normals.extend(mesh.normals.chunks_exact(3).map(Vec3::from_slice));
            } else {
                missing_normals = true;
            }
            if mesh.texcoords.len() / 2 == vertex_count {
                uvs.extend(mesh.texcoords.chunks_exact(2).map(Vec2::from_slice));
            } else {
                missing_uvs = true;
            }

            triangles.extend(
                mesh.indices
                    .chunks_exact(3)
                    .map(|face| [face[0] + offset, face[1] + offset, face[2] + offset]),
            );
        }

        if missing_normals {
            normals = vertex_normals(&positions, &triangles);
        }
        if missing_uvs {
            uvs.clear();
        }

        log::info!(
            "Loaded mesh {} ({} models, {} triangles, {} vertices)",
            path.display(),
            models.len(),
            triangles.len(),
            positions.len()
        );
        Ok(Self::new(positions, normals, uvs, triangles, smooth))
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn bounding_box(&self) -> Aabb {
        self.bbox
    }

    pub fn intersect(&self, ray: &Ray, its: &mut Intersection) -> bool {
        let t_max = its.t;
        self.bvh.intersect(ray, t_max, &mut |index| {
            if self.intersect_triangle(index, ray, its) {
                Some(its.t)
            } else {
                None
            }
        })
    }

    /// Möller-Trumbore ray-triangle intersection.
    fn intersect_triangle(&self, index: usize, ray: &Ray, its: &mut Intersection) -> bool {
        let [i0, i1, i2] = self.triangles[index].map(|i| i as usize);
        let (v0, v1, v2) = (self.positions[i0], self.positions[i1], self.positions[i2]);

        let edge1 = v1 - v0;
        let edge2 = v2 - v0;

        let h = ray.direction.cross(edge2);
        let det = edge1.dot(h);

        // Ray is parallel to triangle
        if det.abs() < PARALLEL_EPSILON {
            return false;
        }

        let inv_det = 1.0 / det;
        let s = ray.origin - v0;
        let u = inv_det * s.dot(h);
        if !(0.0..=1.0).contains(&u) {
            return false;
        }

        let q = s.cross(edge1);
        let v = inv_det * ray.direction.dot(q);
        if v < 0.0 || u + v > 1.0 {
            return false;
        }

        let t = inv_det * edge2.dot(q);
        if t < EPSILON || t > its.t {
            return false;
        }

        let w = 1.0 - u - v;
        let uv = if self.uvs.is_empty() {
            Vec2::new(u, v)
        } else {
            w * self.uvs[i0] + u * self.uvs[i1] + v * self.uvs[i2]
        };

        let normal = if self.smooth && !self.normals.is_empty() {
            (w * self.normals[i0] + u * self.normals[i1] + v * self.normals[i2]).normalize_or_zero()
        } else {
            edge1.cross(edge2).normalize_or_zero()
        };
        if normal == Vec3::ZERO {
            return false;
        }

        its.t = t;
        its.surface.position = ray.at(t);
        its.surface.uv = uv;
        its.surface.frame = Frame::from_normal(normal);
        its.surface.pdf = 0.0;
        true
    }
}

/// Area-weighted vertex normals for meshes that ship without them.
fn vertex_normals(positions: &[Vec3], triangles: &[[u32; 3]]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    for tri in triangles {
        let [i0, i1, i2] = tri.map(|i| i as usize);
        if i0.max(i1).max(i2) >= positions.len() {
            continue;
        }
        let face = (positions[i1] - positions[i0]).cross(positions[i2] - positions[i0]);
        for i in [i0, i1, i2] {
            normals[i] += face;
        }
    }
    normals.iter().map(|n| n.normalize_or_zero()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Two triangles forming the unit square [0, 1]^2 at z = 0.
    fn quad(smooth: bool) -> TriangleMesh {
        let positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        let normals = vec![
            Vec3::Z,
            Vec3::Z,
            Vec3::new(0.0, 0.6, 0.8),
            Vec3::new(0.0, 0.6, 0.8),
        ];
        TriangleMesh::new(positions, normals, Vec::new(), vec![[0, 1, 2], [0, 2, 3]], smooth)
    }

    #[test]
    fn test_triangle_hit() {
        let mesh = quad(false);
        let ray = Ray::new(Vec3::new(0.25, 0.75, 2.0), -Vec3::Z);
        let mut its = Intersection::new(ray.direction);

        assert!(mesh.intersect(&ray, &mut its));
        assert!((its.t - 2.0).abs() < 1e-5);
        assert_eq!(its.surface.frame.normal, Vec3::Z);
        assert!((its.surface.position - Vec3::new(0.25, 0.75, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_hit_without_uvs_writes_barycentrics() {
        let mesh = quad(false);
        let ray = Ray::new(Vec3::new(0.25, 0.75, 2.0), -Vec3::Z);
        let mut its = Intersection::new(ray.direction);
        its.surface.uv = Vec2::splat(5.0);

        assert!(mesh.intersect(&ray, &mut its));
        let uv = its.surface.uv;
        assert!(uv.x >= 0.0 && uv.y >= 0.0 && uv.x + uv.y <= 1.0, "uv {uv:?}");
    }

    #[test]
    fn test_triangle_miss_and_tightening() {
        let mesh = quad(false);

        let ray = Ray::new(Vec3::new(1.5, 0.5, 2.0), -Vec3::Z);
        let mut its = Intersection::new(ray.direction);
        assert!(!mesh.intersect(&ray, &mut its));

        let ray = Ray::new(Vec3::new(0.5, 0.5, 2.0), -Vec3::Z);
        let mut its = Intersection::with_max_distance(ray.direction, 1.0);
        assert!(!mesh.intersect(&ray, &mut its));
        assert_eq!(its.t, 1.0);
    }

    #[test]
    fn test_smooth_normals_interpolate() {
        let mesh = quad(true);
        // Top edge of the quad: both vertices carry the tilted normal
        let ray = Ray::new(Vec3::new(0.5, 0.99, 2.0), -Vec3::Z);
        let mut its = Intersection::new(ray.direction);

        assert!(mesh.intersect(&ray, &mut its));
        assert!(its.surface.frame.normal.y > 0.5, "normal {:?}", its.surface.frame.normal);
        assert!((its.surface.frame.normal.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_vertex_normals_for_flat_quad() {
        let positions = vec![Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y];
        let normals = vertex_normals(&positions, &[[0, 1, 2], [0, 2, 3]]);
        for n in normals {
            assert!((n - Vec3::Z).length() < 1e-6);
        }
    }

    #[test]
    fn test_load_obj() {
        let dir = std::env::temp_dir().join(format!("lumen_mesh_test_{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("quad.obj");
        let mut file = std::fs::File::create(&path).expect("create obj");
        writeln!(file, "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4").expect("write obj");
        drop(file);

        let mesh = TriangleMesh::load_obj(&path, true).expect("valid obj");
        assert_eq!(mesh.triangle_count(), 2);

        let ray = Ray::new(Vec3::new(0.5, 0.5, 1.0), -Vec3::Z);
        let mut its = Intersection::new(ray.direction);
        assert!(mesh.intersect(&ray, &mut its));
        assert!((its.surface.frame.normal - Vec3::Z).length() < 1e-5);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_missing_obj() {
        let result = TriangleMesh::load_obj("/nonexistent/mesh.obj", false);
        assert!(matches!(result, Err(SceneError::Mesh { .. })));
    }
}
