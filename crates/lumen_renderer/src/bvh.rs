//! Bounding Volume Hierarchy (BVH) acceleration structure.
//!
//! A binary tree over primitive indices. The tree only knows bounding boxes;
//! the caller tests the primitives themselves through a closure, so the same
//! structure serves both scene instances and mesh triangles.

use lumen_math::{Aabb, Interval, Ray, Vec3};

/// Maximum primitives per leaf node before splitting.
const LEAF_MAX_SIZE: usize = 4;

/// BVH node - either a branch with two children or a leaf with primitives.
#[derive(Debug, Clone)]
pub enum BvhNode {
    /// Internal node with two children.
    Branch {
        left: Box<BvhNode>,
        right: Box<BvhNode>,
        bbox: Aabb,
    },
    /// Leaf node with a small number of primitive indices.
    Leaf { primitives: Vec<usize>, bbox: Aabb },
    /// Empty node (for edge cases).
    Empty,
}

/// Per-primitive data needed during construction.
struct BuildPrimitive {
    index: usize,
    bbox: Aabb,
    centroid: Vec3,
}

impl BvhNode {
    /// Create a BVH from the bounding boxes and centroids of primitives
    /// `0..bboxes.len()`.
    pub fn new(bboxes: &[Aabb], centroids: &[Vec3]) -> Self {
        debug_assert_eq!(bboxes.len(), centroids.len());
        let primitives: Vec<BuildPrimitive> = bboxes
            .iter()
            .zip(centroids)
            .enumerate()
            .map(|(index, (bbox, centroid))| BuildPrimitive {
                index,
                bbox: *bbox,
                centroid: *centroid,
            })
            .collect();

        if primitives.is_empty() {
            return BvhNode::Empty;
        }
        Self::build(primitives)
    }

    /// Recursive BVH construction.
    ///
    /// Simple median-split approach: sort primitives by centroid on the
    /// longest axis of the centroid bounds, split in half, recurse.
    fn build(mut primitives: Vec<BuildPrimitive>) -> Self {
        let n = primitives.len();

        let bounds = primitives
            .iter()
            .fold(Aabb::EMPTY, |acc, p| Aabb::surrounding(&acc, &p.bbox));

        // Create leaf for small sets
        if n <= LEAF_MAX_SIZE {
            return BvhNode::Leaf {
                primitives: primitives.into_iter().map(|p| p.index).collect(),
                bbox: bounds,
            };
        }

        let centroid_bounds = primitives.iter().fold(Aabb::EMPTY, |mut acc, p| {
            acc.extend(p.centroid);
            acc
        });
        let axis = centroid_bounds.longest_axis();

        primitives.sort_unstable_by(|a, b| {
            a.centroid[axis]
                .partial_cmp(&b.centroid[axis])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        // Split at midpoint
        let right_primitives = primitives.split_off(n / 2);
        let left = Self::build(primitives);
        let right = Self::build(right_primitives);

        BvhNode::Branch {
            left: Box::new(left),
            right: Box::new(right),
            bbox: bounds,
        }
    }

    /// Find the closest primitive hit along `ray` before `t_max`.
    ///
    /// `test` intersects one primitive and returns its hit distance when it
    /// reports a hit closer than everything seen so far. It is expected to
    /// keep the closest hit itself (for example by tightening an intersection
    /// record); the tree only uses the returned distance to cull boxes.
    pub fn intersect<F>(&self, ray: &Ray, t_max: f32, test: &mut F) -> bool
    where
        F: FnMut(usize) -> Option<f32>,
    {
        let mut closest = t_max;
        self.intersect_node(ray, &mut closest, test)
    }

    fn intersect_node<F>(&self, ray: &Ray, closest: &mut f32, test: &mut F) -> bool
    where
        F: FnMut(usize) -> Option<f32>,
    {
        match self {
            BvhNode::Empty => false,

            BvhNode::Leaf { primitives, bbox } => {
                if !bbox.hit(ray, Interval::new(0.0, *closest)) {
                    return false;
                }

                let mut hit_anything = false;
                for &index in primitives {
                    if let Some(t) = test(index) {
                        hit_anything = true;
                        *closest = closest.min(t);
                    }
                }
                hit_anything
            }

            BvhNode::Branch { left, right, bbox } => {
                if !bbox.hit(ray, Interval::new(0.0, *closest)) {
                    return false;
                }

                let hit_left = left.intersect_node(ray, closest, test);
                // Right side is culled against the tightened distance
                let hit_right = right.intersect_node(ray, closest, test);
                hit_left || hit_right
            }
        }
    }

    pub fn bounding_box(&self) -> Aabb {
        match self {
            BvhNode::Empty => Aabb::EMPTY,
            BvhNode::Leaf { bbox, .. } => *bbox,
            BvhNode::Branch { bbox, .. } => *bbox,
        }
    }
}
