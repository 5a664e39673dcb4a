//! Lumen renderer - CPU Monte Carlo light transport.
//!
//! Instances pair a shape with its materials, emitters and participating
//! media. A `Scene` gathers them with lights and a background, an
//! `Integrator` estimates the radiance along camera rays, and the bucket
//! renderer spreads the pixels over rayon threads.

mod bsdf;
mod bucket;
mod bvh;
mod camera;
mod emission;
mod error;
mod instance;
mod integrator;
mod intersection;
mod light;
mod mesh;
mod microfacet;
mod principled;
mod renderer;
mod scene;
mod sdf;
mod shape;
mod volume;

pub use bsdf::{henyey_greenstein, Bsdf, BsdfEval, BsdfSample, Conductor, Diffuse, PrincipledVolume, RoughConductor};
pub use bucket::{generate_buckets, render_bucket, Bucket, BucketResult, DEFAULT_BUCKET_SIZE};
pub use bvh::BvhNode;
pub use camera::{look_at, Camera, FovAxis};
pub use emission::{Emission, Lambertian};
pub use error::{SceneError, SceneResult};
pub use instance::Instance;
pub use integrator::{next_event_estimation, DebugMode, Integrator, DEFAULT_DEPTH};
pub use intersection::{AreaSample, Intersection, SurfaceEvent, EPSILON};
pub use light::{AreaLight, DirectLightSample, DirectionalLight, Light, PointLight, SpotLight};
pub use mesh::TriangleMesh;
pub use principled::Principled;
pub use renderer::{color_to_rgba, linear_to_gamma, normalized_position, render, render_pixel, ImageBuffer, RenderConfig};
pub use scene::{Background, Scene};
pub use sdf::{Sdf, SdfKind};
pub use shape::{Rectangle, Shape, Sphere};
pub use volume::{Grid, GridFilter, Volume};

/// Re-export common math types from lumen_math
pub use lumen_math::{Aabb, Color, Ray, Transform, Vec2, Vec3};
