//! Built-in demo scene.
//!
//! A checkered floor under a row of spheres, one per scattering model, a
//! rounded SDF box, a smoke ball and every light type.

use anyhow::{Context, Result};
use lumen_core::{Checkerboard, Image, ImageTexture, Texture};
use lumen_math::{Aabb, Color, Quat, Transform, Vec2, Vec3};
use lumen_renderer::{
    AreaLight, Background, Bsdf, Conductor, Diffuse, DirectionalLight, Emission, Grid, GridFilter, Instance, Light,
    PointLight, Principled, PrincipledVolume, RoughConductor, Scene, Sdf, SdfKind, Shape, SpotLight, TriangleMesh,
    Volume,
};
use std::f32::consts::{FRAC_PI_2, PI};
use std::path::PathBuf;
use std::sync::Arc;

/// Optional assets that replace parts of the demo.
#[derive(Debug, Default)]
pub struct DemoAssets {
    pub floor_texture: Option<PathBuf>,
    pub mesh: Option<PathBuf>,
    pub volume: Option<PathBuf>,
}

fn scaled(scale: f32, rotation: Quat, translation: Vec3) -> Result<Transform> {
    Transform::from_scale_rotation_translation(Vec3::splat(scale), rotation, translation)
        .context("demo transform is singular")
}

fn floor_texture(assets: &DemoAssets) -> Result<Texture> {
    let Some(path) = &assets.floor_texture else {
        return Ok(Texture::Checkerboard(Checkerboard {
            scale: Vec2::splat(10.0),
            color0: Color::splat(0.8),
            color1: Color::splat(0.2),
        }));
    };

    let image = Image::load(path, false).with_context(|| format!("loading floor texture {}", path.display()))?;
    Ok(Texture::Image(ImageTexture::new(Arc::new(image)).with_scale(Vec2::splat(4.0))))
}

/// Scale a mesh to fit `size` and stand it on the floor at `position`.
///
/// OBJ files are y-up, the scene is z-up.
fn place_mesh(mesh: &TriangleMesh, size: f32, position: Vec3) -> Result<Transform> {
    let bounds: Aabb = mesh.bounding_box();
    let extent = (bounds.max() - bounds.min()).max_element().max(1e-6);
    let upright = scaled(size / extent, Quat::from_rotation_x(FRAC_PI_2), Vec3::ZERO)?;

    let placed = upright.apply_aabb(&bounds);
    let center = placed.centroid();
    let offset = Vec3::new(position.x - center.x, position.y - center.y, position.z - placed.min().z);
    Ok(Transform::from_translation(offset).compose(&upright))
}

pub fn build(assets: &DemoAssets) -> Result<Scene> {
    let mut instances: Vec<Arc<Instance>> = Vec::new();

    // Floor, 20 x 20 units in the z = 0 plane
    instances.push(Arc::new(
        Instance::new(Shape::rectangle())
            .with_transform(scaled(10.0, Quat::IDENTITY, Vec3::ZERO)?)
            .with_bsdf(Bsdf::Diffuse(Diffuse::new(floor_texture(assets)?))),
    ));

    let materials = [
        Bsdf::Diffuse(Diffuse::new(Color::new(0.8, 0.3, 0.3))),
        Bsdf::Conductor(Conductor::new(Color::new(0.9, 0.9, 0.9))),
        Bsdf::RoughConductor(RoughConductor::new(Color::new(0.95, 0.64, 0.54), Texture::constant(0.3))),
        Bsdf::Principled(Principled::plastic(Color::new(0.2, 0.4, 0.8), 0.2)),
        Bsdf::Principled(Principled::metal(Color::new(0.9, 0.8, 0.3), 0.5)),
    ];
    for (i, bsdf) in materials.into_iter().enumerate() {
        let x = (i as f32 - 2.0) * 1.5;
        instances.push(Arc::new(
            Instance::new(Shape::sphere())
                .with_transform(scaled(0.6, Quat::IDENTITY, Vec3::new(x, 0.0, 0.6))?)
                .with_bsdf(bsdf),
        ));
    }

    instances.push(Arc::new(
        Instance::new(Shape::from(Sdf::new(SdfKind::Box, 0.15)))
            .with_transform(scaled(0.5, Quat::from_rotation_z(PI / 6.0), Vec3::new(-2.0, 2.0, 0.5))?)
            .with_bsdf(Bsdf::Principled(Principled::new().with_base_color(Color::new(0.3, 0.7, 0.3)))),
    ));

    let volume = match &assets.volume {
        Some(path) => Volume::Grid(Grid::load(path, 1.0, GridFilter::Trilinear)?),
        None => Volume::Fade(8.0),
    };
    instances.push(Arc::new(
        Instance::new(Shape::sphere())
            .with_transform(scaled(0.9, Quat::IDENTITY, Vec3::new(2.0, 2.0, 0.9))?)
            .with_volume(volume)
            .with_bsdf(Bsdf::Volume(PrincipledVolume::new(Color::splat(0.9), 1.0, 0.2))),
    ));

    if let Some(path) = &assets.mesh {
        let mesh = TriangleMesh::load_obj(path, true)?;
        let transform = place_mesh(&mesh, 1.5, Vec3::new(0.0, 2.5, 0.0))?;
        instances.push(Arc::new(
            Instance::new(Shape::Mesh(mesh))
                .with_transform(transform)
                .with_bsdf(Bsdf::Diffuse(Diffuse::new(Color::splat(0.7)))),
        ));
    }

    // Overhead panel, facing down; hidden from camera rays so it is only
    // reached through light sampling
    let panel = Arc::new(
        Instance::new(Shape::rectangle())
            .with_transform(scaled(1.0, Quat::from_rotation_x(PI), Vec3::new(0.0, 0.0, 5.0))?)
            .with_emission(Emission::lambertian(Color::splat(6.0)))
            .with_visibility(false),
    );

    let lights: Vec<Light> = vec![
        AreaLight::new(panel.clone())?.into(),
        PointLight::new(Vec3::new(-4.0, -3.0, 4.0), Color::splat(150.0)).into(),
        DirectionalLight::new(Vec3::new(1.0, -1.0, 2.0), Color::new(1.0, 0.95, 0.85)).into(),
        SpotLight::new(Vec3::new(3.0, -3.0, 5.0), Vec3::new(-0.5, 0.5, -1.0), Color::splat(4.0), 30.0, 10.0).into(),
    ];
    instances.push(panel);

    Ok(Scene::new(instances, lights, Background::Sky))
}
