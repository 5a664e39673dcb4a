mod demo;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use lumen_core::{Halton, Independent, Sampler};
use lumen_math::Vec3;
use lumen_renderer::{look_at, render, Camera, FovAxis, ImageBuffer, Integrator, RenderConfig, Scene};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SamplerKind {
    Independent,
    Halton,
}

/// Render the built-in demo scene to a PNG.
#[derive(Parser, Debug)]
#[command(name = "lumen", version)]
struct Args {
    #[arg(long, default_value_t = 640)]
    width: u32,

    #[arg(long, default_value_t = 360)]
    height: u32,

    /// Samples per pixel (overrides the config file)
    #[arg(long)]
    spp: Option<u32>,

    /// Maximum path depth (overrides the config file)
    #[arg(long)]
    depth: Option<u32>,

    /// pathtracer, direct, albedo, normals, debug or debug:<mode>
    #[arg(long, default_value = "pathtracer")]
    integrator: String,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, value_enum, default_value_t = SamplerKind::Independent)]
    sampler: SamplerKind,

    /// JSON render settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Image to use instead of the checkerboard floor
    #[arg(long)]
    floor_texture: Option<PathBuf>,

    /// OBJ mesh to place in the scene
    #[arg(long)]
    mesh: Option<PathBuf>,

    /// Density grid for the smoke ball
    #[arg(long)]
    volume: Option<PathBuf>,

    #[arg(short, long, default_value = "lumen.png")]
    output: PathBuf,
}

impl Args {
    fn render_config(&self) -> Result<RenderConfig> {
        let mut config = match &self.config {
            Some(path) => RenderConfig::from_json_file(path)
                .with_context(|| format!("reading render config {}", path.display()))?,
            None => RenderConfig::default(),
        };
        if let Some(spp) = self.spp {
            config.samples_per_pixel = spp;
        }
        if let Some(depth) = self.depth {
            config.max_depth = depth;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        Ok(config)
    }
}

fn render_with<S: Sampler + Clone + Send + Sync>(
    camera: &Camera,
    scene: &Scene,
    integrator: &Integrator,
    config: &RenderConfig,
    sampler: S,
) -> ImageBuffer {
    render(camera, scene, integrator, config, &sampler)
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = Args::parse();
    log::info!("Starting Lumen");

    let config = args.render_config()?;
    let integrator = Integrator::from_name(&args.integrator)?.with_depth(config.max_depth);

    let assets = demo::DemoAssets {
        floor_texture: args.floor_texture.clone(),
        mesh: args.mesh.clone(),
        volume: args.volume.clone(),
    };
    let scene = demo::build(&assets).context("building demo scene")?;

    let transform = look_at(Vec3::new(0.0, -9.0, 3.5), Vec3::new(0.0, 0.0, 0.8), Vec3::Z)?;
    let camera = Camera::new(args.width, args.height, 45.0, FovAxis::X, transform);

    let image = match args.sampler {
        SamplerKind::Independent => render_with(&camera, &scene, &integrator, &config, Independent::new(config.seed)),
        SamplerKind::Halton => render_with(&camera, &scene, &integrator, &config, Halton::new(config.seed)),
    };

    image
        .save_png(&args.output)
        .with_context(|| format!("saving {}", args.output.display()))?;
    Ok(())
}
