//! Render driver.
//!
//! Turns pixels into camera rays, averages integrator estimates over the
//! samples of each pixel and assembles buckets rendered in parallel into an
//! image.

use crate::bucket::{generate_buckets, render_bucket, BucketResult, DEFAULT_BUCKET_SIZE};
use crate::camera::Camera;
use crate::error::{SceneError, SceneResult};
use crate::integrator::Integrator;
use crate::scene::Scene;
use lumen_core::Sampler;
use lumen_math::{Color, UVec2, Vec2};
use rayon::prelude::*;
use serde::Deserialize;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

/// Render configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Samples per pixel
    pub samples_per_pixel: u32,
    /// Maximum path depth handed to the path tracer
    pub max_depth: u32,
    /// Base seed mixed into every pixel's sampler
    pub seed: u64,
    /// Bucket edge length in pixels
    pub bucket_size: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            samples_per_pixel: 64,
            max_depth: 5,
            seed: 0,
            bucket_size: DEFAULT_BUCKET_SIZE,
        }
    }
}

impl RenderConfig {
    /// Parse a JSON object; missing fields keep their defaults.
    pub fn from_json(json: &str) -> SceneResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> SceneResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

/// Apply gamma correction (gamma = 2.0).
#[inline]
pub fn linear_to_gamma(linear: f32) -> f32 {
    if linear > 0.0 {
        linear.sqrt()
    } else {
        0.0
    }
}

/// Clamp a value to [0, 1] range.
#[inline]
pub fn clamp_01(x: f32) -> f32 {
    x.clamp(0.0, 1.0)
}

/// Convert a color to 8-bit RGBA.
pub fn color_to_rgba(color: Color) -> [u8; 4] {
    let r = (255.0 * clamp_01(linear_to_gamma(color.x))) as u8;
    let g = (255.0 * clamp_01(linear_to_gamma(color.y))) as u8;
    let b = (255.0 * clamp_01(linear_to_gamma(color.z))) as u8;
    [r, g, b, 255]
}

/// Position of a point inside pixel `(x, y)` in `[-1, 1]^2`, +y up.
pub fn normalized_position(x: u32, y: u32, jitter: Vec2, resolution: UVec2) -> Vec2 {
    Vec2::new(
        2.0 * (x as f32 + jitter.x) / resolution.x as f32 - 1.0,
        1.0 - 2.0 * (y as f32 + jitter.y) / resolution.y as f32,
    )
}

/// Average radiance over the samples of pixel `(x, y)`.
///
/// The sampler is reseeded for every sample, so the result does not depend
/// on which thread renders the pixel or in which order.
pub fn render_pixel(
    camera: &Camera,
    scene: &Scene,
    integrator: &Integrator,
    x: u32,
    y: u32,
    config: &RenderConfig,
    sampler: &mut dyn Sampler,
) -> Color {
    let samples = config.samples_per_pixel.max(1);
    let mut pixel_color = Color::ZERO;

    for sample in 0..samples {
        sampler.seed(UVec2::new(x, y), sample);
        let jitter = sampler.next_2d();
        let ray = camera.sample(normalized_position(x, y, jitter, camera.resolution()), sampler);
        pixel_color += integrator.li(scene, &ray, sampler);
    }

    pixel_color / samples as f32
}

/// Linear radiance per pixel, first row at the top.
#[derive(Debug, Clone)]
pub struct ImageBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Color>,
}

impl ImageBuffer {
    /// Create a new image buffer filled with black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::ZERO; (width * height) as usize],
        }
    }

    pub fn get(&self, x: u32, y: u32) -> Color {
        self.pixels[(y * self.width + x) as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        self.pixels[(y * self.width + x) as usize] = color;
    }

    /// Copy a rendered bucket into place.
    pub fn write_bucket(&mut self, result: &BucketResult) {
        let bucket = &result.bucket;
        for (i, color) in result.pixels.iter().enumerate() {
            let local_x = i as u32 % bucket.width;
            let local_y = i as u32 / bucket.width;
            self.set(bucket.x + local_x, bucket.y + local_y, *color);
        }
    }

    /// Gamma corrected RGBA bytes.
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity((self.width * self.height * 4) as usize);
        for color in &self.pixels {
            bytes.extend_from_slice(&color_to_rgba(*color));
        }
        bytes
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> SceneResult<()> {
        let path = path.as_ref();
        image::save_buffer_with_format(
            path,
            &self.to_rgba(),
            self.width,
            self.height,
            image::ColorType::Rgba8,
            image::ImageFormat::Png,
        )
        .map_err(|source| SceneError::Image {
            path: path.display().to_string(),
            source,
        })?;
        log::info!("Wrote {}", path.display());
        Ok(())
    }
}

/// Render the whole image, one rayon task per bucket.
///
/// Every task works on its own clone of `sampler`.
pub fn render<S>(
    camera: &Camera,
    scene: &Scene,
    integrator: &Integrator,
    config: &RenderConfig,
    sampler: &S,
) -> ImageBuffer
where
    S: Sampler + Clone + Send + Sync,
{
    let start = Instant::now();
    let buckets = generate_buckets(camera.width(), camera.height(), config.bucket_size.max(1));
    let total = buckets.len();
    let finished = AtomicUsize::new(0);

    log::info!(
        "Rendering {}x{} at {} spp in {} buckets",
        camera.width(),
        camera.height(),
        config.samples_per_pixel,
        total
    );

    let results: Vec<BucketResult> = buckets
        .par_iter()
        .map(|bucket| {
            let mut sampler = sampler.clone();
            let pixels = render_bucket(bucket, camera, scene, integrator, config, &mut sampler);
            let done = finished.fetch_add(1, Ordering::Relaxed) + 1;
            log::debug!("Bucket {} finished ({}/{})", bucket.index, done, total);
            BucketResult::new(*bucket, pixels)
        })
        .collect();

    let mut image = ImageBuffer::new(camera.width(), camera.height());
    for result in &results {
        image.write_bucket(result);
    }

    log::info!("Render finished in {:.2?}", start.elapsed());
    image
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::FovAxis;
    use crate::emission::Emission;
    use crate::instance::Instance;
    use crate::scene::Background;
    use crate::shape::Shape;
    use lumen_core::Independent;
    use lumen_math::{Transform, Vec3};
    use std::sync::Arc;

    fn emitter_scene() -> Scene {
        // Unit sphere emitting 0.5, five units in front of the camera
        let sphere = Instance::new(Shape::sphere())
            .with_transform(Transform::from_translation(Vec3::new(0.0, 0.0, 5.0)))
            .with_emission(Emission::lambertian(Color::splat(0.5)));
        Scene::new(vec![Arc::new(sphere)], Vec::new(), Background::Constant(Color::new(0.0, 0.0, 1.0)))
    }

    fn small_camera() -> Camera {
        Camera::new(16, 12, 60.0, FovAxis::X, Transform::IDENTITY)
    }

    #[test]
    fn test_linear_to_gamma() {
        assert_eq!(linear_to_gamma(0.0), 0.0);
        assert!((linear_to_gamma(1.0) - 1.0).abs() < 0.0001);
        assert!((linear_to_gamma(0.25) - 0.5).abs() < 0.0001);
        assert_eq!(linear_to_gamma(-1.0), 0.0);
    }

    #[test]
    fn test_color_to_rgba() {
        assert_eq!(color_to_rgba(Color::ZERO), [0, 0, 0, 255]);
        assert_eq!(color_to_rgba(Color::new(1.0, 4.0, 0.25)), [255, 255, 127, 255]);
    }

    #[test]
    fn test_normalized_position_corners() {
        let resolution = UVec2::new(4, 2);
        assert_eq!(normalized_position(0, 0, Vec2::ZERO, resolution), Vec2::new(-1.0, 1.0));
        assert_eq!(normalized_position(3, 1, Vec2::ONE, resolution), Vec2::new(1.0, -1.0));
        assert_eq!(normalized_position(2, 1, Vec2::ZERO, resolution), Vec2::ZERO);
    }

    #[test]
    fn test_config_from_json() {
        let config = RenderConfig::from_json(r#"{ "samples_per_pixel": 8, "seed": 7 }"#).expect("valid config");
        assert_eq!(config.samples_per_pixel, 8);
        assert_eq!(config.seed, 7);
        assert_eq!(config.bucket_size, DEFAULT_BUCKET_SIZE);

        assert!(matches!(RenderConfig::from_json("{ \"seed\": -1 }"), Err(SceneError::Config(_))));
        assert!(matches!(
            RenderConfig::from_json_file("/nonexistent/render.json"),
            Err(SceneError::Io(_))
        ));
    }

    #[test]
    fn test_render_pixel_hits_emitter() {
        let scene = emitter_scene();
        let camera = small_camera();
        let config = RenderConfig {
            samples_per_pixel: 4,
            ..Default::default()
        };
        let integrator = Integrator::default();
        let mut sampler = Independent::new(1);

        let center = render_pixel(&camera, &scene, &integrator, 8, 6, &config, &mut sampler);
        assert!((center - Color::splat(0.5)).length() < 1e-5, "center = {center}");

        let corner = render_pixel(&camera, &scene, &integrator, 0, 0, &config, &mut sampler);
        assert_eq!(corner, Color::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_render_is_deterministic() {
        let scene = emitter_scene();
        let camera = small_camera();
        let config = RenderConfig {
            samples_per_pixel: 2,
            bucket_size: 5,
            ..Default::default()
        };
        let integrator = Integrator::default();
        let sampler = Independent::new(3);

        let a = render(&camera, &scene, &integrator, &config, &sampler);
        let b = render(&camera, &scene, &integrator, &config, &sampler);
        assert_eq!(a.pixels, b.pixels);
        assert_eq!(a.pixels.len(), 16 * 12);

        // Every pixel matches the single-pixel path
        let mut single = sampler.clone();
        for (x, y) in [(0, 0), (8, 6), (15, 11), (4, 9)] {
            let expected = render_pixel(&camera, &scene, &integrator, x, y, &config, &mut single);
            assert_eq!(a.get(x, y), expected, "pixel ({x}, {y})");
        }
    }

    #[test]
    fn test_save_png() {
        let mut image = ImageBuffer::new(3, 2);
        image.set(1, 1, Color::ONE);
        let path = std::env::temp_dir().join(format!("lumen_render_test_{}.png", std::process::id()));

        image.save_png(&path).expect("png written");
        let decoded = image::open(&path).expect("png readable").to_rgba8();
        assert_eq!(decoded.dimensions(), (3, 2));
        assert_eq!(decoded.get_pixel(1, 1).0, [255, 255, 255, 255]);
        assert_eq!(decoded.get_pixel(0, 0).0, [0, 0, 0, 255]);
        let _ = std::fs::remove_file(&path);
    }
}
