//! Textures evaluated at surface uv coordinates.
//!
//! Images are loaded from disk once, converted to linear float RGB and shared
//! between every texture that samples them.

use std::path::Path;
use std::sync::Arc;

use lumen_math::{Color, Vec2};
use thiserror::Error;

/// Errors that can occur during texture loading.
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image decoding error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Invalid image dimensions {width}x{height} for {pixels} pixels")]
    InvalidDimensions { width: u32, height: u32, pixels: usize },
}

pub type TextureResult<T> = Result<T, TextureError>;

/// A loaded image with linear RGB pixel data.
#[derive(Clone, Debug)]
pub struct Image {
    width: u32,
    height: u32,

    /// Row-major, first row at the top of the image
    pixels: Vec<Color>,

    /// Original file path (for debugging)
    path: String,
}

impl Image {
    /// Create an image from linear pixel data.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<Color>) -> TextureResult<Self> {
        if width == 0 || height == 0 || pixels.len() != (width as usize) * (height as usize) {
            return Err(TextureError::InvalidDimensions {
                width,
                height,
                pixels: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
            path: "<memory>".to_string(),
        })
    }

    /// Load an image file.
    ///
    /// Color images are stored in sRGB and decoded to linear; data images
    /// such as normal maps should pass `linear = true`.
    pub fn load(path: impl AsRef<Path>, linear: bool) -> TextureResult<Self> {
        let path = path.as_ref();
        let img = image::open(path).map_err(|e| match e {
            image::ImageError::IoError(source) => TextureError::Io(source),
            other => TextureError::ImageError(other),
        })?;

        let rgb = img.to_rgb8();
        let (width, height) = rgb.dimensions();

        let decode = |value: u8| {
            if linear {
                value as f32 / 255.0
            } else {
                srgb_to_linear(value)
            }
        };
        let pixels: Vec<Color> = rgb
            .pixels()
            .map(|p| Color::new(decode(p[0]), decode(p[1]), decode(p[2])))
            .collect();

        log::debug!(
            "Loaded texture: {} ({}x{}, {:.1} KB)",
            path.display(),
            width,
            height,
            (pixels.len() * std::mem::size_of::<Color>()) as f32 / 1024.0
        );

        Ok(Self {
            width,
            height,
            pixels,
            path: path.to_string_lossy().to_string(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Pixel at integer coordinates; out of range reads black.
    pub fn get(&self, x: i32, y: i32) -> Color {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return Color::ZERO;
        }
        let idx = y as usize * self.width as usize + x as usize;
        self.pixels.get(idx).copied().unwrap_or(Color::ZERO)
    }
}

/// How lookups outside the image are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BorderMode {
    Clamp,
    #[default]
    Repeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    Nearest,
    #[default]
    Bilinear,
}

/// An image sampled with a border mode, a filter, an exposure multiplier and
/// a uv scale.
#[derive(Clone, Debug)]
pub struct ImageTexture {
    pub image: Arc<Image>,
    pub exposure: f32,
    pub scale: Vec2,
    pub border: BorderMode,
    pub filter: FilterMode,
}

impl ImageTexture {
    pub fn new(image: Arc<Image>) -> Self {
        Self {
            image,
            exposure: 1.0,
            scale: Vec2::ONE,
            border: BorderMode::default(),
            filter: FilterMode::default(),
        }
    }

    pub fn with_border(mut self, border: BorderMode) -> Self {
        self.border = border;
        self
    }

    pub fn with_filter(mut self, filter: FilterMode) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_exposure(mut self, exposure: f32) -> Self {
        self.exposure = exposure;
        self
    }

    pub fn with_scale(mut self, scale: Vec2) -> Self {
        self.scale = scale;
        self
    }

    pub fn evaluate(&self, uv: Vec2) -> Color {
        // v runs bottom to top, image rows top to bottom
        let st = Vec2::new(uv.x * self.scale.x, 1.0 - uv.y * self.scale.y);
        let resolution = Vec2::new(self.image.width() as f32, self.image.height() as f32);

        match self.filter {
            FilterMode::Nearest => {
                let dc = st * resolution;
                self.exposure * self.texel(dc.x.floor() as i32, dc.y.floor() as i32)
            }
            FilterMode::Bilinear => {
                let dc = st * resolution - Vec2::splat(0.5);
                let x = dc.x.floor() as i32;
                let y = dc.y.floor() as i32;
                let fx = dc.x - dc.x.floor();
                let fy = dc.y - dc.y.floor();

                let top = self.texel(x, y) * (1.0 - fx) + self.texel(x + 1, y) * fx;
                let bottom = self.texel(x, y + 1) * (1.0 - fx) + self.texel(x + 1, y + 1) * fx;
                self.exposure * (top * (1.0 - fy) + bottom * fy)
            }
        }
    }

    fn texel(&self, x: i32, y: i32) -> Color {
        let w = self.image.width() as i32;
        let h = self.image.height() as i32;
        match self.border {
            BorderMode::Repeat => self.image.get(x.rem_euclid(w), y.rem_euclid(h)),
            BorderMode::Clamp => self.image.get(x.clamp(0, w - 1), y.clamp(0, h - 1)),
        }
    }
}

/// Alternating squares of two colors.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Checkerboard {
    pub scale: Vec2,
    pub color0: Color,
    pub color1: Color,
}

impl Checkerboard {
    pub fn evaluate(&self, uv: Vec2) -> Color {
        let x = (self.scale.x * uv.x).floor() as i64;
        let y = (self.scale.y * uv.y).floor() as i64;
        if (x + y).rem_euclid(2) == 1 {
            self.color1
        } else {
            self.color0
        }
    }
}

impl Default for Checkerboard {
    fn default() -> Self {
        Self {
            scale: Vec2::ONE,
            color0: Color::ZERO,
            color1: Color::ONE,
        }
    }
}

/// Any texture that can be bound to a material parameter.
#[derive(Clone, Debug)]
pub enum Texture {
    Constant(Color),
    Checkerboard(Checkerboard),
    Image(ImageTexture),
}

impl Texture {
    /// A uniform gray texture.
    pub fn constant(value: f32) -> Self {
        Texture::Constant(Color::splat(value))
    }

    pub fn evaluate(&self, uv: Vec2) -> Color {
        match self {
            Texture::Constant(color) => *color,
            Texture::Checkerboard(checker) => checker.evaluate(uv),
            Texture::Image(image) => image.evaluate(uv),
        }
    }

    /// Single-channel lookup for roughness, metallic and mask maps.
    pub fn scalar(&self, uv: Vec2) -> f32 {
        self.evaluate(uv).x
    }
}

impl From<Color> for Texture {
    fn from(color: Color) -> Self {
        Texture::Constant(color)
    }
}

/// Convert sRGB byte value to linear float.
fn srgb_to_linear(value: u8) -> f32 {
    let v = value as f32 / 255.0;
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_image() -> Arc<Image> {
        // 2x2: top row red, green; bottom row blue, white
        let pixels = vec![
            Color::new(1.0, 0.0, 0.0),
            Color::new(0.0, 1.0, 0.0),
            Color::new(0.0, 0.0, 1.0),
            Color::ONE,
        ];
        Arc::new(Image::from_pixels(2, 2, pixels).expect("valid image"))
    }

    #[test]
    fn test_constant_texture() {
        let tex = Texture::Constant(Color::new(1.0, 0.5, 0.0));
        let sample = tex.evaluate(Vec2::new(0.3, 0.7));
        assert!((sample - Color::new(1.0, 0.5, 0.0)).length() < 1e-6);
        assert_eq!(tex.scalar(Vec2::ZERO), 1.0);
    }

    #[test]
    fn test_invalid_dimensions() {
        assert!(Image::from_pixels(2, 2, vec![Color::ZERO; 3]).is_err());
        assert!(Image::from_pixels(0, 0, Vec::new()).is_err());
    }

    #[test]
    fn test_load_errors_keep_their_kind() {
        let missing = Image::load("/nonexistent/lumen_floor.png", false);
        assert!(matches!(missing, Err(TextureError::Io(_))));

        let path = std::env::temp_dir().join(format!("lumen_corrupt_{}.png", std::process::id()));
        std::fs::write(&path, b"not a png").expect("write temp file");
        let corrupt = Image::load(&path, false);
        std::fs::remove_file(&path).ok();
        assert!(matches!(corrupt, Err(TextureError::ImageError(_))));
    }

    #[test]
    fn test_nearest_flips_v() {
        let tex = ImageTexture::new(gradient_image()).with_filter(FilterMode::Nearest);

        // v near 1 is the top row of the image
        let top_left = tex.evaluate(Vec2::new(0.25, 0.75));
        assert_eq!(top_left, Color::new(1.0, 0.0, 0.0));

        let bottom_right = tex.evaluate(Vec2::new(0.75, 0.25));
        assert_eq!(bottom_right, Color::ONE);
    }

    #[test]
    fn test_bilinear_center_is_average() {
        let tex = ImageTexture::new(gradient_image()).with_filter(FilterMode::Bilinear);
        let center = tex.evaluate(Vec2::new(0.5, 0.5));
        let expected = Color::new(2.0, 2.0, 2.0) / 4.0;
        assert!((center - expected).length() < 1e-5, "center {center:?}");
    }

    #[test]
    fn test_border_modes() {
        let repeat = ImageTexture::new(gradient_image()).with_filter(FilterMode::Nearest);
        let clamp = repeat.clone().with_border(BorderMode::Clamp);

        // u = 1.25 wraps to column 0 when repeating, clamps to column 1 otherwise
        let uv = Vec2::new(1.25, 0.75);
        assert_eq!(repeat.evaluate(uv), Color::new(1.0, 0.0, 0.0));
        assert_eq!(clamp.evaluate(uv), Color::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_exposure_scales() {
        let tex = ImageTexture::new(gradient_image())
            .with_filter(FilterMode::Nearest)
            .with_exposure(2.0);
        assert_eq!(tex.evaluate(Vec2::new(0.75, 0.25)), Color::splat(2.0));
    }

    #[test]
    fn test_checkerboard() {
        let checker = Checkerboard {
            scale: Vec2::splat(2.0),
            color0: Color::ZERO,
            color1: Color::ONE,
        };
        assert_eq!(checker.evaluate(Vec2::new(0.25, 0.25)), Color::ZERO);
        assert_eq!(checker.evaluate(Vec2::new(0.75, 0.25)), Color::ONE);
        assert_eq!(checker.evaluate(Vec2::new(0.75, 0.75)), Color::ZERO);

        // Negative coordinates keep alternating
        assert_eq!(checker.evaluate(Vec2::new(-0.25, 0.25)), Color::ONE);
    }

    #[test]
    fn test_srgb_to_linear() {
        // Black stays black
        assert!((srgb_to_linear(0) - 0.0).abs() < 0.001);

        // White stays white
        assert!((srgb_to_linear(255) - 1.0).abs() < 0.001);

        // Mid-gray is darker in linear
        let mid = srgb_to_linear(128);
        assert!(mid < 0.5);
        assert!(mid > 0.1);
    }
}
