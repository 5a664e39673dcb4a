//! Lumen Core - textures and samplers shared by the renderer.
//!
//! This crate provides:
//!
//! - **Textures**: constant, checkerboard and image textures evaluated at uv
//!   coordinates (`Texture`, `ImageTexture`, `Image`)
//! - **Samplers**: the `Sampler` trait with independent and Halton sequences
//!
//! # Example
//!
//! ```ignore
//! use lumen_core::{Image, ImageTexture, Texture};
//!
//! let image = Image::load("floor.png", false)?;
//! let texture = Texture::Image(ImageTexture::new(Arc::new(image)));
//! ```

pub mod sampler;
pub mod texture;

// Re-export commonly used types
pub use sampler::{Halton, Independent, Sampler};
pub use texture::{BorderMode, Checkerboard, FilterMode, Image, ImageTexture, Texture, TextureError};
