//! Errors raised while building a scene.
//!
//! Everything here is a configuration problem detected at construction time.
//! Numerical degeneracies during rendering never surface as errors.

use lumen_core::TextureError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SceneError {
    #[error("Invalid SDF shape: {0}")]
    UnknownSdfShape(String),

    #[error("Invalid field of view axis: {0} (expected x, y or z)")]
    InvalidFovAxis(String),

    #[error("Unknown integrator: {0}")]
    UnknownIntegrator(String),

    #[error("Unknown debug mode: {0}")]
    UnknownDebugMode(String),

    #[error("Transform is singular and cannot be inverted")]
    SingularTransform,

    #[error("Area sampling is not supported for {0} shapes")]
    AreaSamplingUnsupported(&'static str),

    #[error("Area light instance has no emission")]
    MissingEmission,

    #[error("Failed to load volume {path}: {source}")]
    Volume {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load mesh {path}: {source}")]
    Mesh {
        path: String,
        #[source]
        source: tobj::LoadError,
    },

    #[error("Failed to write image {path}: {source}")]
    Image {
        path: String,
        #[source]
        source: image::ImageError,
    },

    #[error("Texture error: {0}")]
    Texture(#[from] TextureError),

    #[error("Invalid render configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SceneResult<T> = Result<T, SceneError>;
