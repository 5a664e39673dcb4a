//! Light emitted by surfaces.

use lumen_core::Texture;
use lumen_math::{Color, Vec2, Vec3};

/// Lambertian emitter: constant radiance over the front hemisphere.
#[derive(Debug, Clone)]
pub struct Lambertian {
    pub emission: Texture,
}

impl Lambertian {
    pub fn new(emission: impl Into<Texture>) -> Self {
        Self {
            emission: emission.into(),
        }
    }

    /// Radiance towards the local direction `wo`; the back side is dark.
    pub fn evaluate(&self, uv: Vec2, wo: Vec3) -> Color {
        if wo.z > 0.0 {
            self.emission.evaluate(uv)
        } else {
            Color::ZERO
        }
    }
}

/// Any emission profile that can be bound to an instance.
#[derive(Debug, Clone)]
pub enum Emission {
    Lambertian(Lambertian),
}

impl Emission {
    pub fn lambertian(emission: impl Into<Texture>) -> Self {
        Emission::Lambertian(Lambertian::new(emission))
    }

    pub fn evaluate(&self, uv: Vec2, wo: Vec3) -> Color {
        match self {
            Emission::Lambertian(emission) => emission.evaluate(uv, wo),
        }
    }
}
