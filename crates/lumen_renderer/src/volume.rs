//! Heterogeneous participating media.
//!
//! A volume is a scalar density field over the local `[-1, 1]^3` cube of the
//! instance it is bound to. Free-flight distances are drawn with delta
//! tracking against the field's maximum density.

use crate::error::{SceneError, SceneResult};
use byteorder::{LittleEndian, ReadBytesExt};
use lumen_core::Sampler;
use lumen_math::{Ray, UVec3, Vec3};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// Upper bound on null collisions per tracking query.
pub const TRACKING_STEPS: usize = 1024;

/// Interpolation used when looking up grid densities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GridFilter {
    Nearest,
    #[default]
    Trilinear,
}

/// Density grid read from a binary file.
///
/// The file holds three little-endian `f32` dimensions followed by
/// `x * y * z` little-endian `f32` densities, x fastest, then y, then z.
#[derive(Debug, Clone)]
pub struct Grid {
    resolution: UVec3,
    densities: Vec<f32>,
    max_density: f32,
    filter: GridFilter,
}

impl Grid {
    /// Load a grid, scaling every density by `multiplier`.
    pub fn load(path: impl AsRef<Path>, multiplier: f32, filter: GridFilter) -> SceneResult<Self> {
        let path = path.as_ref();
        let to_error = |source| SceneError::Volume {
            path: path.display().to_string(),
            source,
        };

        let file = File::open(path).map_err(to_error)?;
        let grid = Self::from_reader(BufReader::new(file), multiplier, filter).map_err(to_error)?;

        log::info!(
            "Loaded volume {} ({} x {} x {}, max density {})",
            path.display(),
            grid.resolution.x,
            grid.resolution.y,
            grid.resolution.z,
            grid.max_density
        );
        Ok(grid)
    }

    /// Read a grid from its binary form.
    ///
    /// Dimensions must be finite and at least one voxel along every axis.
    /// The density block is read against the stream before anything is
    /// allocated for it, so a header promising more data than the stream
    /// holds fails with `UnexpectedEof` instead of reserving memory.
    pub fn from_reader<R: Read>(mut reader: R, multiplier: f32, filter: GridFilter) -> io::Result<Self> {
        let mut dims = [0.0f32; 3];
        reader.read_f32_into::<LittleEndian>(&mut dims)?;
        if dims.iter().any(|d| !d.is_finite() || *d < 1.0 || *d > u32::MAX as f32) {
            return Err(invalid_data(format!("bad grid dimensions {dims:?}")));
        }
        // Dimensions are stored as floats; truncate like an integer cast
        let resolution = UVec3::new(dims[0] as u32, dims[1] as u32, dims[2] as u32);

        let byte_count = (resolution.x as usize)
            .checked_mul(resolution.y as usize)
            .and_then(|n| n.checked_mul(resolution.z as usize))
            .and_then(|n| n.checked_mul(std::mem::size_of::<f32>()))
            .ok_or_else(|| invalid_data(format!("grid of {dims:?} voxels is too large")))?;

        let mut bytes = Vec::new();
        reader.take(byte_count as u64).read_to_end(&mut bytes)?;
        if bytes.len() != byte_count {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("grid holds {} of {byte_count} density bytes", bytes.len()),
            ));
        }

        let mut densities = vec![0.0f32; byte_count / std::mem::size_of::<f32>()];
        bytes.as_slice().read_f32_into::<LittleEndian>(&mut densities)?;
        let mut max_density = 0.0f32;
        for density in &mut densities {
            *density *= multiplier;
            max_density = max_density.max(*density);
        }

        Ok(Self {
            resolution,
            densities,
            max_density,
            filter,
        })
    }

    pub fn resolution(&self) -> UVec3 {
        self.resolution
    }

    fn value_at(&self, x: usize, y: usize, z: usize) -> f32 {
        let (rx, ry, rz) = (
            self.resolution.x as usize,
            self.resolution.y as usize,
            self.resolution.z as usize,
        );
        if x >= rx || y >= ry || z >= rz {
            return 0.0;
        }
        self.densities[z * rx * ry + y * rx + x]
    }

    pub fn evaluate(&self, position: Vec3) -> f32 {
        let p = position * 0.5 + 0.5;
        if p.cmplt(Vec3::ZERO).any() || p.cmpgt(Vec3::ONE).any() {
            return 0.0;
        }

        // Rows run top to bottom
        let res = self.resolution.as_vec3();
        let dc = Vec3::new(p.x * res.x, (1.0 - p.y) * res.y, p.z * res.z);
        let cell = dc.floor();
        let (x, y, z) = (cell.x as usize, cell.y as usize, cell.z as usize);

        if self.filter == GridFilter::Nearest {
            return self.value_at(x, y, z);
        }

        let f = dc - cell;
        let lerp = |a: f32, b: f32, t: f32| a + (b - a) * t;

        let v00 = lerp(self.value_at(x, y, z), self.value_at(x + 1, y, z), f.x);
        let v01 = lerp(self.value_at(x, y, z + 1), self.value_at(x + 1, y, z + 1), f.x);
        let v10 = lerp(self.value_at(x, y + 1, z), self.value_at(x + 1, y + 1, z), f.x);
        let v11 = lerp(self.value_at(x, y + 1, z + 1), self.value_at(x + 1, y + 1, z + 1), f.x);

        let v0 = lerp(v00, v01, f.z);
        let v1 = lerp(v10, v11, f.z);
        lerp(v0, v1, f.y)
    }
}

fn invalid_data(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}

/// Any density field that can be bound to an instance.
#[derive(Debug, Clone)]
pub enum Volume {
    /// Uniform density.
    Constant(f32),
    /// Density ramping up quadratically along y and linearly along z.
    Fade(f32),
    Grid(Grid),
}

impl Volume {
    /// Density at a local-space position.
    pub fn density(&self, position: Vec3) -> f32 {
        match self {
            Volume::Constant(value) => *value,
            Volume::Fade(value) => {
                let p = position * 0.5 + 0.5;
                p.y * p.y * p.z * value
            }
            Volume::Grid(grid) => grid.evaluate(position),
        }
    }

    /// Majorant used by delta tracking.
    pub fn max_density(&self) -> f32 {
        match self {
            Volume::Constant(value) | Volume::Fade(value) => *value,
            Volume::Grid(grid) => grid.max_density,
        }
    }

    /// Sample a real collision along `local_ray` by delta tracking.
    ///
    /// Tracking starts at local distance `its_t` and may travel at most
    /// `inside_t` before leaving the medium. `scale` is the local/world
    /// distance ratio of the ray. Returns the world-space collision
    /// distance, or `None` when the ray passes through.
    pub fn sample_distance(
        &self,
        mut its_t: f32,
        mut inside_t: f32,
        scale: f32,
        local_ray: &Ray,
        rng: &mut dyn Sampler,
    ) -> Option<f32> {
        let max_density = self.max_density();
        if max_density <= 0.0 {
            return None;
        }

        for _ in 0..TRACKING_STEPS {
            let step = -(1.0 - rng.next()).ln() / max_density * scale;
            if step >= inside_t {
                return None;
            }

            let next_t = its_t + step;
            let real_probability = self.density(local_ray.at(next_t)) / max_density;
            if rng.next() < real_probability {
                return Some(next_t / scale);
            }

            // Null collision
            its_t = next_t;
            inside_t -= step;
        }

        // Too dense to escape: accept the last tentative collision
        log::trace!("Delta tracking ran out of steps at t = {}", its_t / scale);
        Some(its_t / scale)
    }
}
