//! Sources of uniform random numbers for Monte Carlo estimation.
//!
//! A sampler is seeded per pixel and sample index, so a render is
//! reproducible regardless of how buckets are scheduled across threads.
//! Every worker owns its own clone.

use lumen_math::{UVec2, Vec2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Largest f32 strictly below one.
pub const ONE_MINUS_EPSILON: f32 = 1.0 - f32::EPSILON / 2.0;

pub trait Sampler {
    /// Uniform sample in `[0, 1)`.
    fn next(&mut self) -> f32;

    /// Two independent uniform samples.
    fn next_2d(&mut self) -> Vec2 {
        let x = self.next();
        let y = self.next();
        Vec2::new(x, y)
    }

    /// Prepare the sampler for one sample of one pixel.
    fn seed(&mut self, pixel: UVec2, sample_index: u32);
}

/// Mix a base seed with a pixel and sample index (SplitMix64 finalizer).
fn mix_seed(seed: u64, pixel: UVec2, sample_index: u32) -> u64 {
    let mut z = seed
        ^ (((pixel.x as u64) << 32) | pixel.y as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (sample_index as u64).wrapping_mul(0xD1B5_4A32_D192_ED03);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Independent uniform samples from a seeded `StdRng`.
#[derive(Clone, Debug)]
pub struct Independent {
    seed: u64,
    rng: StdRng,
}

impl Independent {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Sampler for Independent {
    fn next(&mut self) -> f32 {
        self.rng.gen::<f32>()
    }

    fn seed(&mut self, pixel: UVec2, sample_index: u32) {
        self.rng = StdRng::seed_from_u64(mix_seed(self.seed, pixel, sample_index));
    }
}

/// Primes used as Halton bases, one per dimension.
const PRIMES: [u32; 100] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89,
    97, 101, 103, 107, 109, 113, 127, 131, 137, 139, 149, 151, 157, 163, 167, 173, 179, 181, 191,
    193, 197, 199, 211, 223, 227, 229, 233, 239, 241, 251, 257, 263, 269, 271, 277, 281, 283, 293,
    307, 311, 313, 317, 331, 337, 347, 349, 353, 359, 367, 373, 379, 383, 389, 397, 401, 409, 419,
    421, 431, 433, 439, 443, 449, 457, 461, 463, 467, 479, 487, 491, 499, 503, 509, 521, 523, 541,
];

/// Radical inverse of `index` in `base`, clamped below one.
pub fn radical_inverse(base: u32, mut index: u32) -> f32 {
    let base = base as u64;
    let inv_base = 1.0 / base as f64;
    let mut inv_base_m = 1.0f64;
    let mut reversed: u64 = 0;

    while index != 0 {
        let next = index as u64 / base;
        let digit = index as u64 - next * base;
        reversed = reversed * base + digit;
        inv_base_m *= inv_base;
        index = next as u32;
    }
    ((reversed as f64 * inv_base_m) as f32).min(ONE_MINUS_EPSILON)
}

/// Halton sequence with a random per-pixel offset (Cranley-Patterson rotation).
///
/// Dimension `d` of a sample uses the `d`-th prime as its base; dimensions
/// wrap around after the prime table is exhausted.
#[derive(Clone, Debug)]
pub struct Halton {
    seed: u64,
    dimension: usize,
    index: u32,
    offset: f32,
}

impl Halton {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            dimension: 0,
            index: 0,
            offset: 0.0,
        }
    }
}

impl Sampler for Halton {
    fn next(&mut self) -> f32 {
        let base = PRIMES[self.dimension % PRIMES.len()];
        self.dimension += 1;

        let mut result = radical_inverse(base, self.index) + self.offset;
        if result >= 1.0 {
            result -= 1.0;
        }
        result.min(ONE_MINUS_EPSILON)
    }

    fn seed(&mut self, pixel: UVec2, sample_index: u32) {
        // The offset depends on the pixel only, so all samples of a pixel
        // share one rotation of the sequence.
        let mut rng = StdRng::seed_from_u64(mix_seed(self.seed, pixel, 0));
        self.offset = rng.gen::<f32>();
        self.dimension = 0;
        self.index = sample_index;
    }
}
