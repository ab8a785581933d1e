//! Seeded sampling for healing: angles, jitter and synthetic grain.
//!
//! Each spot gets its own generator seeded from the run seed and the spot's
//! canonical position, so the same spot draws the same pattern at preview
//! and export resolution and regardless of how many other spots exist.

use std::f32::consts::TAU;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// Per-spot random source.
pub struct SpotRng {
    rng: ChaCha8Rng,
}

impl SpotRng {
    /// Generator for the spot centered at normalized `(nx, ny)`.
    pub fn for_spot(seed: u64, nx: f32, ny: f32) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(spot_seed(seed, nx, ny)),
        }
    }

    /// Uniform angle in `[0, 2pi)`.
    pub fn angle(&mut self) -> f32 {
        self.rng.random::<f32>() * TAU
    }

    /// Uniform value in `[-amount, amount]`.
    pub fn jitter(&mut self, amount: f32) -> f32 {
        if amount <= 0.0 {
            return 0.0;
        }
        self.rng.random_range(-amount..=amount)
    }

    /// Uniform value in `[0, 1)`.
    pub fn unit(&mut self) -> f32 {
        self.rng.random::<f32>()
    }

    /// Standard normal sample (Box-Muller).
    pub fn gaussian(&mut self) -> f32 {
        let u1 = self.rng.random::<f32>().max(f32::MIN_POSITIVE);
        let u2 = self.rng.random::<f32>();
        (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
    }
}

/// Mixes the run seed with the bit patterns of a spot center.
pub fn spot_seed(seed: u64, nx: f32, ny: f32) -> u64 {
    let pos = ((nx.to_bits() as u64) << 32) | ny.to_bits() as u64;
    // splitmix64 finalizer
    let mut z = seed ^ pos.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
