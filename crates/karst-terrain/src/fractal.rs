//! 2D fractal noise used to perturb the cave-map query height.
//!
//! The cave map shifts the z coordinate of each column by a smooth
//! per-column offset before resolving the lattice cell, which breaks up the
//! otherwise razor-straight cell faces. The offset field repeats features on
//! the order of `period` world units and stays within ±period/2.

use noise::{NoiseFn, Simplex};

const OCTAVES: u32 = 4;
const PERSISTENCE: f64 = 0.5;

/// Deterministic 2D fractal value field.
pub struct FractalNoise {
    noise: Simplex,
    period: f64,
}

impl FractalNoise {
    /// Creates a field with features on the scale of `period` world units.
    pub fn new(seed: u64, period: f64) -> Self {
        debug_assert!(period > 0.0);
        Self {
            noise: Simplex::new(seed as u32),
            period,
        }
    }

    /// Sample the field at a world column. Result is in `[-period/2, period/2]`.
    pub fn get_value(&self, x: i32, y: i32) -> f32 {
        let mut total = 0.0;
        let mut frequency = 1.0 / self.period;
        let mut amplitude = 1.0;
        let mut max_amplitude = 0.0;

        for _ in 0..OCTAVES {
            total += self.noise.get([x as f64 * frequency, y as f64 * frequency]) * amplitude;
            max_amplitude += amplitude;
            frequency *= 2.0;
            amplitude *= PERSISTENCE;
        }

        ((total / max_amplitude) * self.period * 0.5) as f32
    }
}
