//! Pseudo-random sampling with an injectable source.
//!
//! Every random draw in the simulator goes through [`RandomSource`], so tests
//! can pin values exactly (a constant source) or reproduce a sequence (a
//! seeded source) without touching the sampling arithmetic.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Number of decimal places kept by [`sample`].
pub const SAMPLE_PRECISION: f64 = 1000.0;

/// Abstraction over the uniform random generator for dependency injection.
pub trait RandomSource: Send {
    /// Returns a value uniformly distributed in `[0, 1)`.
    fn next_unit(&mut self) -> f64;
}

/// Thread-local, OS-seeded generator used in production.
///
/// Holds no state itself: `rand::rng()` is looked up per draw so the source
/// stays `Send` and can move into a scheduler task.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_unit(&mut self) -> f64 {
        rand::rng().random::<f64>()
    }
}

/// Deterministic generator for reproducible runs.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    /// Creates a generator whose sequence is fully determined by `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_unit(&mut self) -> f64 {
        self.rng.random::<f64>()
    }
}

/// Source that always returns the same unit value. Clamped into `[0, 1)`.
#[derive(Debug, Clone, Copy)]
pub struct ConstantRandom(pub f64);

impl RandomSource for ConstantRandom {
    fn next_unit(&mut self) -> f64 {
        self.0.clamp(0.0, 1.0 - f64::EPSILON)
    }
}

/// Draws a value uniformly from `[min, max]`, rounded to three decimals.
///
/// `min > max` is accepted and simply yields a value between `max` and `min`.
/// Rounding is half-up (`x.5` rounds toward positive infinity).
pub fn sample(rng: &mut dyn RandomSource, min: f64, max: f64) -> f64 {
    let raw = rng.next_unit() * (max - min) + min;
    round_to_precision(raw)
}

/// Rounds half-up to [`SAMPLE_PRECISION`].
#[must_use]
pub fn round_to_precision(value: f64) -> f64 {
    (value * SAMPLE_PRECISION + 0.5).floor() / SAMPLE_PRECISION
}
