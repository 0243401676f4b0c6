//! Random source abstraction for the scheduler.
//!
//! The scheduler draws exactly two numbers per event: an exponential waiting
//! time and a uniform selection value. `RandomSource` is the seam through
//! which it gets them, so a replicate is reproducible from its seed and
//! tests can script the draws.

use rand::{Rng, SeedableRng};
use rand_core::RngCore;

/// Source of the two draws the direct method needs.
pub trait RandomSource {
    /// Uniform value in `[0, 1)`.
    fn uniform(&mut self) -> f64;

    /// Exponentially distributed value with the given rate (`rate > 0`).
    fn exponential(&mut self, rate: f64) -> f64 {
        // 1 - u lies in (0, 1], so the log is finite.
        -(1.0 - self.uniform()).ln() / rate
    }
}

impl<R: RngCore> RandomSource for R {
    fn uniform(&mut self) -> f64 {
        self.gen::<f64>()
    }
}

/// Random stream used when none is supplied.
pub type DefaultRng = rand::rngs::StdRng;

/// Reproducible stream for a replicate seed.
pub fn seeded_rng(seed: u64) -> DefaultRng {
    DefaultRng::seed_from_u64(seed)
}
