//! Random source abstraction for the telemetry simulation.
//!
//! Speed jitter, starting grid spread and incident trials all draw from a
//! [`RandomSource`]. Production seeds from the OS; tests either fix a seed
//! or script the exact sequence of draws.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of uniform samples in `[0, 1)`.
pub trait RandomSource: Send {
    fn next_unit(&mut self) -> f64;
}

/// `StdRng`-backed source. Given the same seed, draws are identical.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Seed from operating system entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_unit(&mut self) -> f64 {
        self.rng.random::<f64>()
    }
}

/// Replays a fixed list of samples, cycling when it runs out.
///
/// `ScriptedRandom::constant(0.5)` gives zero speed jitter and never fires
/// an incident trial.
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    samples: Vec<f64>,
    position: usize,
}

impl ScriptedRandom {
    /// Samples are clamped into `[0, 1)`; an empty script behaves like
    /// `constant(0.5)`.
    #[must_use]
    pub fn new(samples: Vec<f64>) -> Self {
        let samples: Vec<f64> = samples
            .into_iter()
            .map(|s| if s.is_finite() { s.clamp(0.0, 1.0 - f64::EPSILON) } else { 0.5 })
            .collect();
        if samples.is_empty() {
            return Self::constant(0.5);
        }
        Self {
            samples,
            position: 0,
        }
    }

    #[must_use]
    pub fn constant(sample: f64) -> Self {
        Self {
            samples: vec![sample.clamp(0.0, 1.0 - f64::EPSILON)],
            position: 0,
        }
    }
}

impl RandomSource for ScriptedRandom {
    fn next_unit(&mut self) -> f64 {
        let sample = self.samples[self.position % self.samples.len()];
        self.position = self.position.wrapping_add(1);
        sample
    }
}
