//! Seedable source of uniform and Gaussian draws

use std::f64::consts::TAU;

use crate::error::{MidistortError, Result};

/// Random source for every sampled parameter and noise term.
///
/// Two sources built from the same seed replay identical draws.
#[derive(Debug, Clone)]
pub struct NoiseSource {
    rng: fastrand::Rng,
    spare: Option<f64>,
}

impl NoiseSource {
    pub fn new() -> Self {
        Self { rng: fastrand::Rng::new(), spare: None }
    }

    pub fn seeded(seed: u64) -> Self {
        Self { rng: fastrand::Rng::with_seed(seed), spare: None }
    }

    /// Uniform draw in `[lo, hi)`; `lo == hi` yields `lo`
    pub fn uniform(&mut self, option: &str, lo: f64, hi: f64) -> Result<f64> {
        if lo > hi || !lo.is_finite() || !hi.is_finite() {
            return Err(MidistortError::DegenerateConfig { option: option.to_string(), min: lo, max: hi });
        }
        Ok(lo + self.rng.f64() * (hi - lo))
    }

    /// Standard normal draw (Box-Muller, pairs cached)
    pub fn gaussian(&mut self) -> f64 {
        if let Some(z) = self.spare.take() {
            return z;
        }
        // 1 - f64() lies in (0, 1], keeping ln finite
        let u1 = 1.0 - self.rng.f64();
        let u2 = self.rng.f64();
        let radius = (-2.0 * u1.ln()).sqrt();
        self.spare = Some(radius * (TAU * u2).sin());
        radius * (TAU * u2).cos()
    }

    pub fn choose<'a, T>(&mut self, option: &str, choices: &'a [T]) -> Result<&'a T> {
        if choices.is_empty() {
            return Err(MidistortError::EmptyChoice(option.to_string()));
        }
        Ok(&choices[self.rng.usize(..choices.len())])
    }
}

impl Default for NoiseSource {
    fn default() -> Self {
        Self::new()
    }
}
