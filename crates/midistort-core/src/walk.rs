//! Bounded random-walk multiplier shared by the walk distorters

use serde::{Deserialize, Serialize};

use crate::error::{MidistortError, Result};
use crate::noise::NoiseSource;

/// Whether one walk spans every track or each track starts a fresh one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalkScope {
    /// One walk threaded through all tracks in iteration order
    #[default]
    Shared,
    /// Restart at 1.0 at the beginning of every track
    PerTrack,
}

/// Multiplier evolving by Gaussian increments scaled by elapsed ticks,
/// clamped to `[min, max]` after every step.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomWalk {
    value: f64,
    sigma_per_tick: f64,
    min: f64,
    max: f64,
}

impl RandomWalk {
    /// `sigma` is the standard deviation per quarter note
    pub fn new(sigma: f64, resolution: u16, min: f64, max: f64) -> Result<Self> {
        if min.is_nan() || max.is_nan() || min > max {
            return Err(MidistortError::DegenerateConfig { option: "min/max".into(), min, max });
        }
        let resolution = f64::from(resolution.max(1));
        Ok(Self { value: 1.0, sigma_per_tick: sigma / resolution.sqrt(), min, max })
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn reset(&mut self) {
        self.value = 1.0;
    }

    /// Advance by `ticks` and return the new multiplier
    pub fn step(&mut self, ticks: u64, noise: &mut NoiseSource) -> f64 {
        let increment = self.sigma_per_tick * noise.gaussian() * (ticks as f64).sqrt();
        self.value = (self.value + increment).clamp(self.min, self.max);
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walk_never_leaves_bounds() {
        let mut noise = NoiseSource::seeded(11);
        for sigma in [0.0, 0.5, 5.0, 500.0] {
            let mut walk = RandomWalk::new(sigma, 96, 0.6, 1.4).unwrap();
            for ticks in (0..2000u64).map(|i| i % 200) {
                let m = walk.step(ticks, &mut noise);
                assert!((0.6..=1.4).contains(&m), "sigma {sigma}: {m}");
            }
        }
    }

    #[test]
    fn test_zero_ticks_do_not_move_the_walk() {
        let mut noise = NoiseSource::seeded(2);
        let mut walk = RandomWalk::new(10.0, 96, 0.3, 1.5).unwrap();
        assert_eq!(walk.step(0, &mut noise), 1.0);
    }

    #[test]
    fn test_start_outside_bounds_is_clamped_on_first_step() {
        let mut noise = NoiseSource::seeded(2);
        let mut walk = RandomWalk::new(0.0, 96, 1.2, 1.5).unwrap();
        assert_eq!(walk.step(10, &mut noise), 1.2);
        walk.reset();
        assert_eq!(walk.value(), 1.0);
    }

    #[test]
    fn test_inverted_bounds_are_rejected() {
        assert!(matches!(
            RandomWalk::new(1.0, 96, 1.5, 0.5),
            Err(MidistortError::DegenerateConfig { .. })
        ));
    }
}
