//! Gaussian noise on individual velocities

use serde::{Deserialize, Serialize};

use super::{clamp_velocity, impl_distorter, RandomizeParams};
use crate::error::Result;
use crate::noise::NoiseSource;
use crate::pattern::Pattern;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VelocityNoise {
    /// Standard deviation of the noise, in velocity units
    pub sigma: f64,
}

impl Default for VelocityNoise {
    fn default() -> Self {
        Self { sigma: 10.0 }
    }
}

impl VelocityNoise {
    pub fn new(sigma: f64) -> Self {
        Self { sigma }
    }

    fn randomize_impl(&mut self, params: &RandomizeParams, noise: &mut NoiseSource) -> Result<()> {
        self.sigma = params.sample_sigma(noise, 0.0, 20.0)?;
        Ok(())
    }

    fn transform_impl(&self, _source: &Pattern, target: &mut Pattern, noise: &mut NoiseSource) -> Result<()> {
        for event in target.tracks.iter_mut().flat_map(|t| t.events_mut()) {
            if !event.is_sounding_note_on() {
                continue;
            }
            if let Some(velocity) = event.velocity() {
                let noisy = f64::from(velocity) + self.sigma * noise.gaussian();
                event.set_velocity(clamp_velocity(noisy));
            }
        }
        Ok(())
    }
}

impl_distorter!(VelocityNoise, "VelocityNoise", sigma);
