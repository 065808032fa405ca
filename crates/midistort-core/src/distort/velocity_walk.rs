//! Velocities scaled by a bounded random walk

use serde::{Deserialize, Serialize};

use super::{clamp_velocity, impl_distorter, RandomizeParams};
use crate::error::Result;
use crate::noise::NoiseSource;
use crate::pattern::Pattern;
use crate::walk::{RandomWalk, WalkScope};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VelocityWalk {
    /// Standard deviation of the walk per quarter note
    pub sigma: f64,
    /// Lowest multiple of the original velocity
    pub min: f64,
    /// Highest multiple of the original velocity
    pub max: f64,
    #[serde(default)]
    pub scope: WalkScope,
}

impl Default for VelocityWalk {
    fn default() -> Self {
        Self { sigma: 10.0, min: 0.5, max: 2.0, scope: WalkScope::Shared }
    }
}

impl VelocityWalk {
    pub fn new(sigma: f64, min: f64, max: f64) -> Self {
        Self { sigma, min, max, scope: WalkScope::Shared }
    }

    pub fn with_scope(mut self, scope: WalkScope) -> Self {
        self.scope = scope;
        self
    }

    fn randomize_impl(&mut self, params: &RandomizeParams, noise: &mut NoiseSource) -> Result<()> {
        self.sigma = params.sample_sigma(noise, 0.0, 20.0)?;
        (self.min, self.max) = params.sample_bounds(noise, 0.3, 1.5)?;
        Ok(())
    }

    fn transform_impl(&self, source: &Pattern, target: &mut Pattern, noise: &mut NoiseSource) -> Result<()> {
        let mut walk = RandomWalk::new(self.sigma, source.resolution, self.min, self.max)?;
        for track in &mut target.tracks {
            if self.scope == WalkScope::PerTrack {
                walk.reset();
            }
            for event in track.events_mut() {
                let multiple = walk.step(event.tick, noise);
                if !event.is_sounding_note_on() {
                    continue;
                }
                if let Some(velocity) = event.velocity() {
                    event.set_velocity(clamp_velocity(f64::from(velocity) * multiple));
                }
            }
        }
        Ok(())
    }
}

impl_distorter!(VelocityWalk, "VelocityWalk", sigma, min, max);
