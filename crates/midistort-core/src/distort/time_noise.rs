//! Gaussian jitter on note onsets

use serde::{Deserialize, Serialize};

use super::{impl_distorter, RandomizeParams};
use crate::error::Result;
use crate::noise::NoiseSource;
use crate::pattern::Pattern;

/// Shifts every sounding note-on by `sigma` quarter notes of Gaussian noise.
///
/// Only note-ons move, so a note-on may end up after its own note-off.
/// That pairing is not repaired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeNoise {
    /// Standard deviation of the shift, in quarter notes
    pub sigma: f64,
}

impl Default for TimeNoise {
    fn default() -> Self {
        Self { sigma: 0.1 }
    }
}

impl TimeNoise {
    pub fn new(sigma: f64) -> Self {
        Self { sigma }
    }

    fn randomize_impl(&mut self, params: &RandomizeParams, noise: &mut NoiseSource) -> Result<()> {
        self.sigma = params.sample_sigma(noise, 0.0, 0.1)?;
        Ok(())
    }

    fn transform_impl(&self, source: &Pattern, target: &mut Pattern, noise: &mut NoiseSource) -> Result<()> {
        let resolution = f64::from(source.resolution);
        target.to_absolute_ticks();
        for track in &mut target.tracks {
            for event in track.events_mut() {
                if event.is_sounding_note_on() {
                    let shifted = (event.tick as f64 + self.sigma * noise.gaussian() * resolution).round();
                    event.tick = shifted.max(1.0) as u64;
                }
            }

            // End of track must stay last
            let last = track.events().map(|e| e.tick).max().unwrap_or(0);
            for event in track.events_mut().filter(|e| e.is_end_of_track()) {
                event.tick = last;
            }
            // Deltas must not go negative on the way back to relative ticks
            track.sort_by_tick();
        }
        target.to_relative_ticks();
        Ok(())
    }
}

impl_distorter!(TimeNoise, "TimeNoise", sigma);
