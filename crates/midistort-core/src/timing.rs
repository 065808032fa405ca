//! Tempo-aware conversion of ticks to seconds

use crate::error::{MidistortError, Result};
use crate::pattern::{Pattern, Track};

/// Label of the reference (pre-distortion) timestamp
pub const REFERENCE_TIME: &str = "t0";
/// Label of the candidate (post-distortion) timestamp
pub const CANDIDATE_TIME: &str = "t";
/// Tempo assumed until the first tempo change
pub const DEFAULT_BPM: f64 = 120.0;

impl Pattern {
    /// Store the elapsed seconds of every event under `label`.
    ///
    /// Time restarts at zero on each track, but the running tempo does not:
    /// a tempo change in one track keeps governing the following tracks. A
    /// tempo change is itself timed at the old rate. With `fixed_bpm` all
    /// tempo changes are ignored.
    pub fn stamp_time(&mut self, label: &str, fixed_bpm: Option<f64>) -> Result<()> {
        if !self.is_tick_relative() {
            return Err(MidistortError::AbsoluteTicks);
        }
        if self.resolution == 0 {
            return Err(MidistortError::InvalidResolution);
        }
        let resolution = f64::from(self.resolution);
        let mut bpm = fixed_bpm.unwrap_or(DEFAULT_BPM);

        for track in &mut self.tracks {
            let mut elapsed = 0.0;
            for entry in track {
                elapsed += 60.0 / bpm / resolution * entry.event.tick as f64;
                entry.attributes.insert(label.to_string(), elapsed);

                if fixed_bpm.is_none() {
                    if let Some(next) = entry.event.bpm() {
                        bpm = next;
                    }
                }
            }
        }
        Ok(())
    }
}

impl Track {
    /// Values stored under `label`, `None` where an event lacks one
    pub fn timestamps(&self, label: &str) -> Vec<Option<f64>> {
        self.iter().map(|e| e.attribute(label)).collect()
    }
}
