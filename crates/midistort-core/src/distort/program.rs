//! Instrument reassignment

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{impl_distorter, RandomizeParams};
use crate::error::Result;
use crate::event::Event;
use crate::noise::NoiseSource;
use crate::pattern::Pattern;
use crate::timing::REFERENCE_TIME;

const CHANNELS: u8 = 16;
const DEFAULT_INSTRUMENTS: [f64; 4] = [0.0, 1.0, 2.0, 3.0];

/// Keeps the first track only, with every program change replaced by one
/// program change per channel to `instrument`.
///
/// Event count and order change, so attributes and the reference stamps
/// are rebuilt from the new track.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgramDistorter {
    /// General MIDI program number
    pub instrument: u8,
}

impl ProgramDistorter {
    pub fn new(instrument: u8) -> Self {
        Self { instrument: instrument.min(127) }
    }

    fn randomize_impl(&mut self, params: &RandomizeParams, noise: &mut NoiseSource) -> Result<()> {
        let instruments = params.choices_or("instruments", &DEFAULT_INSTRUMENTS)?;
        let choice = noise.choose("instruments", &instruments)?;
        self.instrument = choice.round().clamp(0.0, 127.0) as u8;
        Ok(())
    }

    fn transform_impl(&self, _source: &Pattern, target: &mut Pattern, _noise: &mut NoiseSource) -> Result<()> {
        let mut track = std::mem::take(&mut target.tracks).into_iter().next().unwrap_or_default();
        track.remove_relative(Event::is_program_change);
        for channel in (0..CHANNELS).rev() {
            track.insert(0, Event::program_change(0, channel, self.instrument));
        }
        target.tracks.push(track);

        target.init_attributes();
        target.stamp_time(REFERENCE_TIME, None)
    }
}

impl_distorter!(ProgramDistorter, "Program");

impl fmt::Display for ProgramDistorter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Program(instrument={})", self.instrument)
    }
}
