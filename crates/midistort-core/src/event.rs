//! Timed MIDI events

use serde::{Deserialize, Serialize};

use crate::error::{MidistortError, Result};

const MICROS_PER_MINUTE: f64 = 60_000_000.0;

/// Kind-specific payload of an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    NoteOn { channel: u8, pitch: u8, velocity: u8 },
    NoteOff { channel: u8, pitch: u8, velocity: u8 },
    ProgramChange { channel: u8, program: u8 },
    /// Tempo in microseconds per quarter note
    SetTempo { micros_per_quarter: u32 },
    EndOfTrack,
    /// Event kept byte for byte without interpretation
    Other { data: Vec<u8> },
    /// Event the importer could not represent. Cloning a pattern holding one fails.
    Unsupported { description: String },
}

/// A single event with its tick offset.
///
/// Whether `tick` is a delta or an absolute position depends on the owning
/// pattern's tick mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub tick: u64,
    pub kind: EventKind,
}

impl Event {
    pub fn new(tick: u64, kind: EventKind) -> Self {
        Self { tick, kind }
    }

    pub fn note_on(tick: u64, channel: u8, pitch: u8, velocity: u8) -> Self {
        Self::new(tick, EventKind::NoteOn { channel, pitch, velocity })
    }

    pub fn note_off(tick: u64, channel: u8, pitch: u8) -> Self {
        Self::new(tick, EventKind::NoteOff { channel, pitch, velocity: 0 })
    }

    pub fn program_change(tick: u64, channel: u8, program: u8) -> Self {
        Self::new(tick, EventKind::ProgramChange { channel, program })
    }

    pub fn tempo(tick: u64, bpm: f64) -> Self {
        Self::new(tick, EventKind::SetTempo { micros_per_quarter: micros_for_bpm(bpm) })
    }

    pub fn end_of_track(tick: u64) -> Self {
        Self::new(tick, EventKind::EndOfTrack)
    }

    /// Copy the event, refusing kinds that cannot be reproduced faithfully
    pub fn try_clone(&self) -> Result<Self> {
        if let EventKind::Unsupported { description } = &self.kind {
            return Err(MidistortError::Clone(description.clone()));
        }
        Ok(self.clone())
    }

    /// Note-on with a non-zero velocity. A zero-velocity note-on is a note-off.
    pub fn is_sounding_note_on(&self) -> bool {
        matches!(self.kind, EventKind::NoteOn { velocity, .. } if velocity > 0)
    }

    pub fn is_note(&self) -> bool {
        matches!(self.kind, EventKind::NoteOn { .. } | EventKind::NoteOff { .. })
    }

    pub fn is_tempo(&self) -> bool {
        matches!(self.kind, EventKind::SetTempo { .. })
    }

    pub fn is_program_change(&self) -> bool {
        matches!(self.kind, EventKind::ProgramChange { .. })
    }

    pub fn is_end_of_track(&self) -> bool {
        matches!(self.kind, EventKind::EndOfTrack)
    }

    pub fn velocity(&self) -> Option<u8> {
        match self.kind {
            EventKind::NoteOn { velocity, .. } | EventKind::NoteOff { velocity, .. } => Some(velocity),
            _ => None,
        }
    }

    /// Set the velocity of a note event; other kinds are left alone
    pub fn set_velocity(&mut self, value: u8) {
        if let EventKind::NoteOn { velocity, .. } | EventKind::NoteOff { velocity, .. } = &mut self.kind {
            *velocity = value.min(127);
        }
    }

    /// Tempo carried by a tempo-change event
    pub fn bpm(&self) -> Option<f64> {
        match self.kind {
            EventKind::SetTempo { micros_per_quarter } if micros_per_quarter > 0 => {
                Some(MICROS_PER_MINUTE / micros_per_quarter as f64)
            }
            _ => None,
        }
    }

    pub fn set_bpm(&mut self, bpm: f64) {
        if let EventKind::SetTempo { micros_per_quarter } = &mut self.kind {
            *micros_per_quarter = micros_for_bpm(bpm);
        }
    }
}

fn micros_for_bpm(bpm: f64) -> u32 {
    (MICROS_PER_MINUTE / bpm).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tempo_conversion() {
        let e = Event::tempo(0, 120.0);
        assert_eq!(e.kind, EventKind::SetTempo { micros_per_quarter: 500_000 });
        assert_eq!(e.bpm(), Some(120.0));

        let mut e = Event::tempo(0, 60.0);
        e.set_bpm(90.0);
        assert!((e.bpm().unwrap() - 90.0).abs() < 1e-3);
    }

    #[test]
    fn test_zero_velocity_note_on_is_not_sounding() {
        assert!(Event::note_on(0, 0, 60, 100).is_sounding_note_on());
        assert!(!Event::note_on(0, 0, 60, 0).is_sounding_note_on());
        assert!(!Event::note_off(0, 0, 60).is_sounding_note_on());
    }

    #[test]
    fn test_set_velocity_ignores_non_notes() {
        let mut e = Event::program_change(0, 0, 5);
        e.set_velocity(50);
        assert_eq!(e.velocity(), None);

        let mut e = Event::note_on(0, 0, 60, 10);
        e.set_velocity(50);
        assert_eq!(e.velocity(), Some(50));
    }

    #[test]
    fn test_unsupported_event_cannot_be_cloned() {
        let e = Event::new(3, EventKind::Unsupported { description: "escape".into() });
        assert!(matches!(e.try_clone(), Err(MidistortError::Clone(_))));
        assert!(Event::end_of_track(3).try_clone().is_ok());
    }
}
