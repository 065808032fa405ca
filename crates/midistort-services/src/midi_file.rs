//! Standard MIDI File import and export
//!
//! Uses the `midly` crate. Note, program, tempo and end-of-track events map to
//! typed events; other channel messages and sysex are kept as raw bytes. Meta
//! events without a typed counterpart (names, markers, signatures) are
//! dropped, their deltas folded into the next kept event.

use std::path::Path;

use midistort_core::{Event, EventKind, Pattern, Track};
use midly::live::LiveEvent;
use midly::num::{u4, u7, u15, u24, u28};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use tracing::{debug, info};

use crate::error::{Result, ServiceError};

const SYSEX_MARKER: u8 = 0xF0;

pub fn load_pattern(path: &Path) -> Result<Pattern> {
    let bytes = std::fs::read(path)?;
    let smf = Smf::parse(&bytes).map_err(|e| ServiceError::Midi(format!("{}: {e}", path.display())))?;
    let pattern = pattern_from_smf(&smf)?;
    info!(
        path = %path.display(),
        tracks = pattern.tracks.len(),
        events = pattern.event_count(),
        resolution = pattern.resolution,
        "Loaded MIDI file"
    );
    Ok(pattern)
}

pub fn save_pattern(pattern: &Pattern, path: &Path) -> Result<()> {
    let smf = pattern_to_smf(pattern)?;
    smf.save(path)?;
    info!(path = %path.display(), events = pattern.event_count(), "Wrote MIDI file");
    Ok(())
}

/// Convert a parsed file into a relative-tick pattern
pub fn pattern_from_smf(smf: &Smf) -> Result<Pattern> {
    let resolution = match smf.header.timing {
        Timing::Metrical(ticks) => ticks.as_int(),
        Timing::Timecode(..) => return Err(ServiceError::Midi("SMPTE timecode timing is not supported".into())),
    };
    let format = match smf.header.format {
        Format::SingleTrack => 0,
        Format::Parallel => 1,
        Format::Sequential => 2,
    };

    let mut pattern = Pattern::new(resolution, format);
    let mut dropped = 0usize;
    for raw_track in &smf.tracks {
        let mut track = Track::new();
        let mut carry = 0u64;
        for raw in raw_track {
            let tick = carry + u64::from(raw.delta.as_int());
            match convert_event(&raw.kind)? {
                Some(kind) => {
                    track.push(Event::new(tick, kind));
                    carry = 0;
                }
                None => {
                    dropped += 1;
                    carry = tick;
                }
            }
        }
        pattern.tracks.push(track);
    }
    debug!(dropped, "Dropped untyped meta events");
    Ok(pattern)
}

fn convert_event(kind: &TrackEventKind) -> Result<Option<EventKind>> {
    let converted = match *kind {
        TrackEventKind::Midi { channel, message } => Some(match message {
            MidiMessage::NoteOn { key, vel } => EventKind::NoteOn {
                channel: channel.as_int(),
                pitch: key.as_int(),
                velocity: vel.as_int(),
            },
            MidiMessage::NoteOff { key, vel } => EventKind::NoteOff {
                channel: channel.as_int(),
                pitch: key.as_int(),
                velocity: vel.as_int(),
            },
            MidiMessage::ProgramChange { program } => EventKind::ProgramChange {
                channel: channel.as_int(),
                program: program.as_int(),
            },
            message => {
                let mut data = Vec::new();
                LiveEvent::Midi { channel, message }.write_std(&mut data)?;
                EventKind::Other { data }
            }
        }),
        TrackEventKind::SysEx(bytes) => {
            let mut data = Vec::with_capacity(bytes.len() + 1);
            data.push(SYSEX_MARKER);
            data.extend_from_slice(bytes);
            Some(EventKind::Other { data })
        }
        TrackEventKind::Escape(bytes) => Some(EventKind::Unsupported {
            description: format!("escape sequence of {} bytes", bytes.len()),
        }),
        TrackEventKind::Meta(MetaMessage::Tempo(micros)) => {
            Some(EventKind::SetTempo { micros_per_quarter: micros.as_int() })
        }
        TrackEventKind::Meta(MetaMessage::EndOfTrack) => Some(EventKind::EndOfTrack),
        TrackEventKind::Meta(_) => None,
    };
    Ok(converted)
}

/// Convert a pattern into a file; raw events borrow from `pattern`
pub fn pattern_to_smf(pattern: &Pattern) -> Result<Smf<'_>> {
    let format = match pattern.format {
        0 => Format::SingleTrack,
        2 => Format::Sequential,
        _ => Format::Parallel,
    };
    let resolution = fit("resolution", u64::from(pattern.resolution), 15)? as u16;
    let mut smf = Smf::new(Header::new(format, Timing::Metrical(u15::new(resolution))));

    let mut relative = pattern.try_clone()?;
    relative.to_relative_ticks();
    for (track, deltas) in pattern.tracks.iter().zip(&relative.tracks) {
        let mut raw_track = Vec::with_capacity(track.len());
        for (event, delta) in track.events().zip(deltas.events().map(|e| e.tick)) {
            let delta = fit("delta", delta, 28)? as u32;
            raw_track.push(TrackEvent { delta: u28::new(delta), kind: export_event(&event.kind)? });
        }
        smf.tracks.push(raw_track);
    }
    Ok(smf)
}

/// `value` unchanged if it fits in `bits` bits. midly's integer
/// constructors mask off high bits, so every field is checked first.
fn fit(field: &str, value: u64, bits: u32) -> Result<u64> {
    if value >> bits == 0 {
        Ok(value)
    } else {
        Err(ServiceError::Midi(format!("{field} {value} does not fit in {bits} bits")))
    }
}

fn channel_field(channel: u8) -> Result<u4> {
    Ok(u4::new(fit("channel", channel.into(), 4)? as u8))
}

fn data_field(field: &str, value: u8) -> Result<u7> {
    Ok(u7::new(fit(field, value.into(), 7)? as u8))
}

fn export_event(kind: &EventKind) -> Result<TrackEventKind<'_>> {
    let exported = match kind {
        EventKind::NoteOn { channel, pitch, velocity } => TrackEventKind::Midi {
            channel: channel_field(*channel)?,
            message: MidiMessage::NoteOn {
                key: data_field("pitch", *pitch)?,
                vel: data_field("velocity", *velocity)?,
            },
        },
        EventKind::NoteOff { channel, pitch, velocity } => TrackEventKind::Midi {
            channel: channel_field(*channel)?,
            message: MidiMessage::NoteOff {
                key: data_field("pitch", *pitch)?,
                vel: data_field("velocity", *velocity)?,
            },
        },
        EventKind::ProgramChange { channel, program } => TrackEventKind::Midi {
            channel: channel_field(*channel)?,
            message: MidiMessage::ProgramChange { program: data_field("program", *program)? },
        },
        EventKind::SetTempo { micros_per_quarter } => {
            let micros = fit("tempo", u64::from(*micros_per_quarter), 24)? as u32;
            TrackEventKind::Meta(MetaMessage::Tempo(u24::new(micros)))
        }
        EventKind::EndOfTrack => TrackEventKind::Meta(MetaMessage::EndOfTrack),
        EventKind::Other { data } if data.first() == Some(&SYSEX_MARKER) => TrackEventKind::SysEx(&data[1..]),
        EventKind::Other { data } => match LiveEvent::parse(data) {
            Ok(LiveEvent::Midi { channel, message }) => TrackEventKind::Midi { channel, message },
            _ => return Err(ServiceError::Midi(format!("cannot export raw event {data:02X?}"))),
        },
        EventKind::Unsupported { description } => {
            return Err(ServiceError::Midi(format!("cannot export unsupported event: {description}")));
        }
    };
    Ok(exported)
}
