//! Patterns: tracks of events paired with their attribute maps

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{MidistortError, Result};
use crate::event::Event;

/// Per-event labelled values, e.g. timestamps in seconds
pub type Attributes = BTreeMap<String, f64>;

/// An event together with its attribute map.
///
/// Tracks only ever move these as a unit, so reordering can never pair an
/// event with another event's attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedEvent {
    pub event: Event,
    #[serde(default)]
    pub attributes: Attributes,
}

impl TimedEvent {
    pub fn new(event: Event) -> Self {
        Self { event, attributes: Attributes::new() }
    }

    pub fn attribute(&self, label: &str) -> Option<f64> {
        self.attributes.get(label).copied()
    }
}

/// Ordered sequence of events
#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Track {
    entries: Vec<TimedEvent>,
}

impl Track {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_events(events: impl IntoIterator<Item = Event>) -> Self {
        Self { entries: events.into_iter().map(TimedEvent::new).collect() }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(&mut self, event: Event) {
        self.entries.push(TimedEvent::new(event));
    }

    pub fn insert(&mut self, index: usize, event: Event) {
        self.entries.insert(index, TimedEvent::new(event));
    }

    pub fn get(&self, index: usize) -> Option<&TimedEvent> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TimedEvent> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, TimedEvent> {
        self.entries.iter_mut()
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.entries.iter().map(|e| &e.event)
    }

    pub fn events_mut(&mut self) -> impl Iterator<Item = &mut Event> {
        self.entries.iter_mut().map(|e| &mut e.event)
    }

    pub fn attributes(&self) -> impl Iterator<Item = &Attributes> {
        self.entries.iter().map(|e| &e.attributes)
    }

    /// Remove matching events from a relative-tick track. The delta of a
    /// removed event carries into the next kept one, so positions hold.
    pub fn remove_relative(&mut self, mut remove: impl FnMut(&Event) -> bool) {
        let mut carry = 0u64;
        self.entries.retain_mut(|e| {
            if remove(&e.event) {
                carry += e.event.tick;
                return false;
            }
            e.event.tick += carry;
            carry = 0;
            true
        });
    }

    /// Stable sort by tick; ties keep their stored order
    pub(crate) fn sort_by_tick(&mut self) {
        self.entries.sort_by_key(|e| e.event.tick);
    }

    fn into_entries(self) -> Vec<TimedEvent> {
        self.entries
    }

    fn from_entries(entries: Vec<TimedEvent>) -> Self {
        Self { entries }
    }

    fn try_clone(&self) -> Result<Self> {
        let entries = self
            .entries
            .iter()
            .map(|e| {
                Ok(TimedEvent { event: e.event.try_clone()?, attributes: e.attributes.clone() })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { entries })
    }

    fn make_absolute(&mut self) {
        let mut position = 0u64;
        for entry in &mut self.entries {
            position += entry.event.tick;
            entry.event.tick = position;
        }
    }

    fn make_relative(&mut self) {
        let mut previous = 0u64;
        for entry in &mut self.entries {
            let position = entry.event.tick;
            if position < previous {
                warn!(position, previous, "Out-of-order absolute tick, clamping delta to 0");
            }
            entry.event.tick = position.saturating_sub(previous);
            previous = previous.max(position);
        }
    }
}

impl<'a> IntoIterator for &'a Track {
    type Item = &'a TimedEvent;
    type IntoIter = std::slice::Iter<'a, TimedEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a mut Track {
    type Item = &'a mut TimedEvent;
    type IntoIter = std::slice::IterMut<'a, TimedEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter_mut()
    }
}

/// A multi-track event sequence sharing one resolution and tick mode.
///
/// Deliberately not `Clone`: copies go through [`Pattern::try_clone`], which
/// refuses events that cannot be reproduced.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub tracks: Vec<Track>,
    /// Ticks per quarter note
    pub resolution: u16,
    /// Standard MIDI File format (0, 1 or 2)
    pub format: u16,
    tick_relative: bool,
}

impl Pattern {
    /// Empty pattern in relative tick mode
    pub fn new(resolution: u16, format: u16) -> Self {
        Self { tracks: Vec::new(), resolution, format, tick_relative: true }
    }

    pub fn with_tracks(tracks: Vec<Track>, resolution: u16, format: u16, tick_relative: bool) -> Self {
        Self { tracks, resolution, format, tick_relative }
    }

    pub fn is_tick_relative(&self) -> bool {
        self.tick_relative
    }

    pub fn event_count(&self) -> usize {
        self.tracks.iter().map(Track::len).sum()
    }

    /// Deep copy, attributes included
    pub fn try_clone(&self) -> Result<Self> {
        let tracks = self.tracks.iter().map(Track::try_clone).collect::<Result<Vec<_>>>()?;
        Ok(Self { tracks, ..*self })
    }

    pub fn to_absolute_ticks(&mut self) {
        if !self.tick_relative {
            return;
        }
        self.tracks.iter_mut().for_each(Track::make_absolute);
        self.tick_relative = false;
    }

    pub fn to_relative_ticks(&mut self) {
        if self.tick_relative {
            return;
        }
        self.tracks.iter_mut().for_each(Track::make_relative);
        self.tick_relative = true;
    }

    pub fn clear_tracks(&mut self) -> &mut Self {
        self.tracks.clear();
        self
    }

    /// Reset every event's attribute map to empty
    pub fn init_attributes(&mut self) {
        for entry in self.tracks.iter_mut().flat_map(|t| t.iter_mut()) {
            entry.attributes.clear();
        }
    }

    /// Replace every tempo change with a single one at the start of the first track
    pub fn fix_bpm(&mut self, bpm: f64) -> Result<()> {
        if !(bpm.is_finite() && bpm > 0.0) {
            return Err(MidistortError::InvalidTempo(bpm));
        }
        if !self.tick_relative {
            return Err(MidistortError::AbsoluteTicks);
        }
        for track in &mut self.tracks {
            track.remove_relative(Event::is_tempo);
        }
        if self.tracks.is_empty() {
            self.tracks.push(Track::new());
        }
        self.tracks[0].insert(0, Event::tempo(0, bpm));
        Ok(())
    }

    /// Merge all tracks into one, keeping only notes, program changes, tempo
    /// changes (unless `fixed_bpm` is given) and the last end-of-track event.
    pub fn simplified(&self, fixed_bpm: Option<f64>) -> Result<Self> {
        let mut merged = self.try_clone()?;
        merged.to_absolute_ticks();
        let mut entries: Vec<TimedEvent> =
            merged.tracks.drain(..).flat_map(Track::into_entries).collect();
        entries.sort_by_key(|e| e.event.tick);

        let end_of_track = entries
            .iter()
            .filter(|e| e.event.is_end_of_track())
            .max_by_key(|e| e.event.tick)
            .cloned()
            .ok_or(MidistortError::MissingEndOfTrack)?;

        entries.retain(|e| {
            e.event.is_note()
                || e.event.is_program_change()
                || (e.event.is_tempo() && fixed_bpm.is_none())
        });
        entries.push(end_of_track);

        merged.tracks.push(Track::from_entries(entries));
        merged.format = 0;
        merged.to_relative_ticks();
        if let Some(bpm) = fixed_bpm {
            merged.fix_bpm(bpm)?;
        }
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;

    fn two_track_pattern() -> Pattern {
        let lead = Track::from_events([
            Event::tempo(0, 100.0),
            Event::note_on(0, 0, 60, 90),
            Event::note_on(96, 0, 60, 0),
            Event::note_on(0, 0, 62, 80),
            Event::note_off(48, 0, 62),
            Event::end_of_track(10),
        ]);
        let bass = Track::from_events([
            Event::program_change(0, 1, 33),
            Event::note_on(24, 1, 36, 70),
            Event::new(0, EventKind::Other { data: vec![0xB1, 7, 100] }),
            Event::note_off(120, 1, 36),
            Event::end_of_track(0),
        ]);
        Pattern::with_tracks(vec![lead, bass], 96, 1, true)
    }

    fn ticks(track: &Track) -> Vec<u64> {
        track.events().map(|e| e.tick).collect()
    }

    #[test]
    fn test_tick_conversion_round_trip() {
        let mut pattern = two_track_pattern();
        let before: Vec<Vec<u64>> = pattern.tracks.iter().map(ticks).collect();

        pattern.to_absolute_ticks();
        assert!(!pattern.is_tick_relative());
        assert_eq!(ticks(&pattern.tracks[0]), vec![0, 0, 96, 96, 144, 154]);
        assert_eq!(ticks(&pattern.tracks[1]), vec![0, 24, 24, 144, 144]);

        pattern.to_relative_ticks();
        let after: Vec<Vec<u64>> = pattern.tracks.iter().map(ticks).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_conversions_are_idempotent() {
        let mut pattern = two_track_pattern();
        pattern.to_relative_ticks();
        assert_eq!(ticks(&pattern.tracks[0]), vec![0, 0, 96, 0, 48, 10]);

        pattern.to_absolute_ticks();
        pattern.to_absolute_ticks();
        assert_eq!(ticks(&pattern.tracks[0]), vec![0, 0, 96, 96, 144, 154]);
    }

    #[test]
    fn test_clone_is_deep() {
        let mut pattern = two_track_pattern();
        pattern.tracks[0].iter_mut().next().unwrap().attributes.insert("t0".into(), 1.5);

        let mut copy = pattern.try_clone().unwrap();
        assert_eq!(copy, pattern);

        copy.tracks[0].events_mut().nth(1).unwrap().set_velocity(1);
        assert_eq!(pattern.tracks[0].get(1).unwrap().event.velocity(), Some(90));
        assert_eq!(copy.tracks[0].get(0).unwrap().attribute("t0"), Some(1.5));
    }

    #[test]
    fn test_clone_fails_on_unsupported_event() {
        let mut pattern = two_track_pattern();
        pattern.tracks[1].push(Event::new(0, EventKind::Unsupported { description: "escape".into() }));
        assert!(matches!(pattern.try_clone(), Err(MidistortError::Clone(_))));
    }

    #[test]
    fn test_init_attributes_clears_every_map() {
        let mut pattern = two_track_pattern();
        for entry in pattern.tracks.iter_mut().flat_map(|t| t.iter_mut()) {
            entry.attributes.insert("t".into(), 2.0);
        }
        pattern.init_attributes();
        assert!(pattern.tracks.iter().flat_map(|t| t.attributes()).all(|a| a.is_empty()));
    }

    #[test]
    fn test_clear_tracks() {
        let mut pattern = two_track_pattern();
        assert!(pattern.clear_tracks().tracks.is_empty());
        assert_eq!(pattern.resolution, 96);
    }

    #[test]
    fn test_simplified_merges_into_one_track() {
        let simple = two_track_pattern().simplified(None).unwrap();
        assert_eq!(simple.tracks.len(), 1);
        assert_eq!(simple.format, 0);
        assert!(simple.is_tick_relative());

        let track = &simple.tracks[0];
        // The opaque controller event and the earlier end-of-track are dropped
        assert_eq!(track.len(), 9);
        assert!(track.events().last().unwrap().is_end_of_track());
        assert_eq!(track.events().filter(|e| e.is_end_of_track()).count(), 1);

        let mut absolute = simple;
        absolute.to_absolute_ticks();
        let ticks = ticks(&absolute.tracks[0]);
        assert!(ticks.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*ticks.last().unwrap(), 154);
    }

    #[test]
    fn test_simplified_with_fixed_bpm() {
        let simple = two_track_pattern().simplified(Some(140.0)).unwrap();
        let tempos: Vec<&Event> = simple.tracks[0].events().filter(|e| e.is_tempo()).collect();
        assert_eq!(tempos.len(), 1);
        assert!((tempos[0].bpm().unwrap() - 140.0).abs() < 1e-3);
        assert!(simple.tracks[0].get(0).unwrap().event.is_tempo());
    }

    #[test]
    fn test_simplified_requires_end_of_track() {
        let pattern = Pattern::with_tracks(
            vec![Track::from_events([Event::note_on(0, 0, 60, 90)])],
            96,
            0,
            true,
        );
        assert!(matches!(pattern.simplified(None), Err(MidistortError::MissingEndOfTrack)));
    }

    #[test]
    fn test_fix_bpm_keeps_positions() {
        let mut pattern = Pattern::with_tracks(
            vec![Track::from_events([
                Event::note_on(10, 0, 60, 90),
                Event::tempo(5, 90.0),
                Event::note_off(7, 0, 60),
            ])],
            96,
            0,
            true,
        );
        pattern.fix_bpm(60.0).unwrap();
        assert_eq!(ticks(&pattern.tracks[0]), vec![0, 10, 12]);
        assert_eq!(pattern.tracks[0].events().filter(|e| e.is_tempo()).count(), 1);
    }

    #[test]
    fn test_fix_bpm_requires_relative_ticks() {
        let mut pattern = two_track_pattern();
        pattern.to_absolute_ticks();
        assert!(matches!(pattern.fix_bpm(120.0), Err(MidistortError::AbsoluteTicks)));
    }

    #[test]
    fn test_fix_bpm_rejects_non_positive_tempo() {
        let mut pattern = two_track_pattern();
        for bpm in [0.0, -60.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(pattern.fix_bpm(bpm), Err(MidistortError::InvalidTempo(_))));
        }
        assert!(matches!(pattern.simplified(Some(0.0)), Err(MidistortError::InvalidTempo(_))));
    }
}
