//! Tempo drift by scaling tick deltas with a bounded random walk

use serde::{Deserialize, Serialize};

use super::{impl_distorter, RandomizeParams};
use crate::error::Result;
use crate::noise::NoiseSource;
use crate::pattern::Pattern;
use crate::walk::{RandomWalk, WalkScope};

/// How a scaled tick delta is bounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickBound {
    /// Zero deltas stay zero so simultaneous events stay together; other
    /// deltas never drop below one tick. The walk bounds already cap growth.
    /// Unlike `Legacy`, this also lifts the lower bound: a zero delta is not
    /// raised to one tick.
    #[default]
    Proportional,
    /// Every delta clamped to [1, 127], for output parity with older data sets
    Legacy,
}

impl TickBound {
    pub fn apply(self, tick: u64, multiple: f64) -> u64 {
        let scaled = (tick as f64 * multiple).round();
        match self {
            Self::Proportional if tick == 0 => 0,
            Self::Proportional => scaled.max(1.0) as u64,
            Self::Legacy => scaled.clamp(1.0, 127.0) as u64,
        }
    }
}

/// Changes tempo without touching tempo events: every tick delta is
/// multiplied by the current value of the walk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempoWalk {
    /// Standard deviation of the walk per quarter note
    pub sigma: f64,
    /// Lowest multiple of the original deltas
    pub min: f64,
    /// Highest multiple of the original deltas
    pub max: f64,
    #[serde(default)]
    pub scope: WalkScope,
    #[serde(default)]
    pub bound: TickBound,
}

impl Default for TempoWalk {
    fn default() -> Self {
        Self { sigma: 0.5, min: 0.5, max: 2.0, scope: WalkScope::Shared, bound: TickBound::Proportional }
    }
}

impl TempoWalk {
    pub fn new(sigma: f64, min: f64, max: f64) -> Self {
        Self { sigma, min, max, ..Self::default() }
    }

    pub fn with_scope(mut self, scope: WalkScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_bound(mut self, bound: TickBound) -> Self {
        self.bound = bound;
        self
    }

    fn randomize_impl(&mut self, params: &RandomizeParams, noise: &mut NoiseSource) -> Result<()> {
        self.sigma = params.sample_sigma(noise, 0.0, 1.0)?;
        (self.min, self.max) = params.sample_bounds(noise, 0.6, 1.5)?;
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
                event.tick = self.bound.apply(event.tick, multiple);
            }
        }
        Ok(())
    }
}

impl_distorter!(TempoWalk, "TempoWalk", sigma, min, max);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distort::fixtures::melody;
    use crate::distort::Distort;
    use crate::event::Event;
    use crate::pattern::Track;
    use crate::timing::{CANDIDATE_TIME, REFERENCE_TIME};

    fn deltas(pattern: &Pattern) -> Vec<u64> {
        pattern.tracks.iter().flat_map(|t| t.events()).map(|e| e.tick).collect()
    }

    #[test]
    fn test_tick_bounds() {
        assert_eq!(TickBound::Proportional.apply(0, 1.7), 0);
        assert_eq!(TickBound::Proportional.apply(1, 0.2), 1);
        assert_eq!(TickBound::Proportional.apply(960, 1.5), 1440);
        assert_eq!(TickBound::Legacy.apply(0, 1.7), 1);
        assert_eq!(TickBound::Legacy.apply(960, 1.5), 127);
    }

    #[test]
    fn test_pinned_walk_stretches_time() {
        let pattern = melody();
        let mut noise = NoiseSource::seeded(12);
        let distorted = TempoWalk::new(1.0, 2.0, 2.0).distort(&pattern, false, &mut noise).unwrap();
        let expected: Vec<u64> = deltas(&pattern).into_iter().map(|t| t * 2).collect();
        assert_eq!(deltas(&distorted), expected);

        for entry in distorted.tracks.iter().flat_map(|t| t.iter()) {
            let t0 = entry.attribute(REFERENCE_TIME).unwrap();
            let t = entry.attribute(CANDIDATE_TIME).unwrap();
            assert!((t - 2.0 * t0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_legacy_bound_caps_deltas() {
        let pattern = melody();
        let mut noise = NoiseSource::seeded(12);
        let distorted = TempoWalk::new(0.3, 0.8, 1.2)
            .with_bound(TickBound::Legacy)
            .distort(&pattern, false, &mut noise)
            .unwrap();
        assert!(deltas(&distorted).iter().all(|&t| t <= 127));
    }

    #[test]
    fn test_chords_stay_together() {
        let pattern = melody();
        let zero_before: Vec<bool> = deltas(&pattern).iter().map(|&t| t == 0).collect();
        let mut noise = NoiseSource::seeded(30);
        let distorted = TempoWalk::new(0.8, 0.6, 1.5).distort(&pattern, false, &mut noise).unwrap();
        let zero_after: Vec<bool> = deltas(&distorted).iter().map(|&t| t == 0).collect();
        assert_eq!(zero_before, zero_after);
    }

    fn second_track() -> Track {
        Track::from_events([Event::note_on(96, 1, 40, 100), Event::note_off(96, 1, 40), Event::end_of_track(0)])
    }

    fn track_deltas(track: &Track) -> Vec<u64> {
        track.events().map(|e| e.tick).collect()
    }

    #[test]
    fn test_shared_walk_carries_into_next_track() {
        // A tiny sigma barely moves the walk within track 1, but over track 0's
        // huge span it drifts far from 1.0
        let long = || Track::from_events([Event::note_on(0, 0, 60, 100), Event::end_of_track(96_000_000_000_000)]);
        let pattern = || Pattern::with_tracks(vec![long(), second_track()], 96, 1, true);
        let walk = TempoWalk::new(0.0001, 0.2, 5.0);

        let shared = walk.distort(&pattern(), false, &mut NoiseSource::seeded(17)).unwrap();
        let per_track = walk
            .clone()
            .with_scope(WalkScope::PerTrack)
            .distort(&pattern(), false, &mut NoiseSource::seeded(17))
            .unwrap();
        let alone = Pattern::with_tracks(vec![second_track()], 96, 1, true);
        let single = walk.distort(&alone, false, &mut NoiseSource::seeded(17)).unwrap();

        assert_eq!(track_deltas(&per_track.tracks[1]), vec![96, 96, 0]);
        assert_eq!(track_deltas(&per_track.tracks[1]), track_deltas(&single.tracks[0]));
        assert_ne!(track_deltas(&shared.tracks[1])[0], 96);
        assert_eq!(shared.tracks[0], per_track.tracks[0]);
    }
}
