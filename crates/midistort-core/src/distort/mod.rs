//! Randomized distortions of patterns
//!
//! Every distorter works on a copy: [`Distort::distort`] clones the input,
//! stamps reference time, lets the distorter rewrite event fields, re-sorts
//! and stamps candidate time.

mod program;
mod tempo_walk;
mod time_noise;
mod velocity_noise;
mod velocity_walk;

pub use program::ProgramDistorter;
pub use tempo_walk::{TempoWalk, TickBound};
pub use time_noise::TimeNoise;
pub use velocity_noise::VelocityNoise;
pub use velocity_walk::VelocityWalk;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MidistortError, Result};
use crate::noise::NoiseSource;
use crate::pattern::Pattern;
use crate::timing::{CANDIDATE_TIME, REFERENCE_TIME};

/// Value of a randomization option
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Choices(Vec<f64>),
}

/// Option name to bound, e.g. `min_sigma = 0.0`, `max_sigma = 5.0`.
/// Options left out fall back to each distorter's defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RandomizeParams(BTreeMap<String, ParamValue>);

impl RandomizeParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: f64) -> Self {
        self.0.insert(name.to_string(), ParamValue::Number(value));
        self
    }

    pub fn with_choices(mut self, name: &str, choices: Vec<f64>) -> Self {
        self.0.insert(name.to_string(), ParamValue::Choices(choices));
        self
    }

    pub fn number_or(&self, name: &str, default: f64) -> Result<f64> {
        match self.0.get(name) {
            None => Ok(default),
            Some(ParamValue::Number(v)) => Ok(*v),
            Some(ParamValue::Choices(_)) => Err(MidistortError::InvalidParam(name.to_string())),
        }
    }

    pub fn choices_or(&self, name: &str, default: &[f64]) -> Result<Vec<f64>> {
        match self.0.get(name) {
            None => Ok(default.to_vec()),
            Some(ParamValue::Choices(v)) => Ok(v.clone()),
            Some(ParamValue::Number(_)) => Err(MidistortError::InvalidParam(name.to_string())),
        }
    }

    /// sigma ~ U(min_sigma, max_sigma)
    pub(crate) fn sample_sigma(&self, noise: &mut NoiseSource, lo: f64, hi: f64) -> Result<f64> {
        let lo = self.number_or("min_sigma", lo)?;
        let hi = self.number_or("max_sigma", hi)?;
        noise.uniform("min_sigma/max_sigma", lo, hi)
    }

    /// Two draws from U(min, max), returned sorted
    pub(crate) fn sample_bounds(&self, noise: &mut NoiseSource, lo: f64, hi: f64) -> Result<(f64, f64)> {
        let lo = self.number_or("min", lo)?;
        let hi = self.number_or("max", hi)?;
        if lo >= hi {
            return Err(MidistortError::DegenerateConfig { option: "min/max".into(), min: lo, max: hi });
        }
        let a = noise.uniform("min/max", lo, hi)?;
        let b = noise.uniform("min/max", lo, hi)?;
        Ok((a.min(b), a.max(b)))
    }
}

/// A randomized field-level transform of a pattern
pub trait Distorter: fmt::Display {
    fn name(&self) -> &str;

    /// Sample this distorter's parameters from `params`
    fn randomize(&mut self, params: &RandomizeParams, noise: &mut NoiseSource) -> Result<()>;

    /// Rewrite `target`, a relative-tick copy of `source`, in place
    fn transform(&self, source: &Pattern, target: &mut Pattern, noise: &mut NoiseSource) -> Result<()>;
}

/// The distortion procedure shared by every [`Distorter`]
pub trait Distort {
    /// Distort a copy of `pattern`.
    ///
    /// Unless `keep_stamps` is set, attributes are reset and reference time is
    /// stamped under `t0` first. Candidate time is always restamped under `t`.
    fn distort(&self, pattern: &Pattern, keep_stamps: bool, noise: &mut NoiseSource) -> Result<Pattern>;
}

impl<D: Distorter + ?Sized> Distort for D {
    fn distort(&self, pattern: &Pattern, keep_stamps: bool, noise: &mut NoiseSource) -> Result<Pattern> {
        let mut distorted = pattern.try_clone()?;
        distorted.to_relative_ticks();
        if !keep_stamps {
            distorted.init_attributes();
            distorted.stamp_time(REFERENCE_TIME, None)?;
        }
        self.transform(pattern, &mut distorted, noise)?;
        distorted.sort_all();
        distorted.stamp_time(CANDIDATE_TIME, None)?;

        debug!(
            distorter = %self,
            tracks = distorted.tracks.len(),
            events = distorted.event_count(),
            "Applied distortion"
        );
        Ok(distorted)
    }
}

/// Implements the `Distorter` trait for structs providing `randomize_impl`
/// and `transform_impl`. Listing fields also implements `Display` as
/// `DisplayName(field=1.00, ...)`; without them the struct brings its own.
/// Usage: `impl_distorter!(StructName, "DisplayName", field, ...);`
macro_rules! impl_distorter {
    ($ty:ty, $name:expr) => {
        impl $crate::distort::Distorter for $ty {
            fn name(&self) -> &str { $name }

            fn randomize(
                &mut self,
                params: &$crate::distort::RandomizeParams,
                noise: &mut $crate::noise::NoiseSource,
            ) -> $crate::error::Result<()> {
                self.randomize_impl(params, noise)
            }

            fn transform(
                &self,
                source: &$crate::pattern::Pattern,
                target: &mut $crate::pattern::Pattern,
                noise: &mut $crate::noise::NoiseSource,
            ) -> $crate::error::Result<()> {
                self.transform_impl(source, target, noise)
            }
        }
    };
    ($ty:ty, $name:expr, $($field:ident),+) => {
        $crate::distort::impl_distorter!($ty, $name);

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let fields: &[(&str, f64)] = &[$((stringify!($field), f64::from(self.$field))),+];
                write!(f, "{}(", $name)?;
                for (i, (key, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}={value:.2}")?;
                }
                write!(f, ")")
            }
        }
    };
}

pub(crate) use impl_distorter;

/// Round and saturate a velocity to the sounding range
pub(crate) fn clamp_velocity(value: f64) -> u8 {
    value.round().clamp(1.0, 127.0) as u8
}

/// Enum wrapper for all distorters, as listed in run configurations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Distortion {
    VelocityNoise(VelocityNoise),
    VelocityWalk(VelocityWalk),
    Program(ProgramDistorter),
    TempoWalk(TempoWalk),
    TimeNoise(TimeNoise),
}

impl Distortion {
    /// Distorter with default parameters for a configuration `kind`
    pub fn from_kind(kind: &str) -> Option<Self> {
        match kind {
            "velocity_noise" => Some(Self::VelocityNoise(VelocityNoise::default())),
            "velocity_walk" => Some(Self::VelocityWalk(VelocityWalk::default())),
            "program" => Some(Self::Program(ProgramDistorter::default())),
            "tempo_walk" => Some(Self::TempoWalk(TempoWalk::default())),
            "time_noise" => Some(Self::TimeNoise(TimeNoise::default())),
            _ => None,
        }
    }

    fn inner(&self) -> &dyn Distorter {
        match self {
            Self::VelocityNoise(d) => d,
            Self::VelocityWalk(d) => d,
            Self::Program(d) => d,
            Self::TempoWalk(d) => d,
            Self::TimeNoise(d) => d,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Distorter {
        match self {
            Self::VelocityNoise(d) => d,
            Self::VelocityWalk(d) => d,
            Self::Program(d) => d,
            Self::TempoWalk(d) => d,
            Self::TimeNoise(d) => d,
        }
    }
}

impl Distorter for Distortion {
    fn name(&self) -> &str {
        self.inner().name()
    }

    fn randomize(&mut self, params: &RandomizeParams, noise: &mut NoiseSource) -> Result<()> {
        self.inner_mut().randomize(params, noise)
    }

    fn transform(&self, source: &Pattern, target: &mut Pattern, noise: &mut NoiseSource) -> Result<()> {
        self.inner().transform(source, target, noise)
    }
}

impl fmt::Display for Distortion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.inner(), f)
    }
}

/// Tempo walk followed by time noise, each randomized with default bounds
pub fn default_chain(noise: &mut NoiseSource) -> Result<Vec<Distortion>> {
    let mut chain = vec![
        Distortion::TempoWalk(TempoWalk::default()),
        Distortion::TimeNoise(TimeNoise::default()),
    ];
    let defaults = RandomizeParams::new();
    for distorter in &mut chain {
        distorter.randomize(&defaults, noise)?;
    }
    Ok(chain)
}

/// Apply `distorters` in order, each to the previous one's output.
///
/// Only the first stage resets the reference stamps, so `t0` on the result
/// still refers to `pattern` while `t` reflects the whole chain. An empty
/// list runs [`default_chain`].
pub fn apply_chain(pattern: &Pattern, distorters: &[&dyn Distorter], noise: &mut NoiseSource) -> Result<Pattern> {
    if distorters.is_empty() {
        let chain = default_chain(noise)?;
        let stages: Vec<&dyn Distorter> = chain.iter().map(|d| d as &dyn Distorter).collect();
        return apply_chain(pattern, &stages, noise);
    }

    let mut current = distorters[0].distort(pattern, false, noise)?;
    for distorter in &distorters[1..] {
        current = distorter.distort(&current, true, noise)?;
    }
    Ok(current)
}

/// Ordered list of distortions applied as one chain
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistortionChain {
    pub stages: Vec<Distortion>,
}

impl DistortionChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, distortion: Distortion) {
        self.stages.push(distortion);
    }

    pub fn remove(&mut self, index: usize) -> Option<Distortion> {
        if index < self.stages.len() {
            return Some(self.stages.remove(index));
        }
        None
    }

    pub fn randomize_all(&mut self, params: &RandomizeParams, noise: &mut NoiseSource) -> Result<()> {
        for stage in &mut self.stages {
            stage.randomize(params, noise)?;
        }
        Ok(())
    }

    /// Run the chain; an empty chain runs the default one
    pub fn apply(&self, pattern: &Pattern, noise: &mut NoiseSource) -> Result<Pattern> {
        let stages: Vec<&dyn Distorter> = self.stages.iter().map(|d| d as &dyn Distorter).collect();
        apply_chain(pattern, &stages, noise)
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::event::Event;
    use crate::pattern::{Pattern, Track};

    /// Two tracks at 96 ticks per quarter, no note-on at tick zero
    pub fn melody() -> Pattern {
        let lead = Track::from_events([
            Event::tempo(0, 100.0),
            Event::program_change(0, 0, 5),
            Event::note_on(24, 0, 60, 90),
            Event::note_on(0, 0, 64, 80),
            Event::note_off(96, 0, 60),
            Event::note_off(0, 0, 64),
            Event::note_on(48, 0, 67, 127),
            Event::note_on(96, 0, 67, 0),
            Event::end_of_track(0),
        ]);
        let bass = Track::from_events([
            Event::program_change(0, 1, 33),
            Event::note_on(48, 1, 36, 70),
            Event::note_off(192, 1, 36),
            Event::note_on(0, 1, 38, 1),
            Event::note_off(96, 1, 38),
            Event::end_of_track(24),
        ]);
        Pattern::with_tracks(vec![lead, bass], 96, 1, true)
    }
}
