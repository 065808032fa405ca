//! midistort-core: Randomized distortion of MIDI event sequences and
//! alignment of distorted time back to the original

pub mod align;
pub mod distort;
mod error;
pub mod event;
pub mod noise;
pub mod pattern;
mod sort;
pub mod timing;
pub mod walk;

pub use align::{align_frame_to_frame, read_alignment, write_alignment};
pub use distort::{apply_chain, default_chain, Distort, Distorter, Distortion, DistortionChain};
pub use distort::{ParamValue, RandomizeParams};
pub use distort::{ProgramDistorter, TempoWalk, TickBound, TimeNoise, VelocityNoise, VelocityWalk};
pub use error::{MidistortError, Result};
pub use event::{Event, EventKind};
pub use noise::NoiseSource;
pub use pattern::{Attributes, Pattern, TimedEvent, Track};
pub use timing::{CANDIDATE_TIME, DEFAULT_BPM, REFERENCE_TIME};
pub use walk::{RandomWalk, WalkScope};
