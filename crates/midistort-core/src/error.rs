//! Error types for midistort

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MidistortError {
    #[error("Could not clone event: {0}")]
    Clone(String),
    #[error("Degenerate range for '{option}': min {min} must be below max {max}")]
    DegenerateConfig { option: String, min: f64, max: f64 },
    #[error("Option '{0}' has the wrong kind of value")]
    InvalidParam(String),
    #[error("No choices given for '{0}'")]
    EmptyChoice(String),
    #[error("Nothing to align: pattern has no events")]
    EmptyAlignment,
    #[error("Window {0} collected no timestamps")]
    EmptyWindow(usize),
    #[error("Stride must be positive, got {0}")]
    InvalidStride(f64),
    #[error("Event {event} of track {track} has no '{label}' timestamp")]
    MissingAttribute { label: String, track: usize, event: usize },
    #[error("Pattern must use relative ticks")]
    AbsoluteTicks,
    #[error("Tempo must be a positive number of beats per minute, got {0}")]
    InvalidTempo(f64),
    #[error("Resolution must be positive")]
    InvalidResolution,
    #[error("Pattern has no end-of-track event")]
    MissingEndOfTrack,
    #[error("Alignment line {line}: cannot parse '{text}'")]
    Parse { line: usize, text: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MidistortError>;
