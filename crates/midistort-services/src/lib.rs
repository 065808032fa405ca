//! midistort-services: File formats, run configuration and the augmentation pipeline

pub mod alignment_file;
pub mod augment;
pub mod config;
mod error;
pub mod midi_file;

pub use alignment_file::{load_alignment, save_alignment};
pub use augment::{Augmented, Augmenter};
pub use config::{load_run_config, RunConfig, StageConfig};
pub use error::{Result, ServiceError};
pub use midi_file::{load_pattern, pattern_from_smf, pattern_to_smf, save_pattern};
