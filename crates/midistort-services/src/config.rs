//! TOML run configuration
//!
//! ```toml
//! seed = 7
//! stride = 0.05
//!
//! [[chain]]
//! kind = "tempo_walk"
//! params = { min_sigma = 0.0, max_sigma = 0.5 }
//!
//! [[chain]]
//! kind = "program"
//! params = { instruments = [0, 24, 40] }
//! ```

use std::path::Path;

use midistort_core::{Distorter, Distortion, DistortionChain, NoiseSource, RandomizeParams};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};

fn default_stride() -> f64 {
    0.05
}

/// One distortion stage: its kind and the ranges its parameters are drawn from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    pub kind: String,
    #[serde(default)]
    pub params: RandomizeParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Seed for every random draw; unseeded runs differ each time
    #[serde(default)]
    pub seed: Option<u64>,
    /// Alignment window length in seconds
    #[serde(default = "default_stride")]
    pub stride: f64,
    /// Flatten the tempo to this value while simplifying
    #[serde(default)]
    pub fixed_bpm: Option<f64>,
    /// Empty means tempo walk then time noise with default ranges
    #[serde(default)]
    pub chain: Vec<StageConfig>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self { seed: None, stride: default_stride(), fixed_bpm: None, chain: Vec::new() }
    }
}

impl RunConfig {
    /// Reject strides and fixed tempos no run can use
    pub fn validate(&self) -> Result<()> {
        if !(self.stride.is_finite() && self.stride > 0.0) {
            return Err(ServiceError::Config(format!("stride must be positive, got {}", self.stride)));
        }
        if let Some(bpm) = self.fixed_bpm.filter(|bpm| !(bpm.is_finite() && *bpm > 0.0)) {
            return Err(ServiceError::Config(format!("fixed_bpm must be positive, got {bpm}")));
        }
        Ok(())
    }

    /// Instantiate and randomize every configured stage
    pub fn build_chain(&self, noise: &mut NoiseSource) -> Result<DistortionChain> {
        let mut chain = DistortionChain::new();
        for stage in &self.chain {
            let mut distortion = Distortion::from_kind(&stage.kind)
                .ok_or_else(|| ServiceError::Config(format!("unknown distortion kind '{}'", stage.kind)))?;
            distortion.randomize(&stage.params, noise)?;
            chain.add(distortion);
        }
        Ok(chain)
    }
}

pub fn load_run_config(path: &Path) -> Result<RunConfig> {
    let text = std::fs::read_to_string(path)?;
    let config: RunConfig =
        toml::from_str(&text).map_err(|e| ServiceError::Config(format!("{}: {e}", path.display())))?;
    config.validate()?;
    Ok(config)
}
