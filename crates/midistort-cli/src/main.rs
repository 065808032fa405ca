//! midistort: write distorted, aligned variants of a MIDI file
//!
//! Usage:
//!   midistort <input.mid> [--out DIR] [--count N] [--config run.toml]
//!     [--seed N] [--stride SECS] [--bpm BPM]
//!
//! Flags override the values read from `--config`.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use midistort_services::{load_run_config, Augmenter, RunConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "usage: midistort <input.mid> [--out DIR] [--count N] [--config FILE] \
                     [--seed N] [--stride SECS] [--bpm BPM]";

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("midistort=debug".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let Some(input) = args.get(1).filter(|s| !s.starts_with("--")) else {
        bail!(USAGE);
    };
    let input = PathBuf::from(input);

    let mut config = match parse_flag::<PathBuf>(&args, "--config")? {
        Some(path) => load_run_config(&path).with_context(|| format!("loading {}", path.display()))?,
        None => RunConfig::default(),
    };
    if let Some(seed) = parse_flag(&args, "--seed")? {
        config.seed = Some(seed);
    }
    if let Some(stride) = parse_flag(&args, "--stride")? {
        config.stride = stride;
    }
    if let Some(bpm) = parse_flag(&args, "--bpm")? {
        config.fixed_bpm = Some(bpm);
    }
    let count: usize = parse_flag(&args, "--count")?.unwrap_or(1);
    let out_dir: PathBuf = parse_flag(&args, "--out")?.unwrap_or_else(|| PathBuf::from("augmented"));

    tracing::info!(input = %input.display(), count, seed = ?config.seed, "Starting midistort");

    let written = Augmenter::new(config)
        .augment_file(&input, &out_dir, count)
        .with_context(|| format!("augmenting {}", input.display()))?;
    for path in written {
        println!("{}", path.display());
    }
    Ok(())
}

/// Value following `flag`, parsed; `None` when the flag is absent
fn parse_flag<T>(args: &[String], flag: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(pos) = args.iter().position(|a| a == flag) else {
        return Ok(None);
    };
    let Some(raw) = args.get(pos + 1) else {
        bail!("{flag} needs a value\n{USAGE}");
    };
    match raw.parse() {
        Ok(value) => Ok(Some(value)),
        Err(e) => bail!("invalid value '{raw}' for {flag}: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_flag() {
        let a = args(&["midistort", "in.mid", "--count", "4", "--stride", "0.1"]);
        assert_eq!(parse_flag::<usize>(&a, "--count").unwrap(), Some(4));
        assert_eq!(parse_flag::<f64>(&a, "--stride").unwrap(), Some(0.1));
        assert_eq!(parse_flag::<u64>(&a, "--seed").unwrap(), None);
    }

    #[test]
    fn test_parse_flag_errors() {
        assert!(parse_flag::<usize>(&args(&["midistort", "--count"]), "--count").is_err());
        assert!(parse_flag::<usize>(&args(&["midistort", "--count", "many"]), "--count").is_err());
    }
}
