//! Augmentation pipeline: simplify, distort, align

use std::path::{Path, PathBuf};

use midistort_core::{align_frame_to_frame, NoiseSource, Pattern, CANDIDATE_TIME};
use tracing::{debug, info};

use crate::alignment_file::save_alignment;
use crate::config::RunConfig;
use crate::error::Result;
use crate::midi_file::{load_pattern, save_pattern};

/// A distorted pattern with its alignment to the original
#[derive(Debug)]
pub struct Augmented {
    pub pattern: Pattern,
    pub alignment: Vec<i64>,
    /// Alignment window length in seconds
    pub stride: f64,
}

/// Produces distorted variants of patterns according to a [`RunConfig`]
pub struct Augmenter {
    config: RunConfig,
    noise: NoiseSource,
}

impl Augmenter {
    pub fn new(config: RunConfig) -> Self {
        let noise = config.seed.map_or_else(NoiseSource::new, NoiseSource::seeded);
        Self { config, noise }
    }

    /// One variant of `pattern`; the chain is re-randomized on every call
    pub fn augment(&mut self, pattern: &Pattern) -> Result<Augmented> {
        self.config.validate()?;
        let simple = pattern.simplified(self.config.fixed_bpm)?;
        let chain = self.config.build_chain(&mut self.noise)?;
        let distorted = chain.apply(&simple, &mut self.noise)?;
        let alignment = align_frame_to_frame(&distorted, self.config.stride)?;

        let duration = distorted
            .tracks
            .iter()
            .flat_map(|t| t.iter())
            .filter_map(|e| e.attribute(CANDIDATE_TIME))
            .fold(0.0, f64::max);
        debug!(
            stages = chain.len(),
            events = distorted.event_count(),
            duration_secs = duration,
            windows = alignment.len(),
            "Augmented pattern"
        );
        Ok(Augmented { pattern: distorted, alignment, stride: self.config.stride })
    }

    /// Write `count` variants of the MIDI file at `input` into `out_dir`.
    ///
    /// Produces `<stem>_ref.mid` (the simplified original the alignments refer
    /// to) plus `<stem>_NNN.mid` and `<stem>_NNN.align` per variant. Returns
    /// the variant MIDI paths.
    pub fn augment_file(&mut self, input: &Path, out_dir: &Path, count: usize) -> Result<Vec<PathBuf>> {
        self.config.validate()?;
        let pattern = load_pattern(input)?;
        let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("pattern");
        std::fs::create_dir_all(out_dir)?;

        let reference = pattern.simplified(self.config.fixed_bpm)?;
        save_pattern(&reference, &out_dir.join(format!("{stem}_ref.mid")))?;

        let mut written = Vec::with_capacity(count);
        for index in 0..count {
            let augmented = self.augment(&pattern)?;
            let midi_path = out_dir.join(format!("{stem}_{index:03}.mid"));
            save_pattern(&augmented.pattern, &midi_path)?;
            save_alignment(&midi_path.with_extension("align"), &augmented.alignment, augmented.stride)?;
            written.push(midi_path);
        }
        info!(input = %input.display(), out_dir = %out_dir.display(), count, "Augmentation finished");
        Ok(written)
    }
}
