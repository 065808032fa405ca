//! Frame-to-frame alignment of candidate time against reference time
//!
//! Candidate time is cut into windows of `stride` seconds. Each window
//! populated by at least one event is mapped to the truncated mean reference
//! time of its events; empty windows are filled by linear interpolation.

use std::collections::BTreeMap;
use std::io::{BufRead, Write};

use crate::error::{MidistortError, Result};
use crate::pattern::Pattern;
use crate::timing::{CANDIDATE_TIME, REFERENCE_TIME};

/// Reference times collected per candidate window index
pub fn collect_windows(pattern: &Pattern, stride: f64) -> Result<BTreeMap<usize, Vec<f64>>> {
    if !stride.is_finite() || stride <= 0.0 {
        return Err(MidistortError::InvalidStride(stride));
    }
    let mut windows: BTreeMap<usize, Vec<f64>> = BTreeMap::new();
    for (track_idx, track) in pattern.tracks.iter().enumerate() {
        for (event_idx, entry) in track.iter().enumerate() {
            let missing = |label: &str| MidistortError::MissingAttribute {
                label: label.to_string(),
                track: track_idx,
                event: event_idx,
            };
            let candidate = entry.attribute(CANDIDATE_TIME).ok_or_else(|| missing(CANDIDATE_TIME))?;
            let reference = entry.attribute(REFERENCE_TIME).ok_or_else(|| missing(REFERENCE_TIME))?;
            let index = (candidate / stride).floor().max(0.0) as usize;
            windows.entry(index).or_default().push(reference);
        }
    }
    Ok(windows)
}

/// Truncated mean of each populated window
pub fn window_targets(windows: &BTreeMap<usize, Vec<f64>>) -> Result<BTreeMap<usize, i64>> {
    windows
        .iter()
        .map(|(&index, values)| {
            if values.is_empty() {
                return Err(MidistortError::EmptyWindow(index));
            }
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            Ok((index, mean.trunc() as i64))
        })
        .collect()
}

/// Expand populated window targets to one value per window index, starting
/// from 0 before the first populated window.
///
/// Gaps are filled by linear interpolation between neighbouring targets,
/// truncated to integers. Decreasing targets are interpolated as they are.
pub fn fill_alignment(targets: &BTreeMap<usize, i64>) -> Vec<i64> {
    let mut align: Vec<i64> = Vec::with_capacity(targets.keys().last().map_or(0, |&i| i + 1));
    let mut last = 0.0f64;
    for (&index, &target) in targets {
        let points = index + 2 - align.len();
        let target = target as f64;
        align.extend(linspace(last, target, points).skip(1).map(|v| v.trunc() as i64));
        last = target;
    }
    align
}

/// Map every candidate window to an estimated reference time index.
///
/// Every event must carry both `t0` and `t` stamps, as left by a distortion.
pub fn align_frame_to_frame(pattern: &Pattern, stride: f64) -> Result<Vec<i64>> {
    let windows = collect_windows(pattern, stride)?;
    if windows.is_empty() {
        return Err(MidistortError::EmptyAlignment);
    }
    let targets = window_targets(&windows)?;
    Ok(fill_alignment(&targets))
}

/// `count` evenly spaced points from `start` to `stop`, both included
fn linspace(start: f64, stop: f64, count: usize) -> impl Iterator<Item = f64> {
    let step = if count > 1 { (stop - start) / (count - 1) as f64 } else { 0.0 };
    (0..count).map(move |i| if i + 1 == count && count > 1 { stop } else { start + i as f64 * step })
}

/// Write the stride on the first line, then one alignment value per line
pub fn write_alignment<W: Write>(mut writer: W, align: &[i64], stride: f64) -> Result<()> {
    writeln!(writer, "{stride}")?;
    let body = align.iter().map(i64::to_string).collect::<Vec<_>>().join("\n");
    writer.write_all(body.as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Inverse of [`write_alignment`]: returns `(values, stride)`
pub fn read_alignment<R: BufRead>(reader: R) -> Result<(Vec<f64>, f64)> {
    let mut numbers = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let text = line.trim();
        let value = text
            .parse::<f64>()
            .map_err(|_| MidistortError::Parse { line: idx + 1, text: text.to_string() })?;
        numbers.push(value);
    }
    if numbers.is_empty() {
        return Err(MidistortError::Parse { line: 1, text: String::new() });
    }
    let stride = numbers.remove(0);
    Ok((numbers, stride))
}
