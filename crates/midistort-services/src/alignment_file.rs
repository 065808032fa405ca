//! Alignment files on disk

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use midistort_core::{read_alignment, write_alignment};
use tracing::info;

use crate::error::Result;

/// Write `align` with its window stride in seconds
pub fn save_alignment(path: &Path, align: &[i64], stride: f64) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    write_alignment(writer, align, stride)?;
    info!(path = %path.display(), windows = align.len(), stride, "Wrote alignment");
    Ok(())
}

/// Read an alignment file back as `(values, stride)`
pub fn load_alignment(path: &Path) -> Result<(Vec<f64>, f64)> {
    let reader = BufReader::new(File::open(path)?);
    Ok(read_alignment(reader)?)
}
