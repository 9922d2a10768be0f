//! JSON persistence of fitted transforms.

use anyhow::{Context, Result};
use svrb0_core::transform::SpatialTransform;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Write a transform as pretty-printed JSON.
pub fn write_transform<P: AsRef<Path>>(path: P, transform: &SpatialTransform) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)
        .with_context(|| format!("Failed to create transform file {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, transform).context("Failed to serialize transform")?;
    writer.flush().context("Failed to flush transform file")?;
    Ok(())
}

/// Read a transform written by [`write_transform`].
pub fn read_transform<P: AsRef<Path>>(path: P) -> Result<SpatialTransform> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open transform file {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse transform file {}", path.display()))
}
