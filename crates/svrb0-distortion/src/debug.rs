//! Optional sink for intermediate volumes and fitted transforms.
//!
//! Stages report working data under fixed names (`stacks{iter}-{group}`,
//! `shim{iter}-{group}`, `fmd`, ...). Nothing the pipeline computes depends
//! on what a sink does with them.

use std::path::PathBuf;
use burn::tensor::backend::Backend;
use svrb0_core::image::{Image, MultiChannelImage};
use svrb0_core::transform::SpatialTransform;
use svrb0_io::{write_nifti, write_nifti_4d, write_transform};

/// Something worth inspecting after a run.
#[derive(Debug)]
pub enum DebugArtifact<'a, B: Backend> {
    Volume(&'a Image<B, 3>),
    Aggregate(&'a MultiChannelImage<B>),
    Transform(&'a SpatialTransform),
}

/// Receives named intermediate results.
pub trait DebugSink<B: Backend> {
    /// Record `artifact` under `name`. Failures are the sink's business.
    fn emit(&self, name: &str, artifact: DebugArtifact<'_, B>);

    /// Whether emitting does anything; stages skip building artifacts otherwise.
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl<B: Backend> DebugSink<B> for NullSink {
    fn emit(&self, _name: &str, _artifact: DebugArtifact<'_, B>) {}

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Writes volumes as `<dir>/<name>.nii.gz` and transforms as `<dir>/<name>.json`.
#[derive(Debug, Clone)]
pub struct NiftiDebugSink {
    dir: PathBuf,
}

impl NiftiDebugSink {
    /// Sink writing into `dir`, which must exist.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Output directory.
    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }
}

impl<B: Backend> DebugSink<B> for NiftiDebugSink {
    fn emit(&self, name: &str, artifact: DebugArtifact<'_, B>) {
        let result = match artifact {
            DebugArtifact::Volume(image) => write_nifti(self.dir.join(format!("{name}.nii.gz")), image),
            DebugArtifact::Aggregate(image) => write_nifti_4d(self.dir.join(format!("{name}.nii.gz")), image),
            DebugArtifact::Transform(transform) => write_transform(self.dir.join(format!("{name}.json")), transform),
        };
        if let Err(err) = result {
            tracing::warn!("Failed to write debug artifact {}: {:#}", name, err);
        }
    }
}
