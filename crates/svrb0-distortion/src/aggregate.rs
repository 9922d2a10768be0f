//! Volume aggregation: resample several stacks onto one grid and stack them
//! as channels.
//!
//! Stacks are assumed to share (nearly) the same geometry; resampling is
//! nearest neighbour with an identity transform, so aggregating stacks that
//! already sit on the reference grid reproduces their voxels exactly.

use burn::tensor::backend::Backend;
use svrb0_core::filter::ResampleImageFilter;
use svrb0_core::image::{Image, MultiChannelImage};
use svrb0_core::interpolation::NearestNeighborInterpolator;
use svrb0_core::transform::RigidTransform;
use crate::config::DistortionConfig;
use crate::error::{DistortionError, Result};

/// Resamples stacks onto a reference grid and thresholds out interpolation
/// noise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeAggregator {
    threshold: f64,
    target_padding: f64,
    source_padding: f64,
}

impl VolumeAggregator {
    /// Aggregator keeping values strictly above `threshold`.
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            target_padding: -1.0,
            source_padding: 0.0,
        }
    }

    /// Aggregator using the thresholds and paddings of `config`.
    pub fn from_config(config: &DistortionConfig) -> Self {
        Self {
            threshold: config.signal_threshold,
            target_padding: config.correction_target_padding,
            source_padding: config.correction_source_padding,
        }
    }

    /// Signal threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Resample one stack onto the reference grid.
    ///
    /// Reference voxels at or below the target padding stay padding; voxels
    /// the stack does not cover get the source padding.
    pub fn resample<B: Backend>(&self, stack: &Image<B, 3>, reference: &Image<B, 3>) -> Image<B, 3> {
        let identity = RigidTransform::identity();
        ResampleImageFilter::new_from_reference(reference, &identity, NearestNeighborInterpolator::new())
            .with_target_padding(self.target_padding, reference.data().clone())
            .with_source_padding(self.source_padding)
            .apply(stack)
    }

    /// Zero every voxel at or below the threshold.
    pub fn suppress_noise<B: Backend>(&self, image: Image<B, 3>) -> Image<B, 3> {
        let data = image.data().clone();
        let keep = data.clone().greater_elem(self.threshold).float();
        image.with_data(data * keep)
    }

    /// Aggregate `stacks` on the grid of `reference`, channel `i` holding stack `i`.
    pub fn aggregate<B: Backend>(
        &self,
        stacks: &[&Image<B, 3>],
        reference: &Image<B, 3>,
    ) -> Result<MultiChannelImage<B>> {
        if stacks.is_empty() {
            return Err(DistortionError::input("cannot aggregate an empty stack set"));
        }
        let channels = stacks
            .iter()
            .map(|stack| self.suppress_noise(self.resample(stack, reference)).into_data())
            .collect();
        Ok(MultiChannelImage::from_channels(*reference.metadata(), channels))
    }

    /// Aggregate paired acquired and simulated stacks of `members` on the
    /// grid of the first member, so that channel `i` of both outputs belongs
    /// to stack `members[i]`.
    pub fn aggregate_pairs<B: Backend>(
        &self,
        acquired: &[Image<B, 3>],
        simulated: &[Image<B, 3>],
        members: &[usize],
    ) -> Result<(MultiChannelImage<B>, MultiChannelImage<B>)> {
        let Some(&first) = members.first() else {
            return Err(DistortionError::input("acquisition group has no stacks"));
        };
        if acquired.len() != simulated.len() {
            return Err(DistortionError::input(format!(
                "{} acquired stacks but {} simulated",
                acquired.len(),
                simulated.len()
            )));
        }
        if let Some(&bad) = members.iter().find(|&&m| m >= acquired.len()) {
            return Err(DistortionError::input(format!(
                "stack index {} out of range for {} stacks",
                bad,
                acquired.len()
            )));
        }

        let template = &acquired[first];
        let stacks: Vec<&Image<B, 3>> = members.iter().map(|&m| &acquired[m]).collect();
        let sims: Vec<&Image<B, 3>> = members.iter().map(|&m| &simulated[m]).collect();
        Ok((self.aggregate(&stacks, template)?, self.aggregate(&sims, template)?))
    }
}

impl Default for VolumeAggregator {
    fn default() -> Self {
        Self::from_config(&DistortionConfig::new())
    }
}

/// Stack arbitrary volumes as channels on the grid of the first one, keeping
/// strictly positive values only.
pub fn stack_volumes<B: Backend>(stacks: &[Image<B, 3>]) -> Result<MultiChannelImage<B>> {
    let Some(first) = stacks.first() else {
        return Err(DistortionError::input("cannot stack an empty volume set"));
    };
    let refs: Vec<&Image<B, 3>> = stacks.iter().collect();
    VolumeAggregator::new(0.0).aggregate(&refs, first)
}
