//! Metric trait for image similarity measurement.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use svrb0_core::image::{generate_grid_3d, MultiChannelImage};
use svrb0_core::transform::Transform;

/// Objective value together with the number of voxel pairs it averages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricValue {
    /// Dissimilarity; lower is better. Infinite when `samples == 0`.
    pub value: f64,
    /// Number of contributing (target voxel, channel) pairs.
    pub samples: usize,
}

impl MetricValue {
    /// Value for an evaluation without overlap.
    pub fn no_overlap() -> Self {
        Self {
            value: f64::INFINITY,
            samples: 0,
        }
    }

    /// Whether any voxel pair contributed.
    pub fn has_overlap(&self) -> bool {
        self.samples > 0
    }
}

/// Target voxels prepared once per registration.
///
/// World positions of every target voxel, the per-channel intensities in
/// tensor memory order and a mask of the voxels above the target padding.
#[derive(Debug, Clone)]
pub struct TargetSamples<B: Backend> {
    /// World positions `[N, 3]`.
    pub points: Tensor<B, 2>,
    /// Intensities `[C, N]`.
    pub values: Tensor<B, 2>,
    /// 1 where the target voxel takes part, `[C, N]`.
    pub mask: Tensor<B, 2>,
}

impl<B: Backend> TargetSamples<B> {
    /// Sample `target`, excluding voxels whose value is `<= padding`.
    pub fn new(target: &MultiChannelImage<B>, padding: f64) -> Self {
        let device = target.data().device();
        let [c, d, h, w] = target.data().dims();
        let n = d * h * w;

        let indices = generate_grid_3d::<B>([d, h, w], &device);
        let points = target.metadata().index_to_world_tensor(indices);
        let values = target.data().clone().reshape([c, n]);
        let mask = values.clone().greater_elem(padding).float();

        Self { points, values, mask }
    }

    /// Number of channels.
    pub fn num_channels(&self) -> usize {
        self.values.dims()[0]
    }
}

/// Dissimilarity between a prepared target and a source seen through a
/// transform that maps target world positions to source world positions.
pub trait Metric<B: Backend> {
    /// Evaluate the metric.
    fn evaluate(
        &self,
        target: &TargetSamples<B>,
        source: &MultiChannelImage<B>,
        transform: &impl Transform<B, 3>,
    ) -> MetricValue;

    /// Get the name of this metric.
    fn name(&self) -> &'static str;
}
