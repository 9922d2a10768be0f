//! Mean squared difference metric.

use burn::tensor::backend::Backend;
use burn::tensor::{ElementConversion, Tensor};
use svrb0_core::image::MultiChannelImage;
use svrb0_core::interpolation::{Interpolator, LinearInterpolator};
use svrb0_core::transform::Transform;
use super::trait_::{Metric, MetricValue, TargetSamples};

/// Mean squared difference over all channels.
///
/// MSD = (1/N) * sum_c sum_x m_c(x) * (Target_c(x) - Source_c(T(x)))^2
///
/// where `m_c(x)` is 1 when the target voxel lies above the target padding
/// and `T(x)` falls inside the source field of view, and `N = sum m_c(x)`.
#[derive(Debug, Clone, Default)]
pub struct MeanSquaredDifference {
    interpolator: LinearInterpolator,
}

impl MeanSquaredDifference {
    /// Create a new metric using trilinear interpolation.
    pub fn new() -> Self {
        Self {
            interpolator: LinearInterpolator::new(),
        }
    }
}

impl<B: Backend> Metric<B> for MeanSquaredDifference {
    fn evaluate(
        &self,
        target: &TargetSamples<B>,
        source: &MultiChannelImage<B>,
        transform: &impl Transform<B, 3>,
    ) -> MetricValue {
        let source_points = transform.transform_points(target.points.clone());
        let source_indices = source.metadata().world_to_index_tensor(source_points);
        let inside = self
            .interpolator
            .support_mask(source.spatial_shape(), source_indices.clone());

        let mut sum = 0.0;
        let mut count = 0.0;
        for (c, channel) in source.channels().into_iter().enumerate() {
            let sampled = self
                .interpolator
                .interpolate(channel.data(), source_indices.clone());
            let fixed: Tensor<B, 1> = target.values.clone().narrow(0, c, 1).squeeze(0);
            let weight: Tensor<B, 1> = target.mask.clone().narrow(0, c, 1).squeeze::<1>(0) * inside.clone();

            let diff = sampled - fixed;
            sum += (diff.clone() * diff * weight.clone())
                .sum()
                .into_scalar()
                .elem::<f64>();
            count += weight.sum().into_scalar().elem::<f64>();
        }

        let samples = count.round() as usize;
        if samples == 0 {
            return MetricValue::no_overlap();
        }
        MetricValue {
            value: sum / count,
            samples,
        }
    }

    fn name(&self) -> &'static str {
        "MeanSquaredDifference"
    }
}
