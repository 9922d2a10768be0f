//! Resample image filter.
//!
//! Resamples an image onto a reference grid through a transform that maps
//! output world positions to input world positions.

use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor};
use crate::image::{generate_grid_3d, Image, ImageMetadata};
use crate::interpolation::Interpolator;
use crate::transform::Transform;

/// Resample image filter.
///
/// For every output voxel:
/// * if a target padding is set and the reference value is `<=` it, the
///   output is that padding value;
/// * else if the mapped position lies inside the input's interpolation
///   domain, the interpolated input value;
/// * otherwise the source padding value.
pub struct ResampleImageFilter<'a, B, T, I>
where
    B: Backend,
    T: Transform<B, 3>,
    I: Interpolator<B>,
{
    shape: [usize; 3],
    metadata: ImageMetadata<3>,
    transform: &'a T,
    interpolator: I,
    source_padding: f64,
    target_padding: Option<(f64, Tensor<B, 3>)>,
}

impl<'a, B, T, I> ResampleImageFilter<'a, B, T, I>
where
    B: Backend,
    T: Transform<B, 3>,
    I: Interpolator<B>,
{
    /// Resample onto a grid of tensor shape `shape` with geometry `metadata`.
    pub fn new(shape: [usize; 3], metadata: ImageMetadata<3>, transform: &'a T, interpolator: I) -> Self {
        Self {
            shape,
            metadata,
            transform,
            interpolator,
            source_padding: 0.0,
            target_padding: None,
        }
    }

    /// Resample onto the grid of `reference`.
    pub fn new_from_reference(reference: &Image<B, 3>, transform: &'a T, interpolator: I) -> Self {
        Self::new(reference.shape(), *reference.metadata(), transform, interpolator)
    }

    /// Value written where the input has no coverage.
    pub fn with_source_padding(mut self, value: f64) -> Self {
        self.source_padding = value;
        self
    }

    /// Mark output voxels whose `reference` value is `<= value` as background.
    ///
    /// `reference` must have the output shape.
    pub fn with_target_padding(mut self, value: f64, reference: Tensor<B, 3>) -> Self {
        self.target_padding = Some((value, reference));
        self
    }

    /// Apply filter to an input image.
    pub fn apply(&self, input: &Image<B, 3>) -> Image<B, 3> {
        let device = input.data().device();
        let [d, h, w] = self.shape;
        let total = d * h * w;

        let output_indices = generate_grid_3d::<B>(self.shape, &device);
        let output_points = self.metadata.index_to_world_tensor(output_indices);
        let input_points = self.transform.transform_points(output_points);
        let input_indices = input.world_to_index_tensor(input_points);

        let values = self.interpolator.interpolate(input.data(), input_indices.clone());
        let inside = self.interpolator.support_mask(input.shape(), input_indices);
        let outside = inside.clone().neg().add_scalar(1.0);
        let mut output = values * inside + outside.mul_scalar(self.source_padding);

        if let Some((padding, reference)) = &self.target_padding {
            let keep = reference.clone().reshape([total]).greater_elem(*padding).float();
            let background = keep.clone().neg().add_scalar(1.0);
            output = output * keep + background.mul_scalar(*padding);
        }

        Image::from_metadata(output.reshape(Shape::new(self.shape)), self.metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::TensorData;
    use burn_ndarray::NdArray;
    use crate::interpolation::{LinearInterpolator, NearestNeighborInterpolator};
    use crate::spatial::{Direction, Point, Spacing};
    use crate::transform::{AffineParameter, AffineTransform, RigidTransform};

    type TestBackend = NdArray<f32>;

    fn ramp() -> Image<TestBackend, 3> {
        let data: Vec<f32> = (0..40).map(|v| v as f32 + 1.0).collect();
        let tensor = Tensor::from_data(TensorData::new(data, Shape::new([2, 2, 10])), &Default::default());
        Image::new(tensor, Point::origin(), Spacing::uniform(1.0), Direction::identity())
    }

    #[test]
    fn test_identity_nearest_reproduces_input() {
        let image = ramp();
        let identity = RigidTransform::identity();
        let out = ResampleImageFilter::new_from_reference(&image, &identity, NearestNeighborInterpolator::new()).apply(&image);
        assert_eq!(
            out.data().clone().into_data().to_vec::<f32>().unwrap(),
            image.data().clone().into_data().to_vec::<f32>().unwrap()
        );
    }

    #[test]
    fn test_translation_fills_source_padding() {
        let image = ramp();
        let mut shift = AffineTransform::identity();
        shift.set_parameter(AffineParameter::Tx.index(), 3.0);
        let out = ResampleImageFilter::new_from_reference(&image, &shift, LinearInterpolator::new())
            .with_source_padding(-7.0)
            .apply(&image);
        let values = out.data().clone().into_data().to_vec::<f32>().unwrap();
        // output x samples input x + 3
        assert_eq!(values[0], 4.0);
        assert_eq!(values[6], 10.0);
        assert_eq!(values[7], -7.0);
        assert_eq!(values[9], -7.0);
    }

    #[test]
    fn test_target_padding_marks_background() {
        let image = ramp();
        let identity = RigidTransform::identity();
        let mut reference = vec![1.0f32; 40];
        reference[5] = -1.0;
        let reference = Tensor::from_data(TensorData::new(reference, Shape::new([2, 2, 10])), &Default::default());
        let out = ResampleImageFilter::new_from_reference(&image, &identity, LinearInterpolator::new())
            .with_target_padding(-1.0, reference)
            .apply(&image);
        let values = out.data().clone().into_data().to_vec::<f32>().unwrap();
        assert_eq!(values[5], -1.0);
        assert_eq!(values[4], 5.0);
    }
}
