//! Nearest-neighbour interpolation.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use super::trait_::Interpolator;

/// Nearest-neighbour interpolator. Copies voxel values without smoothing;
/// each voxel owns the half-voxel box around its centre.
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestNeighborInterpolator;

impl NearestNeighborInterpolator {
    /// Create a new nearest-neighbour interpolator.
    pub fn new() -> Self {
        Self
    }
}

impl<B: Backend> Interpolator<B> for NearestNeighborInterpolator {
    fn interpolate(&self, data: &Tensor<B, 3>, indices: Tensor<B, 2>) -> Tensor<B, 1> {
        let [d0, d1, d2] = data.dims();

        // floor(v + 0.5) so that ties resolve the same way on every backend
        let x = indices.clone().narrow(1, 0, 1).squeeze::<1>(1);
        let y = indices.clone().narrow(1, 1, 1).squeeze::<1>(1);
        let z = indices.narrow(1, 2, 1).squeeze::<1>(1);

        let x_i = x.add_scalar(0.5).floor().clamp(0.0, (d2 - 1) as f64).int();
        let y_i = y.add_scalar(0.5).floor().clamp(0.0, (d1 - 1) as f64).int();
        let z_i = z.add_scalar(0.5).floor().clamp(0.0, (d0 - 1) as f64).int();

        let idx = z_i * ((d1 * d2) as i32) + y_i * (d2 as i32) + x_i;
        data.clone().reshape([d0 * d1 * d2]).gather(0, idx)
    }

    fn support_margin(&self) -> f64 {
        0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::{Shape, TensorData};
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_rounding() {
        let device = Default::default();
        let data = Tensor::<TestBackend, 3>::from_data(
            TensorData::new(vec![0.0f32, 1.0, 2.0, 3.0], Shape::new([1, 2, 2])),
            &device,
        );
        let indices = Tensor::<TestBackend, 2>::from_floats(
            [[0.2, 0.1, 0.0], [0.7, 0.1, 0.0], [0.4, 0.8, 0.0], [0.9, 0.9, 0.0]],
            &device,
        );
        let values = NearestNeighborInterpolator::new().interpolate(&data, indices).into_data().to_vec::<f32>().unwrap();
        assert_eq!(values, vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_support_extends_half_voxel() {
        let device = Default::default();
        let indices = Tensor::<TestBackend, 2>::from_floats([[-0.4, 0.0, 0.0], [1.6, 0.0, 0.0]], &device);
        let mask = NearestNeighborInterpolator::new().support_mask([1, 1, 2], indices).into_data().to_vec::<f32>().unwrap();
        assert_eq!(mask, vec![1.0, 0.0]);
    }
}
