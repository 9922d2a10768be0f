use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};

/// Every voxel index of a `[Z, Y, X]` volume as `(x, y, z)` rows.
///
/// Rows follow the tensor's memory order (x fastest), so row `n` is the
/// index of element `n` of the flattened volume. Returns `[N, 3]`.
pub fn generate_grid_3d<B: Backend>(shape: [usize; 3], device: &B::Device) -> Tensor<B, 2> {
    let [d, h, w] = shape;
    let total = d * h * w;

    let mut grid = Vec::with_capacity(total * 3);
    for z in 0..d {
        for y in 0..h {
            for x in 0..w {
                grid.extend([x as f32, y as f32, z as f32]);
            }
        }
    }

    Tensor::<B, 1>::from_data(TensorData::new(grid, Shape::new([total * 3])), device).reshape([total, 3])
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    #[test]
    fn test_grid_rows_follow_flattened_order() {
        let device = Default::default();
        let grid = generate_grid_3d::<NdArray<f32>>([2, 1, 3], &device);
        assert_eq!(grid.dims(), [6, 3]);

        let rows = grid.into_data().to_vec::<f32>().unwrap();
        assert_eq!(&rows[0..3], &[0.0, 0.0, 0.0]);
        assert_eq!(&rows[3..6], &[1.0, 0.0, 0.0]);
        assert_eq!(&rows[9..12], &[0.0, 0.0, 1.0]);
        assert_eq!(&rows[15..18], &[2.0, 0.0, 1.0]);
    }

    #[test]
    fn test_empty_shape_gives_no_rows() {
        let device = Default::default();
        let grid = generate_grid_3d::<NdArray<f32>>([0, 4, 4], &device);
        assert_eq!(grid.dims(), [0, 3]);
    }
}
