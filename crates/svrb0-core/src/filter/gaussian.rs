//! Separable Gaussian smoothing in physical units.

use burn::tensor::backend::Backend;
use burn::tensor::ops::ConvOptions;
use burn::tensor::{Shape, Tensor};
use crate::image::Image;
use crate::spatial::Spacing;

/// Gaussian smoothing filter.
///
/// `sigma` is in millimetres and converted per axis using the image spacing.
/// Tensor dimension `d` of a `[Z, Y, X]` volume is spatial axis `D - 1 - d`.
pub struct GaussianFilter<B: Backend> {
    sigma: f64,
    max_kernel_width: usize,
    _b: std::marker::PhantomData<B>,
}

impl<B: Backend> GaussianFilter<B> {
    /// Isotropic filter with standard deviation `sigma` mm.
    pub fn new(sigma: f64) -> Self {
        Self {
            sigma,
            max_kernel_width: 33,
            _b: std::marker::PhantomData,
        }
    }

    /// Set the maximum kernel width (radius * 2 + 1).
    pub fn with_max_kernel_width(mut self, width: usize) -> Self {
        self.max_kernel_width = width;
        self
    }

    /// Smooth every voxel.
    pub fn apply<const D: usize>(&self, image: &Image<B, D>) -> Image<B, D> {
        image.with_data(self.apply_tensor(image.data().clone(), image.spacing()))
    }

    /// Smooth using only voxels above `padding`.
    ///
    /// Padded voxels neither contribute to nor receive smoothed values; they
    /// keep the padding value.
    pub fn apply_with_padding<const D: usize>(&self, image: &Image<B, D>, padding: f64) -> Image<B, D> {
        let data = image.data().clone();
        let mask = data.clone().greater_elem(padding).float();

        let weighted = self.apply_tensor(data * mask.clone(), image.spacing());
        let support = self.apply_tensor(mask.clone(), image.spacing());

        // avoid 0/0 where no unpadded voxel is in reach
        let safe_support = support.clone().clamp_min(1e-12);
        let smoothed = weighted / safe_support;
        let background = mask.clone().neg().add_scalar(1.0);

        image.with_data(smoothed * mask + background.mul_scalar(padding))
    }

    /// Apply the filter to a tensor laid out `[.., Z, Y, X]` with spacing (x, y, z).
    pub fn apply_tensor<const D: usize>(&self, input: Tensor<B, D>, spacing: &Spacing<D>) -> Tensor<B, D> {
        if self.sigma <= 1e-6 {
            return input;
        }
        let device = input.device();
        let mut data = input;

        for dim in 0..D {
            let pixel_sigma = self.sigma / spacing[D - 1 - dim];
            let radius = (3.0 * pixel_sigma).ceil() as usize;
            let width = (2 * radius + 1).min(self.max_kernel_width);
            let actual_radius = (width - 1) / 2;
            if actual_radius == 0 {
                continue;
            }

            let kernel = Self::generate_kernel(pixel_sigma, actual_radius);
            let kernel = Tensor::<B, 1>::from_floats(kernel.as_slice(), &device);
            data = Self::convolve_1d(data, kernel, dim);
        }
        data
    }

    fn generate_kernel(sigma: f64, radius: usize) -> Vec<f32> {
        let two_sigma2 = 2.0 * sigma * sigma;
        let raw: Vec<f64> = (0..=(2 * radius))
            .map(|i| {
                let x = i as f64 - radius as f64;
                (-x * x / two_sigma2).exp()
            })
            .collect();
        let sum: f64 = raw.iter().sum();
        raw.into_iter().map(|v| (v / sum) as f32).collect()
    }

    fn convolve_1d<const D: usize>(input: Tensor<B, D>, kernel: Tensor<B, 1>, dim: usize) -> Tensor<B, D> {
        let dims: [usize; D] = input.shape().dims();

        // move `dim` last, fold the rest into the batch
        let mut permutation = [0isize; D];
        let mut idx = 0;
        for i in 0..D {
            if i != dim {
                permutation[idx] = i as isize;
                idx += 1;
            }
        }
        permutation[D - 1] = dim as isize;

        let length = dims[dim];
        let batch_size: usize = (0..D).filter(|&i| i != dim).map(|i| dims[i]).product();
        let reshaped = input.permute(permutation).reshape([batch_size, 1, length]);

        let kernel_size = kernel.dims()[0];
        let options = ConvOptions::new([1], [kernel_size / 2], [1], 1);
        let output = burn::tensor::module::conv1d(reshaped, kernel.reshape([1, 1, kernel_size]), None, options);

        let permuted_shape: [usize; D] = std::array::from_fn(|i| dims[permutation[i] as usize]);
        let output = output.reshape(Shape::new(permuted_shape));

        let mut inverse = [0isize; D];
        for (new_pos, &old_pos) in permutation.iter().enumerate() {
            inverse[old_pos as usize] = new_pos as isize;
        }
        output.permute(inverse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::TensorData;
    use burn_ndarray::NdArray;
    use crate::spatial::{Direction, Point};

    type TestBackend = NdArray<f32>;

    fn impulse(spacing: Spacing<3>) -> Image<TestBackend, 3> {
        let mut data = vec![0.0f32; 9 * 9 * 9];
        data[4 * 81 + 4 * 9 + 4] = 1.0;
        let tensor = Tensor::from_data(TensorData::new(data, Shape::new([9, 9, 9])), &Default::default());
        Image::new(tensor, Point::origin(), spacing, Direction::identity())
    }

    #[test]
    fn test_mass_is_preserved() {
        let image = impulse(Spacing::uniform(1.0));
        let out = GaussianFilter::new(1.0).apply(&image);
        let sum: f32 = out.data().clone().into_data().to_vec::<f32>().unwrap().iter().sum();
        assert!((sum - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_spacing_controls_spread_per_axis() {
        // x voxels are 4 mm wide, z voxels 1 mm: spread must be wider along z
        let image = impulse(Spacing::new([4.0, 1.0, 1.0]));
        let out = GaussianFilter::new(1.0).apply(&image);
        let v = out.data().clone().into_data().to_vec::<f32>().unwrap();
        let along_x = v[4 * 81 + 4 * 9 + 5];
        let along_z = v[5 * 81 + 4 * 9 + 4];
        assert!(along_z > along_x);
    }

    #[test]
    fn test_padding_is_kept() {
        let data = vec![-1.0f32, 2.0, 2.0, 2.0, -1.0];
        let tensor = Tensor::from_data(TensorData::new(data, Shape::new([1, 1, 5])), &Default::default());
        let image = Image::<TestBackend, 3>::new(tensor, Point::origin(), Spacing::uniform(1.0), Direction::identity());
        let out = GaussianFilter::new(1.0).apply_with_padding(&image, 0.0);
        let v = out.data().clone().into_data().to_vec::<f32>().unwrap();
        assert_eq!(v[0], 0.0);
        assert_eq!(v[4], 0.0);
        for value in &v[1..4] {
            assert!((value - 2.0).abs() < 1e-5);
        }
    }
}
