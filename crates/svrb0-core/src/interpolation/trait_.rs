//! Interpolator trait for sampling volumes at continuous indices.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// Samples a `[Z, Y, X]` volume at continuous `(x, y, z)` indices.
pub trait Interpolator<B: Backend> {
    /// Interpolate `data` at `indices` `[Batch, 3]`, returning `[Batch]`.
    ///
    /// Indices outside the volume are clamped; use
    /// [`support_mask`](Self::support_mask) to detect them.
    fn interpolate(&self, data: &Tensor<B, 3>, indices: Tensor<B, 2>) -> Tensor<B, 1>;

    /// How far beyond the outermost voxel centres a sample still counts as inside.
    fn support_margin(&self) -> f64;

    /// 1 where `indices` fall inside the interpolation domain of a volume of
    /// tensor shape `shape`, 0 elsewhere.
    fn support_mask(&self, shape: [usize; 3], indices: Tensor<B, 2>) -> Tensor<B, 1> {
        let batch_size = indices.dims()[0];
        let margin = self.support_margin();
        let device = indices.device();

        let mut mask = Tensor::<B, 1>::ones([batch_size], &device);
        for axis in 0..3 {
            let n = shape[2 - axis] as f64;
            let coord = indices.clone().narrow(1, axis, 1).squeeze::<1>(1);
            let above = coord.clone().greater_equal_elem(-margin).float();
            let below = coord.lower_equal_elem(n - 1.0 + margin).float();
            mask = mask * above * below;
        }
        mask
    }
}
