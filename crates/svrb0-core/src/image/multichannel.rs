//! Multi-channel (4D) images: several 3D volumes sharing one grid.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use super::{Image, ImageMetadata};

/// Stack of 3D volumes on a common grid, tensor layout `[C, Z, Y, X]`.
///
/// Channel `i` of an aggregate always holds the `i`-th input stack, so two
/// aggregates built from paired inputs can be compared channel by channel.
#[derive(Debug, Clone)]
pub struct MultiChannelImage<B: Backend> {
    data: Tensor<B, 4>,
    metadata: ImageMetadata<3>,
}

impl<B: Backend> MultiChannelImage<B> {
    /// Wrap a `[C, Z, Y, X]` tensor.
    pub fn new(data: Tensor<B, 4>, metadata: ImageMetadata<3>) -> Self {
        Self { data, metadata }
    }

    /// Stack volumes of identical shape along a new leading channel axis.
    ///
    /// # Panics
    /// If `channels` is empty or the shapes differ.
    pub fn from_channels(metadata: ImageMetadata<3>, channels: Vec<Tensor<B, 3>>) -> Self {
        assert!(!channels.is_empty(), "At least one channel is required");
        let channels = channels.into_iter().map(|c| c.unsqueeze_dim::<4>(0)).collect();
        Self::new(Tensor::cat(channels, 0), metadata)
    }

    /// Get the data tensor.
    pub fn data(&self) -> &Tensor<B, 4> {
        &self.data
    }

    /// Get the shared geometry.
    pub fn metadata(&self) -> &ImageMetadata<3> {
        &self.metadata
    }

    /// Number of channels.
    pub fn num_channels(&self) -> usize {
        self.data.dims()[0]
    }

    /// Spatial tensor shape `[Z, Y, X]`.
    pub fn spatial_shape(&self) -> [usize; 3] {
        let [_, z, y, x] = self.data.dims();
        [z, y, x]
    }

    /// Number of voxels along each axis, (x, y, z) order.
    pub fn size(&self) -> [usize; 3] {
        let [z, y, x] = self.spatial_shape();
        [x, y, z]
    }

    /// World position of the grid centre.
    pub fn center(&self) -> crate::spatial::Point<3> {
        self.metadata.center(self.size())
    }

    /// Extract channel `index` as a 3D image.
    pub fn channel(&self, index: usize) -> Image<B, 3> {
        let [_, z, y, x] = self.data.dims();
        let data = self
            .data
            .clone()
            .slice([index..index + 1, 0..z, 0..y, 0..x])
            .reshape([z, y, x]);
        Image::from_metadata(data, self.metadata)
    }

    /// All channels as 3D images, in order.
    pub fn channels(&self) -> Vec<Image<B, 3>> {
        (0..self.num_channels()).map(|i| self.channel(i)).collect()
    }

    /// Same data, new geometry.
    pub fn with_metadata(&self, metadata: ImageMetadata<3>) -> Self {
        Self::new(self.data.clone(), metadata)
    }
}

impl<B: Backend> From<Image<B, 3>> for MultiChannelImage<B> {
    fn from(image: Image<B, 3>) -> Self {
        let metadata = *image.metadata();
        Self::new(image.into_data().unsqueeze_dim::<4>(0), metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::{Shape, TensorData};
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_channels_keep_order() {
        let device = Default::default();
        let a = Tensor::<TestBackend, 3>::from_data(TensorData::new(vec![1.0f32; 8], Shape::new([2, 2, 2])), &device);
        let b = Tensor::<TestBackend, 3>::from_data(TensorData::new(vec![2.0f32; 8], Shape::new([2, 2, 2])), &device);
        let image = MultiChannelImage::from_channels(ImageMetadata::default(), vec![a, b]);

        assert_eq!(image.num_channels(), 2);
        assert_eq!(image.spatial_shape(), [2, 2, 2]);
        let second = image.channel(1).into_data().into_data().to_vec::<f32>().unwrap();
        assert!(second.iter().all(|v| *v == 2.0));
    }

    #[test]
    fn test_from_single_image() {
        let device = Default::default();
        let data = Tensor::<TestBackend, 3>::zeros([3, 4, 5], &device);
        let image = Image::from_metadata(data, ImageMetadata::default());
        let multi = MultiChannelImage::from(image);
        assert_eq!(multi.num_channels(), 1);
        assert_eq!(multi.size(), [5, 4, 3]);
    }
}
