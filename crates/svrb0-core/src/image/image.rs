//! Scalar images with physical metadata.

use burn::tensor::backend::Backend;
use burn::tensor::{ElementConversion, Tensor};
use crate::spatial::{Direction, Point, Spacing};
use super::ImageMetadata;

/// Scalar image: tensor data plus the geometry that places it in the world.
///
/// Tensor layout is `[Z, Y, X]` for 3D images while spacing, origin and
/// continuous indices are ordered (x, y, z).
///
/// # Examples
/// ```rust
/// use svrb0_core::Image;
/// use svrb0_core::spatial::{Point3, Spacing3, Direction3};
/// use burn::tensor::Tensor;
/// use burn_ndarray::NdArray;
///
/// type Backend = NdArray<f32>;
///
/// let device = Default::default();
/// let data = Tensor::<Backend, 3>::zeros([4, 8, 10], &device);
/// let image = Image::new(data, Point3::origin(), Spacing3::uniform(1.0), Direction3::identity());
/// assert_eq!(image.size(), [10, 8, 4]);
/// ```
#[derive(Debug, Clone)]
pub struct Image<B: Backend, const D: usize> {
    data: Tensor<B, D>,
    metadata: ImageMetadata<D>,
}

impl<B: Backend, const D: usize> Image<B, D> {
    /// Create a new image with the given data and metadata.
    pub fn new(
        data: Tensor<B, D>,
        origin: Point<D>,
        spacing: Spacing<D>,
        direction: Direction<D>,
    ) -> Self {
        Self::from_metadata(data, ImageMetadata::new(origin, spacing, direction))
    }

    /// Create an image from data and an existing geometry.
    pub fn from_metadata(data: Tensor<B, D>, metadata: ImageMetadata<D>) -> Self {
        Self { data, metadata }
    }

    /// Get the image data tensor.
    pub fn data(&self) -> &Tensor<B, D> {
        &self.data
    }

    /// Consume the image, returning its data.
    pub fn into_data(self) -> Tensor<B, D> {
        self.data
    }

    /// Get the geometry.
    pub fn metadata(&self) -> &ImageMetadata<D> {
        &self.metadata
    }

    /// Get the origin (world position of the first voxel).
    pub fn origin(&self) -> &Point<D> {
        self.metadata.origin()
    }

    /// Get the spacing.
    pub fn spacing(&self) -> &Spacing<D> {
        self.metadata.spacing()
    }

    /// Get the direction (orientation matrix).
    pub fn direction(&self) -> &Direction<D> {
        self.metadata.direction()
    }

    /// Tensor shape, `[Z, Y, X]` for 3D.
    pub fn shape(&self) -> [usize; D] {
        self.data.shape().dims.try_into().expect("Tensor rank mismatch")
    }

    /// Number of voxels along each axis, (x, y, z) order.
    pub fn size(&self) -> [usize; D] {
        let shape = self.shape();
        std::array::from_fn(|i| shape[D - 1 - i])
    }

    /// World position of the image centre.
    pub fn center(&self) -> Point<D> {
        self.metadata.center(self.size())
    }

    /// Same geometry, new data.
    pub fn with_data(&self, data: Tensor<B, D>) -> Self {
        Self::from_metadata(data, self.metadata)
    }

    /// Same data, new geometry.
    pub fn with_metadata(&self, metadata: ImageMetadata<D>) -> Self {
        Self::from_metadata(self.data.clone(), metadata)
    }

    /// Whether two images sample the same grid.
    pub fn same_grid(&self, other: &Self) -> bool {
        self.shape() == other.shape() && self.metadata == other.metadata
    }

    /// Sum of squared voxel differences against an image of the same shape.
    pub fn sum_squared_difference(&self, other: &Self) -> f64 {
        let diff = self.data.clone() - other.data.clone();
        (diff.clone() * diff).sum().into_scalar().elem::<f64>()
    }

    /// Continuous index to world position.
    pub fn transform_continuous_index_to_physical_point(&self, index: &Point<D>) -> Point<D> {
        self.metadata.index_to_world(index)
    }

    /// World position to continuous index.
    pub fn transform_physical_point_to_continuous_index(&self, point: &Point<D>) -> Point<D> {
        self.metadata.world_to_index(point)
    }

    /// Batch continuous indices `[N, D]` to world positions.
    pub fn index_to_world_tensor(&self, indices: Tensor<B, 2>) -> Tensor<B, 2> {
        self.metadata.index_to_world_tensor(indices)
    }

    /// Batch world positions `[N, D]` to continuous indices.
    pub fn world_to_index_tensor(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        self.metadata.world_to_index_tensor(points)
    }
}
