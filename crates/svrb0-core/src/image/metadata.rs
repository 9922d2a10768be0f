//! Voxel-to-world geometry shared by images and resampling grids.

use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};
use serde::{Deserialize, Serialize};
use crate::spatial::{Direction, Point, Spacing, Vector};

/// Physical geometry of a sampling grid.
///
/// Index → world: `origin + direction · (index ∘ spacing)`, where `origin`
/// is the world position of the first voxel and index components are
/// ordered (x, y, z).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata<const D: usize> {
    origin: Point<D>,
    spacing: Spacing<D>,
    direction: Direction<D>,
}

impl<const D: usize> ImageMetadata<D> {
    /// Create new image metadata.
    pub fn new(origin: Point<D>, spacing: Spacing<D>, direction: Direction<D>) -> Self {
        Self {
            origin,
            spacing,
            direction,
        }
    }

    /// Get the origin.
    pub fn origin(&self) -> &Point<D> {
        &self.origin
    }

    /// Get the spacing.
    pub fn spacing(&self) -> &Spacing<D> {
        &self.spacing
    }

    /// Get the direction.
    pub fn direction(&self) -> &Direction<D> {
        &self.direction
    }

    /// Set the origin.
    pub fn set_origin(&mut self, origin: Point<D>) {
        self.origin = origin;
    }

    /// Set the direction.
    pub fn set_direction(&mut self, direction: Direction<D>) {
        self.direction = direction;
    }

    /// Continuous index to world position.
    pub fn index_to_world(&self, index: &Point<D>) -> Point<D> {
        let scaled = index.coords().component_mul(&self.spacing);
        self.origin + self.direction * scaled
    }

    /// World position to continuous index. Assumes orthonormal axes.
    pub fn world_to_index(&self, point: &Point<D>) -> Point<D> {
        let local = self.direction.transpose() * (*point - self.origin);
        Point(local.component_div(&self.spacing).0.into())
    }

    /// World position of the grid centre for a grid of `size` voxels, (x, y, z) order.
    pub fn center(&self, size: [usize; D]) -> Point<D> {
        let index = Point::new(std::array::from_fn(|i| (size[i] as f64 - 1.0) / 2.0));
        self.index_to_world(&index)
    }

    /// Translate the grid so that its centre lies at `center`.
    pub fn with_center(mut self, size: [usize; D], center: Point<D>) -> Self {
        let shift: Vector<D> = center - self.center(size);
        self.origin = self.origin + shift;
        self
    }

    /// Batch continuous indices `[N, D]` to world positions `[N, D]`.
    pub fn index_to_world_tensor<B: Backend>(&self, indices: Tensor<B, 2>) -> Tensor<B, 2> {
        let device = indices.device();
        let origin = self.origin_tensor::<B>(&device);

        // P = O + I @ M with M_rc = S_r * D_cr
        let mut m_data = Vec::with_capacity(D * D);
        for r in 0..D {
            for c in 0..D {
                m_data.push((self.spacing[r] * self.direction[(c, r)]) as f32);
            }
        }
        let m = Tensor::<B, 2>::from_data(TensorData::new(m_data, Shape::new([D, D])), &device);

        indices.matmul(m) + origin
    }

    /// Batch world positions `[N, D]` to continuous indices `[N, D]`.
    pub fn world_to_index_tensor<B: Backend>(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        let device = points.device();
        let origin = self.origin_tensor::<B>(&device);

        // I = (P - O) @ T with T_rc = D_rc / S_c (D^-1 = D^T)
        let mut t_data = Vec::with_capacity(D * D);
        for r in 0..D {
            for c in 0..D {
                t_data.push((self.direction[(r, c)] / self.spacing[c]) as f32);
            }
        }
        let t = Tensor::<B, 2>::from_data(TensorData::new(t_data, Shape::new([D, D])), &device);

        (points - origin).matmul(t)
    }

    fn origin_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 2> {
        let origin: Vec<f32> = (0..D).map(|i| self.origin[i] as f32).collect();
        Tensor::<B, 1>::from_data(TensorData::new(origin, Shape::new([D])), device).reshape([1, D])
    }
}

impl<const D: usize> Default for ImageMetadata<D> {
    fn default() -> Self {
        Self {
            origin: Point::origin(),
            spacing: Spacing::uniform(1.0),
            direction: Direction::identity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    fn oblique() -> ImageMetadata<3> {
        let s = std::f64::consts::FRAC_1_SQRT_2;
        let direction = Direction::from_axes(
            Vector::new([s, s, 0.0]),
            Vector::new([-s, s, 0.0]),
            Vector::new([0.0, 0.0, 1.0]),
        );
        ImageMetadata::new(Point::new([10.0, -4.0, 2.0]), Spacing::new([1.0, 2.0, 3.0]), direction)
    }

    #[test]
    fn test_index_world_roundtrip() {
        let meta = oblique();
        let index = Point::new([3.5, 1.25, 4.0]);
        let world = meta.index_to_world(&index);
        let back = meta.world_to_index(&world);
        for i in 0..3 {
            assert!((back[i] - index[i]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_with_center_moves_centre_only() {
        let meta = oblique();
        let size = [8, 6, 4];
        let target = Point::new([0.0, 0.0, 0.0]);
        let moved = meta.with_center(size, target);
        assert!(moved.center(size).distance(&target) < 1e-9);
        assert_eq!(moved.direction(), meta.direction());
        assert_eq!(moved.spacing(), meta.spacing());
    }

    #[test]
    fn test_tensor_mapping_matches_cpu() {
        let device = Default::default();
        let meta = oblique();
        let indices = Tensor::<TestBackend, 2>::from_floats([[0.0, 0.0, 0.0], [2.0, 1.0, 3.0]], &device);
        let world = meta.index_to_world_tensor(indices.clone());
        let values = world.clone().into_data().to_vec::<f32>().unwrap();
        let expected = meta.index_to_world(&Point::new([2.0, 1.0, 3.0]));
        for i in 0..3 {
            assert!((values[3 + i] as f64 - expected[i]).abs() < 1e-4);
        }

        let back = meta.world_to_index_tensor(world).into_data().to_vec::<f32>().unwrap();
        let original = indices.into_data().to_vec::<f32>().unwrap();
        for (a, b) in back.iter().zip(original.iter()) {
            assert!((a - b).abs() < 1e-4);
        }
    }
}
