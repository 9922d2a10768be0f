//! Transform trait and parameter bookkeeping shared by all transforms.

use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};
use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};

/// Maps points from one world frame to another.
///
/// Transforms keep their parameters in `f64` on the CPU; this trait is the
/// batched tensor path used by resampling.
pub trait Transform<B: Backend, const D: usize> {
    /// Apply transform to a batch of points `[Batch, D]`.
    fn transform_points(&self, points: Tensor<B, 2>) -> Tensor<B, 2>;
}

/// Whether a parameter may be changed by a registration solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DofStatus {
    Active,
    Passive,
}

/// Apply a homogeneous 4×4 matrix to row-vector points `[N, 3]`.
pub(crate) fn apply_homogeneous<B: Backend>(matrix: &Matrix4<f64>, points: Tensor<B, 2>) -> Tensor<B, 2> {
    let device = points.device();

    // y = x @ L^T + t
    let mut l_t = Vec::with_capacity(9);
    for r in 0..3 {
        for c in 0..3 {
            l_t.push(matrix[(c, r)] as f32);
        }
    }
    let l_t = Tensor::<B, 2>::from_data(TensorData::new(l_t, Shape::new([3, 3])), &device);
    let t: Vec<f32> = (0..3).map(|i| matrix[(i, 3)] as f32).collect();
    let t = Tensor::<B, 1>::from_data(TensorData::new(t, Shape::new([3])), &device).reshape([1, 3]);

    points.matmul(l_t) + t
}
