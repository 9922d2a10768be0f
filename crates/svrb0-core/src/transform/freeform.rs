//! Free-form deformation: a cubic B-spline control-point lattice layered on
//! an affine base.

use burn::tensor::backend::Backend;
use burn::tensor::{Int, Shape, Tensor, TensorData};
use serde::{Deserialize, Serialize};
use crate::image::ImageMetadata;
use crate::spatial::{Direction, Point, Spacing, Vector};
use super::affine::AffineTransform;
use super::trait_::{DofStatus, Transform};

/// Cubic B-spline basis weights for fractional offset `u ∈ [0, 1)`.
fn bspline_basis(u: f64) -> [f64; 4] {
    let v = 1.0 - u;
    [
        v * v * v / 6.0,
        (3.0 * u * u * u - 6.0 * u * u + 4.0) / 6.0,
        (-3.0 * u * u * u + 3.0 * u * u + 3.0 * u + 1.0) / 6.0,
        u * u * u / 6.0,
    ]
}

/// Grid of control-point displacement vectors with its own geometry.
///
/// The lattice geometry is independent of any image: `geometry` places
/// control point `(i, j, k)` at `origin + axes · ((i, j, k) ∘ spacing)`.
/// Displacements are stored x fastest, flat index `k·nx·ny + j·nx + i`.
/// Outside the lattice the displacement is zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlPointLattice {
    dims: [usize; 3],
    geometry: ImageMetadata<3>,
    displacements: Vec<Vector<3>>,
}

impl ControlPointLattice {
    /// Zero lattice with `dims` control points, (x, y, z) order.
    pub fn new(dims: [usize; 3], geometry: ImageMetadata<3>) -> Self {
        let count = dims.iter().product();
        Self {
            dims,
            geometry,
            displacements: vec![Vector::zeros(); count],
        }
    }

    /// Zero lattice aligned with an image grid that covers every voxel with
    /// full cubic support.
    ///
    /// Control-point spacing is `spacing` mm along every axis; one extra
    /// control point is placed before the first voxel and two after the last.
    pub fn covering(image: &ImageMetadata<3>, size: [usize; 3], spacing: f64) -> Self {
        let voxel = image.spacing();
        let dims = std::array::from_fn(|i| {
            let extent = (size[i].max(1) - 1) as f64 * voxel[i];
            (extent / spacing).ceil() as usize + 3
        });
        let axes = *image.direction();
        let origin = *image.origin() - axes * Vector::new([spacing; 3]);
        Self::new(dims, ImageMetadata::new(origin, Spacing::uniform(spacing), axes))
    }

    /// Control points along each axis.
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Lattice geometry.
    pub fn geometry(&self) -> &ImageMetadata<3> {
        &self.geometry
    }

    /// Total number of control points.
    pub fn num_control_points(&self) -> usize {
        self.displacements.len()
    }

    /// Flat index of control point `(i, j, k)`.
    pub fn flat_index(&self, i: usize, j: usize, k: usize) -> usize {
        k * self.dims[0] * self.dims[1] + j * self.dims[0] + i
    }

    /// Displacement of control point `(i, j, k)`.
    pub fn get(&self, i: usize, j: usize, k: usize) -> Vector<3> {
        self.displacements[self.flat_index(i, j, k)]
    }

    /// Overwrite the displacement of control point `(i, j, k)`.
    pub fn put(&mut self, i: usize, j: usize, k: usize, displacement: Vector<3>) {
        let index = self.flat_index(i, j, k);
        self.displacements[index] = displacement;
    }

    /// All displacements, flat order.
    pub fn displacements(&self) -> &[Vector<3>] {
        &self.displacements
    }

    /// Mutable access to the displacements, flat order.
    pub fn displacements_mut(&mut self) -> &mut [Vector<3>] {
        &mut self.displacements
    }

    /// World position of control point `(i, j, k)`.
    pub fn control_point_position(&self, i: usize, j: usize, k: usize) -> Point<3> {
        self.geometry.index_to_world(&Point::new([i as f64, j as f64, k as f64]))
    }

    /// Replace origin and axes, leaving spacing and displacements untouched.
    pub fn put_frame(&mut self, origin: Point<3>, axes: Direction<3>) {
        self.geometry.set_origin(origin);
        self.geometry.set_direction(axes);
    }

    /// Interpolated displacement at a world position.
    pub fn displacement(&self, point: &Point<3>) -> Vector<3> {
        let u = self.geometry.world_to_index(point);
        let base: [i64; 3] = std::array::from_fn(|a| u[a].floor() as i64 - 1);
        let weights: [[f64; 4]; 3] = std::array::from_fn(|a| bspline_basis(u[a] - u[a].floor()));

        let mut total = Vector::zeros();
        for (l, wz) in weights[2].iter().enumerate() {
            let k = base[2] + l as i64;
            if k < 0 || k >= self.dims[2] as i64 {
                continue;
            }
            for (m, wy) in weights[1].iter().enumerate() {
                let j = base[1] + m as i64;
                if j < 0 || j >= self.dims[1] as i64 {
                    continue;
                }
                for (n, wx) in weights[0].iter().enumerate() {
                    let i = base[0] + n as i64;
                    if i < 0 || i >= self.dims[0] as i64 {
                        continue;
                    }
                    let d = self.get(i as usize, j as usize, k as usize);
                    total = total + d * (wx * wy * wz);
                }
            }
        }
        total
    }

    /// Batched displacement at world positions `[Batch, 3]`.
    pub fn displacement_tensor<B: Backend>(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        let device = points.device();
        let batch_size = points.dims()[0];

        let grid_coords = self.geometry.world_to_index_tensor(points);
        let grid_indices_float = grid_coords.clone().floor();
        let u_vec = grid_coords - grid_indices_float.clone();
        let base_index = grid_indices_float.int() - 1;

        let bx = Self::basis_tensor(u_vec.clone().slice([0..batch_size, 0..1]).squeeze::<1>(1));
        let by = Self::basis_tensor(u_vec.clone().slice([0..batch_size, 1..2]).squeeze::<1>(1));
        let bz = Self::basis_tensor(u_vec.slice([0..batch_size, 2..3]).squeeze::<1>(1));

        // W[b, i, j, k] = Bx[b, i] * By[b, j] * Bz[b, k]
        let weights = bx.unsqueeze_dim::<3>(2).unsqueeze_dim::<4>(3)
            * by.unsqueeze_dim::<3>(1).unsqueeze_dim::<4>(3)
            * bz.unsqueeze_dim::<3>(1).unsqueeze_dim::<4>(1);
        let weights = weights.reshape([batch_size, 64]);

        let range = Tensor::<B, 1, Int>::from_ints([0, 1, 2, 3], &device);
        let zeros = Tensor::<B, 4, Int>::zeros([1, 4, 4, 4], &device);
        let offsets = [
            range.clone().reshape([1, 4, 1, 1]),
            range.clone().reshape([1, 1, 4, 1]),
            range.reshape([1, 1, 1, 4]),
        ];

        let mut flat_indices = Tensor::<B, 2, Int>::zeros([batch_size, 64], &device);
        let mut inside = Tensor::<B, 2>::ones([batch_size, 64], &device);
        let strides = [1, self.dims[0] as i32, (self.dims[0] * self.dims[1]) as i32];
        for (axis, offset) in offsets.into_iter().enumerate() {
            let n = self.dims[axis] as i32;
            let base = base_index
                .clone()
                .slice([0..batch_size, axis..axis + 1])
                .unsqueeze_dim::<3>(2)
                .unsqueeze_dim::<4>(3);
            let idx = (base + offset + zeros.clone()).reshape([batch_size, 64]);

            let valid = idx.clone().greater_equal_elem(0).int() * idx.clone().lower_elem(n).int();
            inside = inside * valid.float();
            flat_indices = flat_indices + idx.clamp(0, n - 1) * strides[axis];
        }

        let coeffs = self
            .coefficient_tensor::<B>(&device)
            .select(0, flat_indices.reshape([batch_size * 64]))
            .reshape([batch_size, 64, 3]);
        let weights = (weights * inside).reshape([batch_size, 64, 1]);

        (coeffs * weights).sum_dim(1).squeeze::<2>(1)
    }

    fn coefficient_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 2> {
        let flat: Vec<f32> = self
            .displacements
            .iter()
            .flat_map(|d| [d[0] as f32, d[1] as f32, d[2] as f32])
            .collect();
        Tensor::<B, 1>::from_data(TensorData::new(flat, Shape::new([self.displacements.len() * 3])), device)
            .reshape([self.displacements.len(), 3])
    }

    fn basis_tensor<B: Backend>(u: Tensor<B, 1>) -> Tensor<B, 2> {
        let one_minus_u = u.clone().neg().add_scalar(1.0);
        let u2 = u.clone().powf_scalar(2.0);
        let u3 = u.clone().powf_scalar(3.0);

        let b0 = one_minus_u.powf_scalar(3.0) / 6.0;
        let b1 = (u3.clone().mul_scalar(3.0) - u2.clone().mul_scalar(6.0)).add_scalar(4.0) / 6.0;
        let b2 = (u3.clone().mul_scalar(-3.0) + u2.mul_scalar(3.0) + u.mul_scalar(3.0)).add_scalar(1.0) / 6.0;
        let b3 = u3 / 6.0;

        Tensor::cat(
            vec![
                b0.unsqueeze_dim::<2>(1),
                b1.unsqueeze_dim::<2>(1),
                b2.unsqueeze_dim::<2>(1),
                b3.unsqueeze_dim::<2>(1),
            ],
            1,
        )
    }
}

/// Affine base plus local lattice displacement: `T(x) = A(x) + d(x)`.
///
/// When `active_axis` is set only that component of each control-point
/// vector is a free parameter; the others stay at their current value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreeFormTransform {
    base: AffineTransform,
    lattice: ControlPointLattice,
    active_axis: Option<usize>,
}

impl FreeFormTransform {
    /// Pure local deformation over `lattice`.
    pub fn new(lattice: ControlPointLattice) -> Self {
        Self {
            base: AffineTransform::identity(),
            lattice,
            active_axis: None,
        }
    }

    /// Restrict the free parameters to one displacement component.
    pub fn with_active_axis(mut self, axis: usize) -> Self {
        self.active_axis = Some(axis);
        self
    }

    /// Free every displacement component again.
    pub fn without_active_axis(mut self) -> Self {
        self.active_axis = None;
        self
    }

    /// Replace the affine base.
    pub fn with_base(mut self, base: AffineTransform) -> Self {
        self.base = base;
        self
    }

    /// Affine base.
    pub fn base(&self) -> &AffineTransform {
        &self.base
    }

    /// Mutable affine base.
    pub fn base_mut(&mut self) -> &mut AffineTransform {
        &mut self.base
    }

    /// Control-point lattice.
    pub fn lattice(&self) -> &ControlPointLattice {
        &self.lattice
    }

    /// Mutable control-point lattice.
    pub fn lattice_mut(&mut self) -> &mut ControlPointLattice {
        &mut self.lattice
    }

    /// Displacement component that is free, if restricted.
    pub fn active_axis(&self) -> Option<usize> {
        self.active_axis
    }

    /// Number of lattice parameters (three per control point).
    pub fn num_parameters(&self) -> usize {
        self.lattice.num_control_points() * 3
    }

    /// Lattice parameter `index`: component `index % 3` of control point `index / 3`.
    pub fn parameter(&self, index: usize) -> f64 {
        self.lattice.displacements[index / 3][index % 3]
    }

    /// Set lattice parameter `index`.
    pub fn set_parameter(&mut self, index: usize, value: f64) {
        self.lattice.displacements[index / 3][index % 3] = value;
    }

    /// Status of lattice parameter `index`.
    pub fn status(&self, index: usize) -> DofStatus {
        match self.active_axis {
            Some(axis) if index % 3 != axis => DofStatus::Passive,
            _ => DofStatus::Active,
        }
    }

    /// Map one point.
    pub fn transform_point(&self, point: &Point<3>) -> Point<3> {
        self.base.transform_point(point) + self.lattice.displacement(point)
    }
}

impl<B: Backend> Transform<B, 3> for FreeFormTransform {
    fn transform_points(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        let displacement = self.lattice.displacement_tensor(points.clone());
        Transform::<B, 3>::transform_points(&self.base, points) + displacement
    }
}
