//! Rigid transform (rotation + translation about a fixed centre).

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use nalgebra::{Matrix3, Matrix4, Vector3 as NaVector3};
use serde::{Deserialize, Serialize};
use crate::spatial::Point;
use super::trait_::{apply_homogeneous, DofStatus, Transform};

/// Number of rigid parameters: `tx, ty, tz, rx, ry, rz`.
pub const RIGID_PARAMETERS: usize = 6;

/// Rotation `Rz(rz) · Ry(ry) · Rx(rx)`, angles in radians.
pub fn rotation_matrix(rx: f64, ry: f64, rz: f64) -> Matrix3<f64> {
    let (sx, cx) = rx.sin_cos();
    let (sy, cy) = ry.sin_cos();
    let (sz, cz) = rz.sin_cos();

    Matrix3::new(
        cz * cy, cz * sy * sx - sz * cx, cz * sy * cx + sz * sx,
        sz * cy, sz * sy * sx + cz * cx, sz * sy * cx - cz * sx,
        -sy, cy * sx, cy * cx,
    )
}

/// Euler angles `(rx, ry, rz)` of a proper rotation built by [`rotation_matrix`].
pub fn euler_angles(r: &Matrix3<f64>) -> (f64, f64, f64) {
    let ry = (-r[(2, 0)]).clamp(-1.0, 1.0).asin();
    if ry.cos().abs() < 1e-9 {
        // gimbal lock: only rz - rx is determined
        (0.0, ry, (-r[(0, 1)]).atan2(r[(1, 1)]))
    } else {
        (r[(2, 1)].atan2(r[(2, 2)]), ry, r[(1, 0)].atan2(r[(0, 0)]))
    }
}

/// Homogeneous matrix of `x ↦ L(x − c) + c + t`.
pub(crate) fn centred_matrix(linear: &Matrix3<f64>, center: &Point<3>, translation: [f64; 3]) -> Matrix4<f64> {
    let c = NaVector3::new(center[0], center[1], center[2]);
    let offset = c - linear * c + NaVector3::from(translation);
    let mut m = Matrix4::identity();
    m.fixed_view_mut::<3, 3>(0, 0).copy_from(linear);
    m.fixed_view_mut::<3, 1>(0, 3).copy_from(&offset);
    m
}

/// Translation that reproduces the offset of `m` about centre `c`.
pub(crate) fn centred_translation(m: &Matrix4<f64>, center: &Point<3>) -> [f64; 3] {
    let linear: Matrix3<f64> = m.fixed_view::<3, 3>(0, 0).into_owned();
    let c = NaVector3::new(center[0], center[1], center[2]);
    let t = m.fixed_view::<3, 1>(0, 3).into_owned() - c + linear * c;
    [t[0], t[1], t[2]]
}

/// Rigid transform `T(x) = R(x − c) + c + t`.
///
/// Parameters are `tx, ty, tz` (mm) and `rx, ry, rz` (radians).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RigidTransform {
    parameters: [f64; RIGID_PARAMETERS],
    status: [DofStatus; RIGID_PARAMETERS],
    center: Point<3>,
}

impl RigidTransform {
    /// Identity about the world origin, every parameter active.
    pub fn identity() -> Self {
        Self {
            parameters: [0.0; RIGID_PARAMETERS],
            status: [DofStatus::Active; RIGID_PARAMETERS],
            center: Point::origin(),
        }
    }

    /// Create from translation and Euler angles.
    pub fn new(translation: [f64; 3], rotation: [f64; 3]) -> Self {
        let mut t = Self::identity();
        t.parameters[..3].copy_from_slice(&translation);
        t.parameters[3..].copy_from_slice(&rotation);
        t
    }

    /// Set the fixed centre of rotation.
    pub fn with_center(mut self, center: Point<3>) -> Self {
        self.center = center;
        self
    }

    /// Get the center of rotation.
    pub fn center(&self) -> &Point<3> {
        &self.center
    }

    /// All parameters.
    pub fn parameters(&self) -> &[f64; RIGID_PARAMETERS] {
        &self.parameters
    }

    /// Get parameter `index`.
    pub fn parameter(&self, index: usize) -> f64 {
        self.parameters[index]
    }

    /// Set parameter `index`.
    pub fn set_parameter(&mut self, index: usize, value: f64) {
        self.parameters[index] = value;
    }

    /// Get the status of parameter `index`.
    pub fn status(&self, index: usize) -> DofStatus {
        self.status[index]
    }

    /// Set the status of parameter `index`.
    pub fn put_status(&mut self, index: usize, status: DofStatus) {
        self.status[index] = status;
    }

    /// Rotation part.
    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        let p = &self.parameters;
        rotation_matrix(p[3], p[4], p[5])
    }

    /// Homogeneous 4×4 matrix.
    pub fn matrix(&self) -> Matrix4<f64> {
        let p = &self.parameters;
        centred_matrix(&self.rotation_matrix(), &self.center, [p[0], p[1], p[2]])
    }

    /// Overwrite the parameters from a homogeneous matrix whose linear part is a rotation.
    pub fn set_matrix(&mut self, m: &Matrix4<f64>) {
        let r: Matrix3<f64> = m.fixed_view::<3, 3>(0, 0).into_owned();
        let (rx, ry, rz) = euler_angles(&r);
        let t = centred_translation(m, &self.center);
        self.parameters = [t[0], t[1], t[2], rx, ry, rz];
    }

    /// Map one point.
    pub fn transform_point(&self, point: &Point<3>) -> Point<3> {
        let m = self.matrix();
        Point(m.transform_point(&point.0))
    }

    /// Inverse transform about the same centre.
    pub fn inverse(&self) -> Self {
        let mut inverse = self.clone();
        let m = self.matrix();
        let r_t = self.rotation_matrix().transpose();
        let offset = -(r_t * m.fixed_view::<3, 1>(0, 3).into_owned());
        let mut m_inv = Matrix4::identity();
        m_inv.fixed_view_mut::<3, 3>(0, 0).copy_from(&r_t);
        m_inv.fixed_view_mut::<3, 1>(0, 3).copy_from(&offset);
        inverse.set_matrix(&m_inv);
        inverse
    }
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl<B: Backend> Transform<B, 3> for RigidTransform {
    fn transform_points(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        apply_homogeneous(&self.matrix(), points)
    }
}
