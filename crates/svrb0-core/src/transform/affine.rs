//! Affine transform with individually lockable parameters.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use nalgebra::{Matrix3, Matrix4};
use serde::{Deserialize, Serialize};
use crate::spatial::Point;
use super::rigid::{centred_matrix, centred_translation, euler_angles, rotation_matrix, RigidTransform};
use super::trait_::{apply_homogeneous, DofStatus, Transform};

/// Number of affine parameters.
pub const AFFINE_PARAMETERS: usize = 12;

/// Affine parameter indices. The first six coincide with the rigid ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AffineParameter {
    Tx = 0,
    Ty,
    Tz,
    Rx,
    Ry,
    Rz,
    Sx,
    Sy,
    Sz,
    Sxy,
    Syz,
    Sxz,
}

impl AffineParameter {
    pub const ALL: [AffineParameter; AFFINE_PARAMETERS] = [
        Self::Tx, Self::Ty, Self::Tz,
        Self::Rx, Self::Ry, Self::Rz,
        Self::Sx, Self::Sy, Self::Sz,
        Self::Sxy, Self::Syz, Self::Sxz,
    ];

    /// Position in the parameter vector.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Identity value: 1 for scales, 0 otherwise.
    pub fn identity_value(self) -> f64 {
        match self {
            Self::Sx | Self::Sy | Self::Sz => 1.0,
            _ => 0.0,
        }
    }
}

/// Affine transform `T(x) = A(x − c) + c + t` with `A = R · Shear · Scale`.
///
/// `R` is the rigid rotation `Rz·Ry·Rx`, `Scale = diag(sx, sy, sz)` and
/// `Shear` is upper triangular with `sxy` at (0,1), `sxz` at (0,2) and
/// `syz` at (1,2). Scales are factors (identity 1), shears tangents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffineTransform {
    parameters: [f64; AFFINE_PARAMETERS],
    status: [DofStatus; AFFINE_PARAMETERS],
    center: Point<3>,
}

impl AffineTransform {
    /// Identity about the world origin, every parameter active.
    pub fn identity() -> Self {
        Self {
            parameters: AffineParameter::ALL.map(AffineParameter::identity_value),
            status: [DofStatus::Active; AFFINE_PARAMETERS],
            center: Point::origin(),
        }
    }

    /// Affine transform equal to a rigid one.
    pub fn from_rigid(rigid: &RigidTransform) -> Self {
        let mut affine = Self::identity().with_center(*rigid.center());
        affine.parameters[..6].copy_from_slice(rigid.parameters());
        affine
    }

    /// Set the fixed centre.
    pub fn with_center(mut self, center: Point<3>) -> Self {
        self.center = center;
        self
    }

    /// Get the centre.
    pub fn center(&self) -> &Point<3> {
        &self.center
    }

    /// All parameters.
    pub fn parameters(&self) -> &[f64; AFFINE_PARAMETERS] {
        &self.parameters
    }

    /// Get parameter `index`.
    pub fn parameter(&self, index: usize) -> f64 {
        self.parameters[index]
    }

    /// Get a named parameter.
    pub fn get(&self, parameter: AffineParameter) -> f64 {
        self.parameters[parameter.index()]
    }

    /// Set parameter `index`.
    pub fn set_parameter(&mut self, index: usize, value: f64) {
        self.parameters[index] = value;
    }

    /// Get the status of parameter `index`.
    pub fn status(&self, index: usize) -> DofStatus {
        self.status[index]
    }

    /// Set the status of a named parameter.
    pub fn put_status(&mut self, parameter: AffineParameter, status: DofStatus) {
        self.status[parameter.index()] = status;
    }

    /// Linear part `A`.
    pub fn linear(&self) -> Matrix3<f64> {
        let p = &self.parameters;
        let r = rotation_matrix(p[3], p[4], p[5]);
        let shear = Matrix3::new(
            1.0, p[AffineParameter::Sxy.index()], p[AffineParameter::Sxz.index()],
            0.0, 1.0, p[AffineParameter::Syz.index()],
            0.0, 0.0, 1.0,
        );
        let scale = Matrix3::from_diagonal(&nalgebra::Vector3::new(p[6], p[7], p[8]));
        r * shear * scale
    }

    /// Homogeneous 4×4 matrix.
    pub fn matrix(&self) -> Matrix4<f64> {
        let p = &self.parameters;
        centred_matrix(&self.linear(), &self.center, [p[0], p[1], p[2]])
    }

    /// Overwrite every parameter so that [`matrix`](Self::matrix) returns `m`.
    ///
    /// Statuses and centre are kept. A reflection ends up as a negative `sz`.
    pub fn set_matrix(&mut self, m: &Matrix4<f64>) {
        let a: Matrix3<f64> = m.fixed_view::<3, 3>(0, 0).into_owned();
        let qr = a.qr();
        let mut q = qr.q();
        let mut u = qr.r();

        for i in 0..3 {
            if u[(i, i)] < 0.0 {
                u.row_mut(i).neg_mut();
                q.column_mut(i).neg_mut();
            }
        }
        if q.determinant() < 0.0 {
            u.row_mut(2).neg_mut();
            q.column_mut(2).neg_mut();
        }

        let (rx, ry, rz) = euler_angles(&q);
        let (sx, sy, sz) = (u[(0, 0)], u[(1, 1)], u[(2, 2)]);
        let t = centred_translation(m, &self.center);

        self.parameters = [
            t[0], t[1], t[2],
            rx, ry, rz,
            sx, sy, sz,
            u[(0, 1)] / sy, u[(1, 2)] / sz, u[(0, 2)] / sz,
        ];
    }

    /// Map one point.
    pub fn transform_point(&self, point: &Point<3>) -> Point<3> {
        Point(self.matrix().transform_point(&point.0))
    }

    /// Inverse transform, `None` for a singular linear part.
    pub fn try_inverse(&self) -> Option<Self> {
        let m_inv = self.matrix().try_inverse()?;
        let mut inverse = self.clone();
        inverse.set_matrix(&m_inv);
        Some(inverse)
    }

    /// Whether every parameter is finite.
    pub fn is_finite(&self) -> bool {
        self.parameters.iter().all(|p| p.is_finite())
    }
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl<B: Backend> Transform<B, 3> for AffineTransform {
    fn transform_points(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        apply_homogeneous(&self.matrix(), points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AffineTransform {
        let mut t = AffineTransform::identity().with_center(Point::new([2.0, -1.0, 0.5]));
        let values = [1.5, -0.5, 2.0, 0.1, -0.2, 0.3, 1.1, 0.9, 1.05, 0.05, -0.02, 0.03];
        for (i, v) in values.iter().enumerate() {
            t.set_parameter(i, *v);
        }
        t
    }

    #[test]
    fn test_identity_maps_points_to_themselves() {
        let t = AffineTransform::identity();
        let p = Point::new([1.0, 2.0, 3.0]);
        assert!(t.transform_point(&p).distance(&p) < 1e-12);
    }

    #[test]
    fn test_set_matrix_recovers_parameters() {
        let t = sample();
        let mut copy = AffineTransform::identity().with_center(*t.center());
        copy.set_matrix(&t.matrix());
        for i in 0..AFFINE_PARAMETERS {
            assert!((copy.parameter(i) - t.parameter(i)).abs() < 1e-9, "parameter {i}");
        }
    }

    #[test]
    fn test_inverse() {
        let t = sample();
        let inv = t.try_inverse().unwrap();
        let p = Point::new([3.0, 4.0, -5.0]);
        assert!(inv.transform_point(&t.transform_point(&p)).distance(&p) < 1e-9);
    }

    #[test]
    fn test_x_only_parameters_move_along_x() {
        let mut t = AffineTransform::identity();
        t.set_parameter(AffineParameter::Tx.index(), 2.0);
        t.set_parameter(AffineParameter::Sx.index(), 1.2);
        t.set_parameter(AffineParameter::Sxy.index(), 0.1);
        t.set_parameter(AffineParameter::Sxz.index(), -0.1);
        let p = Point::new([1.0, 2.0, 3.0]);
        let q = t.transform_point(&p);
        assert_eq!(q[1], p[1]);
        assert_eq!(q[2], p[2]);
        assert!((q[0] - (1.2 + 0.2 - 0.3 + 2.0)).abs() < 1e-12);
    }
}
