//! Image and lattice orientation.

use nalgebra::SMatrix;
use serde::{Deserialize, Serialize};
use super::Vector;

/// Orientation matrix of an image or control-point lattice.
///
/// Column `i` is the world direction of the `i`-th grid axis. Axes are
/// expected to be orthonormal; nothing here re-orthogonalises them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Direction<const D: usize>(pub SMatrix<f64, D, D>);

impl<const D: usize> Direction<D> {
    /// Axes aligned with the world frame.
    pub fn identity() -> Self {
        Self(SMatrix::identity())
    }

    /// Check that the axes are unit length and mutually orthogonal.
    pub fn is_orthonormal(&self) -> bool {
        let product = self.0.transpose() * self.0;
        (0..D).all(|i| {
            (0..D).all(|j| {
                let expected = if i == j { 1.0 } else { 0.0 };
                (product[(i, j)] - expected).abs() < 1e-6
            })
        })
    }

    /// Direction of grid axis `axis` in world space.
    pub fn axis(&self, axis: usize) -> Vector<D> {
        Vector(self.0.column(axis).into_owned())
    }

    /// Transpose, which is the inverse for orthonormal axes.
    pub fn transpose(&self) -> Self {
        Self(self.0.transpose())
    }

    /// Try to compute the inverse of the direction matrix.
    pub fn try_inverse(&self) -> Option<Self> {
        self.0.try_inverse().map(Self)
    }

    /// Get the inner nalgebra matrix.
    pub fn inner(&self) -> &SMatrix<f64, D, D> {
        &self.0
    }
}

impl Direction<3> {
    /// Build from the three axis vectors.
    pub fn from_axes(x: Vector<3>, y: Vector<3>, z: Vector<3>) -> Self {
        Self(SMatrix::from_columns(&[x.0, y.0, z.0]))
    }

    /// Identity with the x and y axes exchanged.
    pub fn swap_xy() -> Self {
        Self::from_axes(Vector::unit(1), Vector::unit(0), Vector::unit(2))
    }
}

impl<const D: usize> std::ops::Index<(usize, usize)> for Direction<D> {
    type Output = f64;

    fn index(&self, index: (usize, usize)) -> &Self::Output {
        &self.0[index]
    }
}

impl<const D: usize> std::ops::Mul for Direction<D> {
    type Output = Self;

    fn mul(self, other: Self) -> Self::Output {
        Self(self.0 * other.0)
    }
}

impl<const D: usize> std::ops::Mul<Vector<D>> for Direction<D> {
    type Output = Vector<D>;

    fn mul(self, vector: Vector<D>) -> Self::Output {
        Vector(self.0 * vector.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Direction3 = Direction<3>;
    type Vector3 = Vector<3>;

    #[test]
    fn test_identity_axes() {
        let d = Direction3::identity();
        assert!(d.is_orthonormal());
        assert_eq!(d.axis(0), Vector3::new([1.0, 0.0, 0.0]));
        assert_eq!(d.axis(2), Vector3::new([0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_swap_xy_is_involution() {
        let s = Direction3::swap_xy();
        assert!(s.is_orthonormal());
        assert_eq!(s.axis(0), Vector3::new([0.0, 1.0, 0.0]));
        assert_eq!(s * s, Direction3::identity());
        assert_eq!(s.transpose(), s);
    }

    #[test]
    fn test_non_orthonormal_detected() {
        let d = Direction3::from_axes(
            Vector3::new([1.0, 0.0, 0.0]),
            Vector3::new([1.0, 1.0, 0.0]),
            Vector3::new([0.0, 0.0, 1.0]),
        );
        assert!(!d.is_orthonormal());
    }
}
