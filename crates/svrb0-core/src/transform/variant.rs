//! The tagged transform type handed between registration and correction.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};
use crate::spatial::Point;
use super::affine::{AffineTransform, AFFINE_PARAMETERS};
use super::freeform::{ControlPointLattice, FreeFormTransform};
use super::rigid::{RigidTransform, RIGID_PARAMETERS};
use super::trait_::{DofStatus, Transform};

/// Rigid, affine or free-form transform.
///
/// Parameters are addressed by a flat index; for free-form transforms they
/// are the lattice components, the affine base is held fixed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SpatialTransform {
    Rigid(RigidTransform),
    Affine(AffineTransform),
    FreeForm(FreeFormTransform),
}

impl SpatialTransform {
    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Rigid(_) => "rigid",
            Self::Affine(_) => "affine",
            Self::FreeForm(_) => "free-form",
        }
    }

    /// Number of addressable parameters.
    pub fn num_parameters(&self) -> usize {
        match self {
            Self::Rigid(_) => RIGID_PARAMETERS,
            Self::Affine(_) => AFFINE_PARAMETERS,
            Self::FreeForm(t) => t.num_parameters(),
        }
    }

    /// Get parameter `index`.
    pub fn parameter(&self, index: usize) -> f64 {
        match self {
            Self::Rigid(t) => t.parameter(index),
            Self::Affine(t) => t.parameter(index),
            Self::FreeForm(t) => t.parameter(index),
        }
    }

    /// Set parameter `index`.
    pub fn set_parameter(&mut self, index: usize, value: f64) {
        match self {
            Self::Rigid(t) => t.set_parameter(index, value),
            Self::Affine(t) => t.set_parameter(index, value),
            Self::FreeForm(t) => t.set_parameter(index, value),
        }
    }

    /// Status of parameter `index`.
    pub fn status(&self, index: usize) -> DofStatus {
        match self {
            Self::Rigid(t) => t.status(index),
            Self::Affine(t) => t.status(index),
            Self::FreeForm(t) => t.status(index),
        }
    }

    /// Indices of the active parameters.
    pub fn active_parameters(&self) -> Vec<usize> {
        (0..self.num_parameters())
            .filter(|&i| self.status(i) == DofStatus::Active)
            .collect()
    }

    /// Whether every parameter is finite.
    pub fn is_finite(&self) -> bool {
        (0..self.num_parameters()).all(|i| self.parameter(i).is_finite())
    }

    /// Map one point.
    pub fn transform_point(&self, point: &Point<3>) -> Point<3> {
        match self {
            Self::Rigid(t) => t.transform_point(point),
            Self::Affine(t) => t.transform_point(point),
            Self::FreeForm(t) => t.transform_point(point),
        }
    }

    /// The control-point lattice, for free-form transforms.
    pub fn lattice(&self) -> Option<&ControlPointLattice> {
        match self {
            Self::FreeForm(t) => Some(t.lattice()),
            _ => None,
        }
    }

    /// The affine view of a linear transform.
    pub fn as_affine(&self) -> Option<AffineTransform> {
        match self {
            Self::Rigid(t) => Some(AffineTransform::from_rigid(t)),
            Self::Affine(t) => Some(t.clone()),
            Self::FreeForm(_) => None,
        }
    }
}

impl From<RigidTransform> for SpatialTransform {
    fn from(t: RigidTransform) -> Self {
        Self::Rigid(t)
    }
}

impl From<AffineTransform> for SpatialTransform {
    fn from(t: AffineTransform) -> Self {
        Self::Affine(t)
    }
}

impl From<FreeFormTransform> for SpatialTransform {
    fn from(t: FreeFormTransform) -> Self {
        Self::FreeForm(t)
    }
}

impl<B: Backend> Transform<B, 3> for SpatialTransform {
    fn transform_points(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        match self {
            Self::Rigid(t) => Transform::<B, 3>::transform_points(t, points),
            Self::Affine(t) => Transform::<B, 3>::transform_points(t, points),
            Self::FreeForm(t) => Transform::<B, 3>::transform_points(t, points),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageMetadata;
    use crate::transform::affine::AffineParameter;

    #[test]
    fn test_active_parameters_follow_status() {
        let mut affine = AffineTransform::identity();
        for p in AffineParameter::ALL {
            affine.put_status(p, DofStatus::Passive);
        }
        affine.put_status(AffineParameter::Tx, DofStatus::Active);
        affine.put_status(AffineParameter::Sxz, DofStatus::Active);
        let t = SpatialTransform::from(affine);
        assert_eq!(t.active_parameters(), vec![0, 11]);
    }

    #[test]
    fn test_lattice_access_by_variant() {
        let lattice = ControlPointLattice::new([4, 4, 4], ImageMetadata::default());
        let free = SpatialTransform::from(FreeFormTransform::new(lattice));
        assert!(free.lattice().is_some());
        assert!(free.as_affine().is_none());
        assert!(SpatialTransform::from(RigidTransform::identity()).lattice().is_none());
    }

    #[test]
    fn test_json_roundtrip_keeps_parameters() {
        let t = SpatialTransform::from(RigidTransform::new([1.0, 2.0, 3.0], [0.1, 0.0, -0.1]));
        let json = serde_json::to_string(&t).unwrap();
        let back: SpatialTransform = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }
}
