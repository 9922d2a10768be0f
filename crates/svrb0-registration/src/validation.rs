//! Validation utilities for registration operations.
//!
//! Input checks run before any metric evaluation so that a bad call fails
//! fast with a typed error instead of producing a meaningless transform.

use burn::tensor::{backend::Backend, ElementConversion};
use svrb0_core::image::MultiChannelImage;
use svrb0_core::transform::SpatialTransform;
use crate::error::{RegistrationError, Result};

/// Validate that target and source carry the same number of channels.
///
/// Spatial shapes may differ: the source is sampled through the transform.
pub fn validate_channel_pairing<B: Backend>(
    target: &MultiChannelImage<B>,
    source: &MultiChannelImage<B>,
) -> Result<()> {
    if target.num_channels() != source.num_channels() {
        return Err(RegistrationError::shape_mismatch(
            &target.data().dims(),
            &source.data().dims(),
        ));
    }
    Ok(())
}

/// Validate that every voxel of an image is finite and the grid is non-empty.
pub fn validate_image<B: Backend>(image: &MultiChannelImage<B>, role: &str) -> Result<()> {
    let dims = image.data().dims();
    if dims.iter().any(|&n| n == 0) {
        return Err(RegistrationError::image_validation(format!(
            "{} image is empty: {:?}",
            role, dims
        )));
    }
    if !image.metadata().spacing().is_valid() {
        return Err(RegistrationError::image_validation(format!(
            "{} image has non-positive spacing",
            role
        )));
    }

    let finite = image
        .data()
        .clone()
        .is_nan()
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>()
        == 0;
    if !finite {
        return Err(RegistrationError::numerical_instability(format!(
            "{} image contains NaN values",
            role
        )));
    }
    Ok(())
}

/// Validate that a transform has something to optimize and starts finite.
pub fn validate_transform(transform: &SpatialTransform) -> Result<()> {
    if transform.active_parameters().is_empty() {
        return Err(RegistrationError::invalid_configuration(format!(
            "{} transform has no active parameter",
            transform.kind()
        )));
    }
    if !transform.is_finite() {
        return Err(RegistrationError::numerical_instability(
            "initial transform has non-finite parameters",
        ));
    }
    Ok(())
}

/// Validate iteration count.
pub fn validate_iterations(iterations: usize) -> Result<()> {
    if iterations == 0 {
        return Err(RegistrationError::invalid_configuration(
            "Iterations must be positive",
        ));
    }

    if iterations > 1_000_000 {
        return Err(RegistrationError::invalid_configuration(
            format!("Iterations too large: {}", iterations),
        ));
    }

    Ok(())
}

/// Validate a pattern-search step decay factor.
pub fn validate_step_decay(decay: f64) -> Result<()> {
    if !(decay > 0.0 && decay < 1.0) {
        return Err(RegistrationError::invalid_configuration(
            format!("Step decay must lie in (0, 1), got {}", decay),
        ));
    }
    Ok(())
}

/// Check for convergence based on loss history.
#[derive(Debug, Clone)]
pub struct ConvergenceChecker {
    /// Minimum relative improvement to keep going.
    pub min_improvement: f64,
    /// Number of iterations to check for improvement.
    pub patience: usize,
    /// Minimum absolute loss to consider converged.
    pub min_loss: Option<f64>,
}

impl Default for ConvergenceChecker {
    fn default() -> Self {
        Self {
            min_improvement: 1e-6,
            patience: 1,
            min_loss: None,
        }
    }
}

impl ConvergenceChecker {
    /// Create a new convergence checker.
    pub fn new(min_improvement: f64, patience: usize) -> Self {
        Self {
            min_improvement,
            patience,
            min_loss: None,
        }
    }

    /// Set minimum loss threshold.
    pub fn with_min_loss(mut self, min_loss: f64) -> Self {
        self.min_loss = Some(min_loss);
        self
    }

    /// Check if converged based on loss history.
    pub fn check_convergence(&self, loss_history: &[f64]) -> bool {
        let Some(&current_loss) = loss_history.last() else {
            return false;
        };

        if let Some(min_loss) = self.min_loss {
            if current_loss < min_loss {
                return true;
            }
        }

        if loss_history.len() < self.patience + 1 {
            return false;
        }

        let reference = loss_history[loss_history.len() - self.patience - 1];
        let relative_improvement = (reference - current_loss) / (reference.abs() + 1e-10);

        relative_improvement < self.min_improvement
    }
}
