//! Error types for the distortion pipeline.
//!
//! Every failure voids the correction cycle it occurred in; nothing here is
//! retried automatically.

use svrb0_registration::RegistrationError;
use thiserror::Error;

/// Main error type for distortion estimation and correction.
#[derive(Error, Debug)]
pub enum DistortionError {
    /// Empty stack set, mismatched group assignment or unusable geometry.
    #[error("Input error: {0}")]
    Input(String),

    /// The registration solver failed or returned a degenerate transform.
    #[error("Convergence error in group {group}: {source}")]
    Convergence {
        group: usize,
        #[source]
        source: RegistrationError,
    },

    /// Rejected configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Result type for distortion operations.
pub type Result<T> = std::result::Result<T, DistortionError>;

impl DistortionError {
    /// Create an input error.
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    /// Create a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Wrap a registration failure for acquisition group `group`.
    pub fn convergence(group: usize, source: RegistrationError) -> Self {
        Self::Convergence { group, source }
    }
}
