//! Pipeline configuration.

use burn::config::Config;
use serde::{Deserialize, Serialize};
use crate::error::DistortionError;

/// How stacks are aggregated for field-map estimation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FieldMapPolicy {
    /// One field map from every stack, on the first stack's grid, using the
    /// first group's swap flag. Assumes all stacks share one geometry.
    #[default]
    Global,
    /// One field map per acquisition group, like the shim.
    PerGroup,
}

/// Settings of the distortion pipeline.
///
/// Physical sizes are in millimetres. The two resampling paddings apply both
/// to aggregation and to the final correction pass.
#[derive(Config, Debug)]
pub struct DistortionConfig {
    /// Resampled values at or below this count as no signal when aggregating.
    #[config(default = "0.01")]
    pub signal_threshold: f64,
    /// Target padding handed to the registration solver.
    #[config(default = "0.0")]
    pub registration_padding: f64,
    /// Output voxels whose reference value is `<=` this are left as padding.
    #[config(default = "-1.0")]
    pub correction_target_padding: f64,
    /// Value written where the input has no coverage.
    #[config(default = "0.0")]
    pub correction_source_padding: f64,
    /// Control-point spacing of the field-map lattice.
    #[config(default = "10.0")]
    pub control_point_spacing: f64,
    /// Initial displacement step of the field-map search.
    #[config(default = "1.0")]
    pub field_map_resolution: f64,
    /// Field-map aggregation granularity.
    #[config(default = "FieldMapPolicy::Global")]
    pub field_map_policy: FieldMapPolicy,
}

impl DistortionConfig {
    /// Reject settings no estimator can work with.
    pub fn validate(&self) -> crate::error::Result<()> {
        if !(self.signal_threshold.is_finite() && self.signal_threshold >= 0.0) {
            return Err(DistortionError::configuration(format!(
                "signal threshold must be finite and non-negative, got {}",
                self.signal_threshold
            )));
        }
        if !(self.control_point_spacing.is_finite() && self.control_point_spacing > 0.0) {
            return Err(DistortionError::configuration(format!(
                "control point spacing must be positive, got {}",
                self.control_point_spacing
            )));
        }
        if !(self.field_map_resolution.is_finite() && self.field_map_resolution > 0.0) {
            return Err(DistortionError::configuration(format!(
                "field map resolution must be positive, got {}",
                self.field_map_resolution
            )));
        }
        if self.correction_source_padding <= self.correction_target_padding {
            return Err(DistortionError::configuration(
                "source padding must lie above the target padding",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DistortionConfig::new();
        assert_eq!(config.signal_threshold, 0.01);
        assert_eq!(config.registration_padding, 0.0);
        assert_eq!(config.correction_target_padding, -1.0);
        assert_eq!(config.correction_source_padding, 0.0);
        assert_eq!(config.control_point_spacing, 10.0);
        assert_eq!(config.field_map_resolution, 1.0);
        assert_eq!(config.field_map_policy, FieldMapPolicy::Global);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_and_validation() {
        let config = DistortionConfig::new()
            .with_field_map_policy(FieldMapPolicy::PerGroup)
            .with_control_point_spacing(0.0);
        assert_eq!(config.field_map_policy, FieldMapPolicy::PerGroup);
        assert!(matches!(config.validate(), Err(DistortionError::Configuration(_))));
    }

    #[test]
    fn test_json_round_trip() {
        let config = DistortionConfig::new().with_signal_threshold(0.05);
        let json = serde_json::to_string(&config).unwrap();
        let restored: DistortionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.signal_threshold, 0.05);
        assert_eq!(restored.field_map_policy, FieldMapPolicy::Global);
    }
}
