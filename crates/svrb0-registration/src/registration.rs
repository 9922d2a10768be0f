//! The registration solver contract and its intensity-based implementation.

use std::sync::Arc;
use burn::tensor::backend::Backend;
use svrb0_core::image::MultiChannelImage;
use svrb0_core::transform::{DofStatus, SpatialTransform};
use crate::error::{RegistrationError, Result};
use crate::metric::{MeanSquaredDifference, Metric, TargetSamples};
use crate::optimizer::{Optimizer, PatternSearch, PatternSearchConfig};
use crate::progress::{ProgressCallback, ProgressTracker};
use crate::validation::{validate_channel_pairing, validate_image, validate_transform};

/// Initial search scale hint.
///
/// Each variant fixes the initial step of every parameter class; physical
/// sizes are in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ParameterGuess {
    /// Generic steps: 1 mm, 1 degree, 1 % scale and shear.
    #[default]
    Default,
    /// Rigid alignment of thick-slice stacks.
    ThickSlices { voxel_size: f64 },
    /// Constrained affine shim fitting.
    Distortion { voxel_size: f64 },
    /// Free-form field-map fitting.
    FieldMap {
        resolution: f64,
        control_point_spacing: f64,
    },
}

/// Initial step per parameter class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepSizes {
    pub translation: f64,
    /// Radians.
    pub rotation: f64,
    pub scale: f64,
    pub shear: f64,
    pub displacement: f64,
}

impl ParameterGuess {
    /// Step sizes for this guess.
    pub fn step_sizes(&self) -> StepSizes {
        let degree = 1f64.to_radians();
        match *self {
            Self::Default => StepSizes {
                translation: 1.0,
                rotation: degree,
                scale: 0.01,
                shear: 0.01,
                displacement: 1.0,
            },
            Self::ThickSlices { voxel_size } => StepSizes {
                translation: 2.0 * voxel_size,
                rotation: 2.0 * degree,
                scale: 0.02,
                shear: 0.02,
                displacement: 2.0 * voxel_size,
            },
            Self::Distortion { voxel_size } => StepSizes {
                translation: voxel_size,
                rotation: degree,
                scale: 0.02,
                shear: 0.02,
                displacement: voxel_size,
            },
            Self::FieldMap { resolution, .. } => StepSizes {
                translation: resolution,
                rotation: degree,
                scale: 0.01,
                shear: 0.01,
                displacement: resolution,
            },
        }
    }

    /// Initial step for every parameter of `transform`, 0 where passive.
    pub fn steps(&self, transform: &SpatialTransform) -> Vec<f64> {
        let sizes = self.step_sizes();
        (0..transform.num_parameters())
            .map(|i| {
                if transform.status(i) == DofStatus::Passive {
                    return 0.0;
                }
                match transform {
                    SpatialTransform::Rigid(_) if i < 3 => sizes.translation,
                    SpatialTransform::Rigid(_) => sizes.rotation,
                    SpatialTransform::Affine(_) => match i {
                        0..=2 => sizes.translation,
                        3..=5 => sizes.rotation,
                        6..=8 => sizes.scale,
                        _ => sizes.shear,
                    },
                    SpatialTransform::FreeForm(_) => sizes.displacement,
                }
            })
            .collect()
    }
}

/// A black-box registration capability.
///
/// The fitted transform maps target world positions to source world
/// positions: `target(x) ≈ source(T(x))`.
pub trait RegistrationSolver<B: Backend> {
    /// Set the fixed (target) and moving (source) volumes. Channel `c` of the
    /// target is compared with channel `c` of the source.
    fn set_target_source(&mut self, target: MultiChannelImage<B>, source: MultiChannelImage<B>);

    /// Set the transform to fit; its passive parameters are never changed.
    fn set_output(&mut self, transform: SpatialTransform);

    /// Set the initial search scale.
    fn guess_initial_parameters(&mut self, guess: ParameterGuess);

    /// Target voxels with a value `<=` this are ignored.
    fn set_target_padding(&mut self, padding: f64);

    /// Fit the output transform and return it.
    fn run(&mut self) -> Result<SpatialTransform>;
}

/// Intensity-based registration: a metric minimized by a pattern search.
pub struct ImageRegistration<B: Backend, M: Metric<B> = MeanSquaredDifference> {
    metric: M,
    optimizer: PatternSearch,
    target: Option<MultiChannelImage<B>>,
    source: Option<MultiChannelImage<B>>,
    output: Option<SpatialTransform>,
    guess: ParameterGuess,
    target_padding: f64,
    progress: ProgressTracker,
}

impl<B: Backend> Default for ImageRegistration<B> {
    fn default() -> Self {
        Self::new(MeanSquaredDifference::new(), PatternSearchConfig::new())
    }
}

impl<B: Backend, M: Metric<B>> ImageRegistration<B, M> {
    /// Create a registration with `metric` and a pattern search configured by `config`.
    pub fn new(metric: M, config: PatternSearchConfig) -> Self {
        Self {
            metric,
            optimizer: PatternSearch::new(config),
            target: None,
            source: None,
            output: None,
            guess: ParameterGuess::Default,
            target_padding: f64::NEG_INFINITY,
            progress: ProgressTracker::new(),
        }
    }

    /// Register a progress callback.
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress.add_callback(callback);
        self
    }

    /// The last fitted (or configured) output transform.
    pub fn output(&self) -> Option<&SpatialTransform> {
        self.output.as_ref()
    }

    fn fit(&self) -> Result<SpatialTransform> {
        let (Some(target), Some(source)) = (&self.target, &self.source) else {
            return Err(RegistrationError::invalid_configuration(
                "target and source must be set before running",
            ));
        };
        let Some(output) = &self.output else {
            return Err(RegistrationError::invalid_configuration(
                "output transform must be set before running",
            ));
        };

        validate_image(target, "target")?;
        validate_image(source, "source")?;
        validate_channel_pairing(target, source)?;
        validate_transform(output)?;

        let samples = TargetSamples::new(target, self.target_padding);
        let start = self.metric.evaluate(&samples, source, output);
        if !start.has_overlap() {
            return Err(RegistrationError::convergence_failure(
                "target and source do not overlap",
            ));
        }

        let active = output.active_parameters();
        tracing::info!(
            "Registering {} transform ({} active parameters, {} channels), initial {} = {:.6}",
            output.kind(),
            active.len(),
            target.num_channels(),
            self.metric.name(),
            start.value
        );

        let initial: Vec<f64> = (0..output.num_parameters()).map(|i| output.parameter(i)).collect();
        let steps = self.guess.steps(output);

        let mut working = output.clone();
        let result = self.optimizer.minimize(
            &initial,
            &steps,
            |parameters| {
                for &i in &active {
                    working.set_parameter(i, parameters[i]);
                }
                let value = self.metric.evaluate(&samples, source, &working);
                if value.has_overlap() {
                    value.value
                } else {
                    f64::INFINITY
                }
            },
            &self.progress,
        )?;

        let mut fitted = output.clone();
        for &i in &active {
            fitted.set_parameter(i, result.parameters[i]);
        }
        if !fitted.is_finite() || !result.value.is_finite() {
            return Err(RegistrationError::numerical_instability(
                "registration produced a non-finite transform",
            ));
        }

        tracing::info!(
            "Registration finished: {} = {:.6} after {} evaluations",
            self.metric.name(),
            result.value,
            result.evaluations
        );
        self.progress.complete(result.value);
        Ok(fitted)
    }
}

impl<B: Backend, M: Metric<B>> RegistrationSolver<B> for ImageRegistration<B, M> {
    fn set_target_source(&mut self, target: MultiChannelImage<B>, source: MultiChannelImage<B>) {
        self.target = Some(target);
        self.source = Some(source);
    }

    fn set_output(&mut self, transform: SpatialTransform) {
        self.output = Some(transform);
    }

    fn guess_initial_parameters(&mut self, guess: ParameterGuess) {
        self.guess = guess;
    }

    fn set_target_padding(&mut self, padding: f64) {
        self.target_padding = padding;
    }

    fn run(&mut self) -> Result<SpatialTransform> {
        self.progress.start();
        match self.fit() {
            Ok(fitted) => {
                self.output = Some(fitted.clone());
                Ok(fitted)
            }
            Err(err) => {
                self.progress.error(&err.to_string());
                Err(err)
            }
        }
    }
}
