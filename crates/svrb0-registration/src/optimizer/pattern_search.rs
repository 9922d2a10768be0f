//! Compass (pattern) search with step halving.
//!
//! Each iteration visits every free parameter once and tries a step up and a
//! step down, keeping the first move that lowers the objective. A level ends
//! when an iteration no longer improves the objective by the configured
//! relative amount; the next level repeats with smaller steps.

use burn::config::Config;
use crate::error::RegistrationError;
use crate::progress::ProgressTracker;
use crate::validation::{validate_iterations, validate_step_decay, ConvergenceChecker};
use super::trait_::{OptimizationResult, Optimizer, StepDecay, StepScheduler};

/// Configuration for [`PatternSearch`].
#[derive(Config, Debug)]
pub struct PatternSearchConfig {
    /// Number of step levels.
    #[config(default = "4")]
    pub levels: usize,
    /// Iteration budget per level.
    #[config(default = "40")]
    pub max_iterations: usize,
    /// Step multiplier between levels.
    #[config(default = "0.5")]
    pub step_decay: f64,
    /// Relative objective improvement below which a level stops.
    #[config(default = "1e-6")]
    pub min_improvement: f64,
}

/// Pattern search optimizer.
#[derive(Debug)]
pub struct PatternSearch {
    config: PatternSearchConfig,
}

impl PatternSearch {
    /// Create a pattern search with `config`.
    pub fn new(config: PatternSearchConfig) -> Self {
        Self { config }
    }

    /// The configuration in use.
    pub fn config(&self) -> &PatternSearchConfig {
        &self.config
    }

    fn validate(&self, initial: &[f64], steps: &[f64]) -> crate::error::Result<()> {
        if self.config.levels == 0 {
            return Err(RegistrationError::invalid_configuration(
                "Pattern search needs at least one level",
            ));
        }
        validate_iterations(self.config.max_iterations)?;
        validate_step_decay(self.config.step_decay)?;
        if initial.len() != steps.len() {
            return Err(RegistrationError::shape_mismatch(&[initial.len()], &[steps.len()]));
        }
        Ok(())
    }
}

impl Default for PatternSearch {
    fn default() -> Self {
        Self::new(PatternSearchConfig::new())
    }
}

impl Optimizer for PatternSearch {
    fn minimize<F>(
        &self,
        initial: &[f64],
        steps: &[f64],
        mut objective: F,
        progress: &ProgressTracker,
    ) -> crate::error::Result<OptimizationResult>
    where
        F: FnMut(&[f64]) -> f64,
    {
        self.validate(initial, steps)?;

        let free: Vec<usize> = steps
            .iter()
            .enumerate()
            .filter(|(_, step)| step.is_finite() && **step != 0.0)
            .map(|(i, _)| i)
            .collect();
        if free.is_empty() {
            return Err(RegistrationError::invalid_configuration(
                "Pattern search has no free parameter",
            ));
        }

        let mut x = initial.to_vec();
        let mut best = objective(&x);
        let mut evaluations = 1;
        if !best.is_finite() {
            return Err(RegistrationError::convergence_failure(
                "objective is not finite at the initial parameters",
            ));
        }

        let scheduler = StepDecay::new(1, self.config.step_decay);
        let checker = ConvergenceChecker::new(self.config.min_improvement, 1);

        for level in 0..self.config.levels {
            let mut history = vec![best];
            for iteration in 1..=self.config.max_iterations {
                for &i in &free {
                    let step = scheduler.get_step(level, steps[i]);
                    let previous = x[i];
                    for delta in [step, -step] {
                        x[i] = previous + delta;
                        let value = objective(&x);
                        evaluations += 1;
                        if value < best {
                            best = value;
                            break;
                        }
                        x[i] = previous;
                    }
                }

                history.push(best);
                progress.update(
                    level,
                    iteration,
                    Some(self.config.max_iterations),
                    best,
                    scheduler.get_step(level, 1.0),
                );
                if checker.check_convergence(&history) {
                    break;
                }
            }
            tracing::debug!(level, loss = best, evaluations, "pattern search level finished");
        }

        Ok(OptimizationResult {
            parameters: x,
            value: best,
            evaluations,
        })
    }
}
