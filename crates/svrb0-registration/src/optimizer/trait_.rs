//! Optimizer trait for derivative-free parameter search.

use crate::error::Result;
use crate::progress::ProgressTracker;

/// Outcome of a minimization.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationResult {
    /// Final parameter vector.
    pub parameters: Vec<f64>,
    /// Objective value at `parameters`.
    pub value: f64,
    /// Number of objective evaluations, including the initial one.
    pub evaluations: usize,
}

/// Optimizer over a flat parameter vector.
///
/// A parameter whose initial step is 0 is never written; this is how locked
/// degrees of freedom stay at their initial value.
pub trait Optimizer {
    /// Minimize `objective` starting from `initial`.
    ///
    /// # Arguments
    /// * `initial` - Starting parameters
    /// * `steps` - Initial step size per parameter (0 for locked parameters)
    /// * `objective` - Function to minimize; non-finite values are never accepted
    /// * `progress` - Receives one update per iteration
    fn minimize<F>(
        &self,
        initial: &[f64],
        steps: &[f64],
        objective: F,
        progress: &ProgressTracker,
    ) -> Result<OptimizationResult>
    where
        F: FnMut(&[f64]) -> f64;
}

/// Step size scheduler.
///
/// Schedulers shrink the search steps from one level to the next.
pub trait StepScheduler: Send + Sync {
    /// Step size at `level` for an initial step `initial`.
    fn get_step(&self, level: usize, initial: f64) -> f64;
}

/// Step decay scheduler.
///
/// Multiplies the step by `gamma` every `step_size` levels.
#[derive(Debug, Clone)]
pub struct StepDecay {
    step_size: usize,
    gamma: f64,
}

impl StepDecay {
    /// Create a new step decay scheduler.
    ///
    /// # Arguments
    /// * `step_size` - Number of levels between reductions
    /// * `gamma` - Multiplicative factor in (0, 1]
    pub fn new(step_size: usize, gamma: f64) -> Self {
        assert!(gamma > 0.0 && gamma <= 1.0, "Gamma must be in (0, 1]");
        assert!(step_size > 0, "Step size must be positive");
        Self { step_size, gamma }
    }
}

impl StepScheduler for StepDecay {
    fn get_step(&self, level: usize, initial: f64) -> f64 {
        let exponent = level / self.step_size;
        initial * self.gamma.powi(exponent as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_decay() {
        let decay = StepDecay::new(1, 0.5);
        assert_eq!(decay.get_step(0, 2.0), 2.0);
        assert_eq!(decay.get_step(1, 2.0), 1.0);
        assert_eq!(decay.get_step(3, 2.0), 0.25);

        let slow = StepDecay::new(2, 0.5);
        assert_eq!(slow.get_step(1, 2.0), 2.0);
        assert_eq!(slow.get_step(2, 2.0), 1.0);
    }

    #[test]
    #[should_panic(expected = "Gamma must be in (0, 1]")]
    fn test_step_decay_rejects_growth() {
        StepDecay::new(1, 2.0);
    }
}
