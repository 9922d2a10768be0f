//! Constrained intensity-based registration.
//!
//! The distortion estimators only need a black box that fits a transform
//! with some parameters locked. [`RegistrationSolver`] is that contract and
//! [`ImageRegistration`] implements it with a mean squared difference metric
//! and a pattern search over the active parameters.

pub mod metric;
pub mod optimizer;
pub mod registration;
pub mod error;
pub mod validation;
pub mod progress;

pub use error::{RegistrationError, Result};
pub use validation::ConvergenceChecker;
pub use progress::{ProgressCallback, ProgressTracker, ConsoleProgressCallback, HistoryCallback, ProgressInfo};
pub use optimizer::{PatternSearch, PatternSearchConfig};
pub use registration::{ImageRegistration, ParameterGuess, RegistrationSolver, StepSizes};
