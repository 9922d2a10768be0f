//! Derivative-free optimizers for constrained transform parameters.
//!
//! # Examples
//!
//! ```rust
//! use svrb0_registration::optimizer::{Optimizer, PatternSearch, PatternSearchConfig};
//! use svrb0_registration::progress::ProgressTracker;
//!
//! let search = PatternSearch::new(PatternSearchConfig::new());
//! let result = search
//!     .minimize(&[0.0, 5.0], &[1.0, 0.0], |p| (p[0] - 3.0).powi(2), &ProgressTracker::new())
//!     .unwrap();
//! assert!((result.parameters[0] - 3.0).abs() < 1e-6);
//! assert_eq!(result.parameters[1], 5.0);
//! ```

pub mod trait_;
pub mod pattern_search;

pub use trait_::{OptimizationResult, Optimizer, StepDecay, StepScheduler};
pub use pattern_search::{PatternSearch, PatternSearchConfig};
