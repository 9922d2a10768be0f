//! Image similarity metrics.

pub mod trait_;
pub mod mse;

pub use trait_::{Metric, MetricValue, TargetSamples};
pub use mse::MeanSquaredDifference;
