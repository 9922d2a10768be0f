//! Image filters.

pub mod gaussian;
pub mod resample;

pub use gaussian::GaussianFilter;
pub use resample::ResampleImageFilter;
