//! Core types for B0 distortion correction of diffusion stacks.
//!
//! Images keep their data as burn tensors (`[Z, Y, X]`, or `[C, Z, Y, X]` for
//! aggregates) and their geometry as nalgebra types. Transforms are parameter
//! vectors evaluated on the CPU point by point or batched on tensors.

pub mod image;
pub mod spatial;
pub mod transform;
pub mod interpolation;
pub mod filter;

pub use image::{Image, ImageMetadata, MultiChannelImage};
pub use spatial::{Direction, Point, Spacing, Vector};
pub use transform::{DofStatus, SpatialTransform, Transform};
