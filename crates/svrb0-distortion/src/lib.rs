//! B0 distortion correction for fetal diffusion stacks.
//!
//! Acquired stacks are compared with stacks simulated from the current
//! reconstruction. The mismatch along the distortion axis is fitted either as
//! a shim (constrained affine, one per acquisition group) or as a field map
//! (single-axis B-spline deformation), and the original stacks are resampled
//! through the result.
//!
//! ```text
//! simulate -> aggregate -> normalize -> estimate -> re-anchor -> apply
//! ```
//!
//! [`DistortionCorrector`] runs whole cycles; the stage functions are public
//! for callers that drive the steps themselves.

pub mod aggregate;
pub mod config;
pub mod correction;
pub mod debug;
pub mod error;
pub mod fieldmap;
pub mod groups;
pub mod orientation;
pub mod pipeline;
pub mod shim;
pub mod simulation;
pub mod stack_registration;
pub mod template;

pub use aggregate::{stack_volumes, VolumeAggregator};
pub use config::{DistortionConfig, FieldMapPolicy};
pub use correction::{apply_correction, apply_corrections};
pub use debug::{DebugArtifact, DebugSink, NiftiDebugSink, NullSink};
pub use error::{DistortionError, Result};
pub use fieldmap::estimate_field_map;
pub use groups::AcquisitionGroups;
pub use orientation::{normalize_aggregate, normalize_image, OrientationTransform};
pub use pipeline::DistortionCorrector;
pub use shim::{estimate_shim, shim_transform};
pub use simulation::{Reconstruction, ReconstructionState, SimulationProvider};
pub use stack_registration::register_stacks;
pub use template::{align_template, resample_template};
