//! Persistence for svrb0 images and transforms.
//!
//! Volumes go through NIfTI-1 (3D images and 4D multi-channel aggregates,
//! geometry stored as an sform), transforms through JSON.

pub mod nifti_io;
pub mod transform_io;

pub use nifti_io::{read_nifti, read_nifti_4d, write_nifti, write_nifti_4d};
pub use transform_io::{read_transform, write_transform};
