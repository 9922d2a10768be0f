//! Spatial transforms.
//!
//! Rigid and affine transforms are parameter vectors with per-parameter
//! [`DofStatus`]; the free-form transform adds a B-spline control-point
//! lattice. [`SpatialTransform`] is the tagged union the pipeline passes
//! around.

pub mod trait_;
pub mod rigid;
pub mod affine;
pub mod freeform;
pub mod variant;

pub use trait_::{DofStatus, Transform};
pub use rigid::RigidTransform;
pub use affine::{AffineParameter, AffineTransform};
pub use freeform::{ControlPointLattice, FreeFormTransform};
pub use variant::SpatialTransform;
