//! Spatial types: points, vectors, spacing and orientation.
//!
//! All types wrap nalgebra and compute in `f64` on the CPU; tensors only
//! enter at the image and transform level.

pub mod point;
pub mod vector;
pub mod spacing;
pub mod direction;

pub use point::Point;
pub use vector::Vector;
pub use spacing::Spacing;
pub use direction::Direction;

pub type Point3 = Point<3>;
pub type Vector3 = Vector<3>;
pub type Spacing3 = Spacing<3>;
pub type Direction3 = Direction<3>;
