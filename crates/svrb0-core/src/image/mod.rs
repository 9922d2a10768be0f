//! Image types.
//!
//! `Image` carries one scalar volume, `MultiChannelImage` a stack of volumes
//! resampled onto one grid.

pub mod image;
pub mod metadata;
pub mod multichannel;
pub mod grid;

pub use image::Image;
pub use metadata::ImageMetadata;
pub use multichannel::MultiChannelImage;
pub use grid::generate_grid_3d;
