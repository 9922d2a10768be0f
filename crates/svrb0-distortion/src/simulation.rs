//! Collaborators that own the current reconstruction.
//!
//! The pipeline only reads the reconstruction: simulated stacks come from a
//! [`SimulationProvider`], the reconstructed volume and its brain mask from a
//! [`ReconstructionState`].

use burn::tensor::backend::Backend;
use svrb0_core::filter::ResampleImageFilter;
use svrb0_core::image::Image;
use svrb0_core::interpolation::LinearInterpolator;
use svrb0_core::transform::RigidTransform;
use crate::error::{DistortionError, Result};

/// Produces the simulated counterpart of every acquired stack.
pub trait SimulationProvider<B: Backend> {
    /// One simulated volume per stack, same order and grid as `stacks`.
    fn simulate(&self, stacks: &[Image<B, 3>]) -> Result<Vec<Image<B, 3>>>;

    /// Voxel size (x) of the volume the simulation is drawn from, in mm.
    fn voxel_size(&self) -> f64;
}

/// Read-only view of the reconstruction estimate.
pub trait ReconstructionState<B: Backend> {
    /// Current reconstructed volume.
    fn reconstruction(&self) -> &Image<B, 3>;

    /// Brain mask on (or overlapping) the reconstruction grid, if any.
    fn mask(&self) -> Option<&Image<B, 3>>;
}

/// A reconstructed volume with an optional mask.
///
/// Simulates stacks by sampling the volume on each stack grid with trilinear
/// interpolation; voxels outside the volume are 0.
#[derive(Debug, Clone)]
pub struct Reconstruction<B: Backend> {
    volume: Image<B, 3>,
    mask: Option<Image<B, 3>>,
}

impl<B: Backend> Reconstruction<B> {
    /// Wrap a reconstructed volume.
    pub fn new(volume: Image<B, 3>) -> Self {
        Self { volume, mask: None }
    }

    /// Attach a brain mask.
    pub fn with_mask(mut self, mask: Image<B, 3>) -> Self {
        self.mask = Some(mask);
        self
    }

    /// Replace the volume, keeping the mask.
    pub fn set_volume(&mut self, volume: Image<B, 3>) {
        self.volume = volume;
    }
}

impl<B: Backend> ReconstructionState<B> for Reconstruction<B> {
    fn reconstruction(&self) -> &Image<B, 3> {
        &self.volume
    }

    fn mask(&self) -> Option<&Image<B, 3>> {
        self.mask.as_ref()
    }
}

impl<B: Backend> SimulationProvider<B> for Reconstruction<B> {
    fn simulate(&self, stacks: &[Image<B, 3>]) -> Result<Vec<Image<B, 3>>> {
        if stacks.is_empty() {
            return Err(DistortionError::input("no stacks to simulate"));
        }
        let identity = RigidTransform::identity();
        Ok(stacks
            .iter()
            .map(|stack| {
                ResampleImageFilter::new_from_reference(stack, &identity, LinearInterpolator::new())
                    .with_source_padding(0.0)
                    .apply(&self.volume)
            })
            .collect())
    }

    fn voxel_size(&self) -> f64 {
        self.volume.spacing()[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::Tensor;
    use burn_ndarray::NdArray;
    use svrb0_core::spatial::{Direction, Point, Spacing};

    type B = NdArray<f32>;

    #[test]
    fn test_simulation_follows_stack_grid() {
        let device = Default::default();
        let volume = Image::<B, 3>::new(
            Tensor::ones([6, 6, 6], &device).mul_scalar(4.0),
            Point::origin(),
            Spacing::uniform(0.75),
            Direction::identity(),
        );
        let stack = Image::<B, 3>::new(
            Tensor::zeros([2, 3, 3], &device),
            Point::new([1.0, 1.0, 1.0]),
            Spacing::new([1.0, 1.0, 3.0]),
            Direction::identity(),
        );

        let recon = Reconstruction::new(volume);
        assert_eq!(recon.voxel_size(), 0.75);
        assert!(recon.mask().is_none());

        let simulated = recon.simulate(&[stack.clone()]).unwrap();
        assert_eq!(simulated.len(), 1);
        assert!(simulated[0].same_grid(&stack));
        let values = simulated[0].data().clone().into_data().to_vec::<f32>().unwrap();
        // z = 1 lies at 4 mm, beyond the 3.75 mm extent of the volume.
        assert!(values[..9].iter().all(|v| (*v - 4.0).abs() < 1e-5));
        assert!(values[9..].iter().all(|v| *v == 0.0));
    }
}
