//! Rigid registration of acquired stacks to the reconstruction.

use burn::tensor::backend::Backend;
use nalgebra::Matrix4;
use svrb0_core::filter::ResampleImageFilter;
use svrb0_core::image::{Image, MultiChannelImage};
use svrb0_core::interpolation::NearestNeighborInterpolator;
use svrb0_core::spatial::Point;
use svrb0_core::transform::{RigidTransform, SpatialTransform};
use svrb0_registration::{ParameterGuess, RegistrationError, RegistrationSolver};
use crate::error::{DistortionError, Result};
use crate::simulation::ReconstructionState;

/// Zero every voxel of `target` that falls outside `mask` or on a zero mask voxel.
///
/// The mask is sampled at the nearest voxel, so it may live on its own grid.
pub fn mask_target<B: Backend>(target: &Image<B, 3>, mask: &Image<B, 3>) -> Image<B, 3> {
    let identity = RigidTransform::identity();
    let sampled = ResampleImageFilter::new_from_reference(target, &identity, NearestNeighborInterpolator::new())
        .with_source_padding(0.0)
        .apply(mask);
    let keep = sampled.into_data().abs().greater_elem(0.0).float();
    target.with_data(target.data().clone() * keep)
}

/// Move `image` so that its centre is the world origin.
///
/// Returns the moved image and the translation taking the new frame back to
/// the old one.
pub fn reset_origin<B: Backend>(image: &Image<B, 3>) -> (Image<B, 3>, Matrix4<f64>) {
    let center = image.center();
    let moved = image.with_metadata(image.metadata().with_center(image.size(), Point::origin()));
    let mut offset = Matrix4::identity();
    for i in 0..3 {
        offset[(i, 3)] = center[i];
    }
    (moved, offset)
}

pub(crate) fn translation_inverse(offset: &Matrix4<f64>) -> Matrix4<f64> {
    let mut inverse = *offset;
    for i in 0..3 {
        inverse[(i, 3)] = -offset[(i, 3)];
    }
    inverse
}

/// Rigidly register every stack to the (masked) reconstruction.
///
/// `transforms[i]` is the starting estimate for stack `i` and maps
/// reconstruction positions to stack positions; the refined transforms come
/// back in the same order, keeping the centres and statuses of the inputs.
/// A failure is reported with the index of the stack in place of a group.
pub fn register_stacks<B, S, R>(
    solver: &mut S,
    state: &R,
    stacks: &[Image<B, 3>],
    transforms: &[RigidTransform],
) -> Result<Vec<RigidTransform>>
where
    B: Backend,
    S: RegistrationSolver<B>,
    R: ReconstructionState<B>,
{
    if stacks.is_empty() {
        return Err(DistortionError::input("no stacks to register"));
    }
    if transforms.len() != stacks.len() {
        return Err(DistortionError::input(format!(
            "{} stack transforms for {} stacks",
            transforms.len(),
            stacks.len()
        )));
    }

    let reconstruction = state.reconstruction();
    let target = match state.mask() {
        Some(mask) => mask_target(reconstruction, mask),
        None => reconstruction.clone(),
    };
    let (target, offset) = reset_origin(&target);
    let offset_inverse = translation_inverse(&offset);
    let voxel_size = reconstruction.spacing()[0];
    let target = MultiChannelImage::from(target);

    let mut refined = Vec::with_capacity(stacks.len());
    for (i, (stack, initial)) in stacks.iter().zip(transforms).enumerate() {
        let mut start = RigidTransform::identity().with_center(Point::origin());
        start.set_matrix(&(initial.matrix() * offset));

        solver.set_target_source(target.clone(), MultiChannelImage::from(stack.clone()));
        solver.set_output(start.into());
        solver.guess_initial_parameters(ParameterGuess::ThickSlices { voxel_size });
        solver.set_target_padding(0.0);

        let fitted = match solver.run() {
            Ok(SpatialTransform::Rigid(rigid)) => rigid,
            Ok(other) => {
                return Err(DistortionError::convergence(
                    i,
                    RegistrationError::transform(format!("stack registration returned a {} transform", other.kind())),
                ))
            }
            Err(err) => return Err(DistortionError::convergence(i, err)),
        };

        let mut transform = initial.clone();
        transform.set_matrix(&(fitted.matrix() * offset_inverse));
        tracing::info!("Stack {} registered", i);
        refined.push(transform);
    }
    Ok(refined)
}
