//! Anatomical template handling: put a T2 template on the reconstruction grid,
//! optionally after rigidly aligning it.

use burn::tensor::backend::Backend;
use svrb0_core::filter::{GaussianFilter, ResampleImageFilter};
use svrb0_core::image::{Image, MultiChannelImage};
use svrb0_core::interpolation::LinearInterpolator;
use svrb0_core::spatial::Point;
use svrb0_core::transform::{RigidTransform, SpatialTransform, Transform};
use svrb0_registration::{ParameterGuess, RegistrationError, RegistrationSolver};
use crate::error::{DistortionError, Result};
use crate::stack_registration::{reset_origin, translation_inverse};

fn resample_onto<B: Backend, T: Transform<B, 3>>(
    template: &Image<B, 3>,
    reconstruction: &Image<B, 3>,
    transform: &T,
) -> Image<B, 3> {
    ResampleImageFilter::new_from_reference(reconstruction, transform, LinearInterpolator::new())
        .with_source_padding(0.0)
        .apply(template)
}

/// Sample `template` on the reconstruction grid as is, 0 outside its field of view.
pub fn resample_template<B: Backend>(template: &Image<B, 3>, reconstruction: &Image<B, 3>) -> Image<B, 3> {
    resample_onto(template, reconstruction, &RigidTransform::identity())
}

/// Rigidly align `template` to the reconstruction and sample it on the
/// reconstruction grid.
///
/// With `sigma > 0` (mm) the template is first smoothed, ignoring voxels at
/// or below 0; the smoothed template is what gets resampled. Returns the
/// aligned template and the transform from reconstruction to template
/// positions.
pub fn align_template<B, S>(
    solver: &mut S,
    template: &Image<B, 3>,
    reconstruction: &Image<B, 3>,
    sigma: f64,
) -> Result<(Image<B, 3>, RigidTransform)>
where
    B: Backend,
    S: RegistrationSolver<B>,
{
    if !sigma.is_finite() || sigma < 0.0 {
        return Err(DistortionError::configuration(format!(
            "template smoothing sigma must be non-negative, got {sigma}"
        )));
    }

    let source = if sigma > 0.0 {
        GaussianFilter::<B>::new(sigma).apply_with_padding(template, 0.0)
    } else {
        template.clone()
    };

    let (target, offset) = reset_origin(reconstruction);
    let mut start = RigidTransform::identity().with_center(Point::origin());
    start.set_matrix(&offset);

    solver.set_target_source(MultiChannelImage::from(target), MultiChannelImage::from(source.clone()));
    solver.set_output(start.into());
    solver.guess_initial_parameters(ParameterGuess::Default);
    solver.set_target_padding(0.0);

    let fitted = match solver.run() {
        Ok(SpatialTransform::Rigid(rigid)) => rigid,
        Ok(other) => {
            return Err(DistortionError::convergence(
                0,
                RegistrationError::transform(format!("template alignment returned a {} transform", other.kind())),
            ))
        }
        Err(err) => return Err(DistortionError::convergence(0, err)),
    };

    let mut transform = RigidTransform::identity().with_center(reconstruction.center());
    transform.set_matrix(&(fitted.matrix() * translation_inverse(&offset)));
    tracing::info!(
        "Template aligned: t = ({:.2}, {:.2}, {:.2}) mm",
        transform.parameter(0),
        transform.parameter(1),
        transform.parameter(2)
    );

    Ok((resample_onto(&source, reconstruction, &transform), transform))
}
