//! Field-map estimation: a spatially varying distortion along one axis,
//! modelled as a B-spline free-form deformation whose control points only
//! move along that axis.

use burn::tensor::backend::Backend;
use svrb0_core::image::MultiChannelImage;
use svrb0_core::transform::{ControlPointLattice, FreeFormTransform, SpatialTransform};
use svrb0_registration::{ParameterGuess, RegistrationError, RegistrationSolver};
use crate::config::DistortionConfig;
use crate::debug::{DebugArtifact, DebugSink};
use crate::orientation::normalize_aggregate;

/// Displacement component fitted for a given swap flag.
pub fn distortion_axis(swap: bool) -> usize {
    if swap {
        1
    } else {
        0
    }
}

/// Fit the field map between an acquired aggregate and its simulated
/// counterpart, both on one grid.
///
/// The fit maps simulated positions to acquired ones, so resampling an
/// acquired stack through the result undistorts it directly. Both aggregates
/// are brought to the unswapped canonical frame and the displacement axis is
/// chosen by `swap` instead. The fitted lattice is re-anchored to the native
/// frame of the simulated aggregate before returning.
pub fn estimate_field_map<B: Backend, S: RegistrationSolver<B>>(
    solver: &mut S,
    acquired: &MultiChannelImage<B>,
    simulated: &MultiChannelImage<B>,
    swap: bool,
    config: &DistortionConfig,
    sink: &dyn DebugSink<B>,
) -> Result<FreeFormTransform, RegistrationError> {
    let (acquired_n, _) = normalize_aggregate(acquired, false);
    let (simulated_n, orient) = normalize_aggregate(simulated, false);

    let lattice = ControlPointLattice::covering(
        simulated_n.metadata(),
        simulated_n.size(),
        config.control_point_spacing,
    );
    let axis = distortion_axis(swap);
    tracing::debug!(
        dims = ?lattice.dims(),
        axis,
        "fitting field map"
    );

    solver.set_target_source(simulated_n, acquired_n);
    solver.set_output(FreeFormTransform::new(lattice).with_active_axis(axis).into());
    solver.guess_initial_parameters(ParameterGuess::FieldMap {
        resolution: config.field_map_resolution,
        control_point_spacing: config.control_point_spacing,
    });
    solver.set_target_padding(config.registration_padding);

    let fitted = solver.run()?;
    if sink.is_enabled() {
        sink.emit("fmd", DebugArtifact::Transform(&fitted));
    }
    let kind = fitted.kind();
    let SpatialTransform::FreeForm(fitted) = fitted else {
        return Err(RegistrationError::transform(format!(
            "field map fit returned a {} transform",
            kind
        )));
    };

    Ok(orient.to_native_free_form(&fitted))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distortion_axis() {
        assert_eq!(distortion_axis(false), 0);
        assert_eq!(distortion_axis(true), 1);
    }
}
