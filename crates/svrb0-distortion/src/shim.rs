//! Shim estimation: a spatially uniform distortion along one axis, modelled
//! as an affine transform with only the x translation, x scale and the two x
//! shears free.

use burn::tensor::backend::Backend;
use svrb0_core::image::MultiChannelImage;
use svrb0_core::transform::{AffineParameter, AffineTransform, DofStatus, SpatialTransform};
use svrb0_registration::{ParameterGuess, RegistrationError, RegistrationSolver};
use crate::debug::{DebugArtifact, DebugSink};
use crate::orientation::normalize_aggregate;

/// Parameters a shim may change, all along canonical x.
pub const SHIM_PARAMETERS: [AffineParameter; 4] = [
    AffineParameter::Tx,
    AffineParameter::Sx,
    AffineParameter::Sxy,
    AffineParameter::Sxz,
];

/// Identity affine about the canonical origin with every parameter but
/// [`SHIM_PARAMETERS`] locked.
pub fn shim_transform() -> AffineTransform {
    let mut affine = AffineTransform::identity();
    for parameter in AffineParameter::ALL {
        affine.put_status(parameter, DofStatus::Passive);
    }
    for parameter in SHIM_PARAMETERS {
        affine.put_status(parameter, DofStatus::Active);
    }
    affine
}

/// Fit the shim between an acquired aggregate and its simulated counterpart.
///
/// Both aggregates must share one grid. The fit runs in the canonical frame of
/// the acquired aggregate (`swap` picks image y as distortion axis) and is
/// brought back to the native frame. The returned transform is the inverse of
/// the acquired-to-simulated map, so resampling an acquired stack through it
/// yields the undistorted stack.
pub fn estimate_shim<B: Backend, S: RegistrationSolver<B>>(
    solver: &mut S,
    acquired: &MultiChannelImage<B>,
    simulated: &MultiChannelImage<B>,
    swap: bool,
    voxel_size: f64,
    padding: f64,
    sink: &dyn DebugSink<B>,
) -> Result<AffineTransform, RegistrationError> {
    let (acquired_n, orient) = normalize_aggregate(acquired, swap);
    let (simulated_n, _) = normalize_aggregate(simulated, swap);

    if sink.is_enabled() {
        sink.emit("orient", DebugArtifact::Transform(&orient.to_affine().into()));
        sink.emit("adjusted", DebugArtifact::Aggregate(&acquired_n));
        sink.emit("simulated", DebugArtifact::Aggregate(&simulated_n));
    }

    solver.set_target_source(acquired_n, simulated_n);
    solver.set_output(shim_transform().into());
    solver.guess_initial_parameters(ParameterGuess::Distortion { voxel_size });
    solver.set_target_padding(padding);

    let fitted = match solver.run()? {
        SpatialTransform::Affine(affine) => affine,
        other => {
            return Err(RegistrationError::transform(format!(
                "shim fit returned a {} transform",
                other.kind()
            )))
        }
    };
    tracing::debug!(
        tx = fitted.get(AffineParameter::Tx),
        sx = fitted.get(AffineParameter::Sx),
        "shim fitted in canonical frame"
    );

    orient
        .to_native_affine(&fitted)
        .try_inverse()
        .ok_or_else(|| RegistrationError::numerical_instability("fitted shim is not invertible"))
}
