//! The correction cycle: simulate, aggregate, normalize, estimate, apply.

use burn::tensor::backend::Backend;
use svrb0_core::image::Image;
use svrb0_core::transform::{AffineTransform, FreeFormTransform, SpatialTransform};
use svrb0_registration::RegistrationSolver;
use crate::aggregate::VolumeAggregator;
use crate::config::{DistortionConfig, FieldMapPolicy};
use crate::correction::apply_correction;
use crate::debug::{DebugArtifact, DebugSink, NullSink};
use crate::error::{DistortionError, Result};
use crate::fieldmap::estimate_field_map;
use crate::groups::AcquisitionGroups;
use crate::shim::estimate_shim;
use crate::simulation::SimulationProvider;

/// Estimates and removes shim and field-map distortion from acquired stacks.
///
/// Every entry point is one full cycle. A failure in any group voids the
/// whole call; there are no partial results.
pub struct DistortionCorrector<B: Backend, S: RegistrationSolver<B>, P: SimulationProvider<B>> {
    config: DistortionConfig,
    solver: S,
    simulator: P,
    sink: Box<dyn DebugSink<B>>,
}

impl<B, S, P> DistortionCorrector<B, S, P>
where
    B: Backend,
    S: RegistrationSolver<B>,
    P: SimulationProvider<B>,
{
    /// Create a corrector; the configuration is validated here.
    pub fn new(config: DistortionConfig, solver: S, simulator: P) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            solver,
            simulator,
            sink: Box::new(NullSink),
        })
    }

    /// Report intermediate results to `sink`.
    pub fn with_debug_sink(mut self, sink: impl DebugSink<B> + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &DistortionConfig {
        &self.config
    }

    /// The simulation collaborator, e.g. to update the reconstruction between cycles.
    pub fn simulator_mut(&mut self) -> &mut P {
        &mut self.simulator
    }

    /// The registration collaborator, e.g. to inspect its last fit.
    pub fn solver(&self) -> &S {
        &self.solver
    }

    /// One shim per acquisition group, each ready to resample that group's
    /// acquired stacks into undistorted ones.
    pub fn estimate_shim(
        &mut self,
        stacks: &[Image<B, 3>],
        groups: &AcquisitionGroups,
        iteration: usize,
    ) -> Result<Vec<AffineTransform>> {
        check_stacks(stacks)?;
        groups.validate(stacks.len())?;
        let simulated = self.simulate(stacks)?;

        tracing::info!(
            "Shim correction, iteration {}: {} stacks in {} groups",
            iteration,
            stacks.len(),
            groups.num_groups()
        );

        let aggregator = VolumeAggregator::from_config(&self.config);
        let voxel_size = self.simulator.voxel_size();
        let mut shims = Vec::with_capacity(groups.num_groups());
        for g in 0..groups.num_groups() {
            let members = groups.members(g);
            tracing::info!("Group {}: {} stacks, swap = {}", g, members.len(), groups.swap(g));

            let (acquired, sims) = aggregator.aggregate_pairs(stacks, &simulated, &members)?;
            if self.sink.is_enabled() {
                self.sink.emit(&format!("stacks{iteration}-{g}"), DebugArtifact::Aggregate(&acquired));
                self.sink.emit(&format!("sims{iteration}-{g}"), DebugArtifact::Aggregate(&sims));
            }

            let shim = estimate_shim(
                &mut self.solver,
                &acquired,
                &sims,
                groups.swap(g),
                voxel_size,
                self.config.registration_padding,
                self.sink.as_ref(),
            )
            .map_err(|err| DistortionError::convergence(g, err))?;

            if self.sink.is_enabled() {
                let transform = SpatialTransform::from(shim.clone());
                self.sink.emit(&format!("shim{iteration}-{g}"), DebugArtifact::Transform(&transform));
            }
            shims.push(shim);
        }
        Ok(shims)
    }

    /// Shim correction cycle; corrected stacks come back in input order.
    pub fn shim(
        &mut self,
        stacks: &[Image<B, 3>],
        groups: &AcquisitionGroups,
        iteration: usize,
    ) -> Result<Vec<Image<B, 3>>> {
        let shims = self.estimate_shim(stacks, groups, iteration)?;
        Ok(stacks
            .iter()
            .enumerate()
            .map(|(i, stack)| {
                tracing::debug!("Correcting stack {}", i);
                apply_correction(stack, &shims[groups.group_of(i)], &self.config)
            })
            .collect())
    }

    /// One field map from every stack, aggregated on the grid of the first.
    ///
    /// Only meaningful when all stacks share one geometry.
    pub fn estimate_field_map(
        &mut self,
        stacks: &[Image<B, 3>],
        swap: bool,
        iteration: usize,
    ) -> Result<FreeFormTransform> {
        check_stacks(stacks)?;
        let simulated = self.simulate(stacks)?;
        tracing::info!(
            "Field map correction, iteration {}: {} stacks (assumes a shared geometry)",
            iteration,
            stacks.len()
        );
        let members: Vec<usize> = (0..stacks.len()).collect();
        self.fit_field_map(stacks, &simulated, &members, swap, 0, &iteration.to_string())
    }

    /// Field maps following the configured [`FieldMapPolicy`]: one for all
    /// stacks (`Global`) or one per acquisition group (`PerGroup`).
    pub fn estimate_field_maps(
        &mut self,
        stacks: &[Image<B, 3>],
        groups: &AcquisitionGroups,
        iteration: usize,
    ) -> Result<Vec<FreeFormTransform>> {
        check_stacks(stacks)?;
        groups.validate(stacks.len())?;

        match self.config.field_map_policy {
            FieldMapPolicy::Global => {
                let swap = groups.swap(0);
                if (1..groups.num_groups()).any(|g| groups.swap(g) != swap) {
                    tracing::warn!(
                        "Groups disagree on the distortion axis; the global field map uses group 0 (swap = {})",
                        swap
                    );
                }
                Ok(vec![self.estimate_field_map(stacks, swap, iteration)?])
            }
            FieldMapPolicy::PerGroup => {
                let simulated = self.simulate(stacks)?;
                tracing::info!(
                    "Field map correction, iteration {}: {} groups",
                    iteration,
                    groups.num_groups()
                );
                (0..groups.num_groups())
                    .map(|g| {
                        let members = groups.members(g);
                        let suffix = format!("{iteration}-{g}");
                        self.fit_field_map(stacks, &simulated, &members, groups.swap(g), g, &suffix)
                    })
                    .collect()
            }
        }
    }

    /// Field-map correction cycle; corrected stacks come back in input order.
    pub fn field_map(
        &mut self,
        stacks: &[Image<B, 3>],
        groups: &AcquisitionGroups,
        iteration: usize,
    ) -> Result<Vec<Image<B, 3>>> {
        let maps = self.estimate_field_maps(stacks, groups, iteration)?;
        let global = maps.len() == 1;
        Ok(stacks
            .iter()
            .enumerate()
            .map(|(i, stack)| {
                let map = if global { &maps[0] } else { &maps[groups.group_of(i)] };
                apply_correction(stack, map, &self.config)
            })
            .collect())
    }

    /// Resample every stack through `transform`.
    pub fn apply_correction(&self, stacks: &[Image<B, 3>], transform: &SpatialTransform) -> Result<Vec<Image<B, 3>>> {
        check_stacks(stacks)?;
        Ok(stacks
            .iter()
            .map(|stack| apply_correction(stack, transform, &self.config))
            .collect())
    }

    fn simulate(&self, stacks: &[Image<B, 3>]) -> Result<Vec<Image<B, 3>>> {
        let simulated = self.simulator.simulate(stacks)?;
        if simulated.len() != stacks.len() {
            return Err(DistortionError::input(format!(
                "simulation returned {} volumes for {} stacks",
                simulated.len(),
                stacks.len()
            )));
        }
        if self.sink.is_enabled() {
            for (i, (stack, sim)) in stacks.iter().zip(&simulated).enumerate() {
                self.sink.emit(&format!("st{i}"), DebugArtifact::Volume(stack));
                self.sink.emit(&format!("sim{i}"), DebugArtifact::Volume(sim));
            }
        }
        Ok(simulated)
    }

    fn fit_field_map(
        &mut self,
        stacks: &[Image<B, 3>],
        simulated: &[Image<B, 3>],
        members: &[usize],
        swap: bool,
        group: usize,
        suffix: &str,
    ) -> Result<FreeFormTransform> {
        // Aggregated with the shim's noise threshold and paddings
        let aggregator = VolumeAggregator::from_config(&self.config);
        let (acquired, sims) = aggregator.aggregate_pairs(stacks, simulated, members)?;
        if self.sink.is_enabled() {
            self.sink.emit(&format!("fmstacks{suffix}"), DebugArtifact::Aggregate(&acquired));
            self.sink.emit(&format!("fmsims{suffix}"), DebugArtifact::Aggregate(&sims));
        }

        let map = estimate_field_map(&mut self.solver, &acquired, &sims, swap, &self.config, self.sink.as_ref())
            .map_err(|err| DistortionError::convergence(group, err))?;

        if self.sink.is_enabled() {
            let transform = SpatialTransform::from(map.clone());
            self.sink.emit(&format!("fmdist{suffix}"), DebugArtifact::Transform(&transform));
        }
        Ok(map)
    }
}

fn check_stacks<B: Backend>(stacks: &[Image<B, 3>]) -> Result<()> {
    if stacks.is_empty() {
        return Err(DistortionError::input("no stacks given"));
    }
    Ok(())
}
