// ─────────────────────────────────────────────────────────────────────
// RTI Layer Core — Kernel
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! DiffusionKernel — the forward simulation loop.
//!
//! Owns the spec, the injection field, the stepper, and the concentration
//! field, and produces the probe curve: one sample per time step, zeros
//! during the source delay, then the pre-step field value at the probe
//! cell for every remaining step. The field starts as the source pattern
//! and is reset (not reallocated) at the beginning of every run, so the
//! fitter can call [`DiffusionKernel::run`] hundreds of times against the
//! same buffers.

use crate::snapshot::{field_extrema, mirror_into, SnapshotMeta, SnapshotSink};
use crate::source::build_source_field;
use crate::stepper::{build_stepper, LayerStepper};
use ndarray::Array2;
use rti_types::config::ExperimentConfig;
use rti_types::error::{RtiError, RtiResult};
use rti_types::geometry::SimulationSpec;
use rti_types::state::LayerStack;

pub struct DiffusionKernel {
    spec: SimulationSpec,
    source: Array2<f64>,
    stepper: Box<dyn LayerStepper>,
    field: Array2<f64>,
    curve: Vec<f64>,
}

impl DiffusionKernel {
    /// Create a kernel from a validated spec.
    pub fn new(spec: SimulationSpec) -> RtiResult<Self> {
        // The geometry builder already bounds the rounded delay; this
        // guards hand-built specs before any stepping work starts.
        if spec.nds >= spec.nt {
            return Err(RtiError::ConfigError(format!(
                "Delay steps ({}) must be fewer than total steps ({})",
                spec.nds, spec.nt
            )));
        }
        let source = build_source_field(&spec);
        let stepper = build_stepper(&spec);
        let field = Array2::zeros((spec.grid.nz, spec.grid.cols()));
        let curve = vec![0.0; spec.nt];
        Ok(DiffusionKernel {
            spec,
            source,
            stepper,
            field,
            curve,
        })
    }

    pub fn from_config(cfg: &ExperimentConfig) -> RtiResult<Self> {
        Self::new(SimulationSpec::build(cfg)?)
    }

    /// Create a kernel from a JSON config file.
    pub fn from_file(path: &str) -> RtiResult<Self> {
        Self::from_config(&ExperimentConfig::from_file(path)?)
    }

    pub fn spec(&self) -> &SimulationSpec {
        &self.spec
    }

    /// Concentration field after the last run.
    pub fn field(&self) -> &Array2<f64> {
        &self.field
    }

    /// Probe curve from the last run.
    pub fn curve(&self) -> &[f64] {
        &self.curve
    }

    pub fn stepper_name(&self) -> &'static str {
        self.stepper.name()
    }

    /// Re-parameterize the stepper; grid, dt, and the injection field
    /// stay as built (the source pattern keeps the setup-time alpha).
    pub fn retune(&mut self, layers: &LayerStack) {
        self.stepper.retune(layers);
    }

    /// Run all time steps and return the probe curve.
    pub fn run(&mut self) -> &[f64] {
        self.run_inner(None)
    }

    /// Run all time steps, emitting a mirrored snapshot frame every
    /// `spacing` seconds of simulated time after source onset. A sink
    /// error is logged and the run continues.
    pub fn run_with_snapshots(&mut self, sink: &mut dyn SnapshotSink, spacing: f64) -> &[f64] {
        assert!(spacing > 0.0, "snapshot spacing must be positive");
        self.run_inner(Some((sink, spacing)))
    }

    fn run_inner(&mut self, mut snapshots: Option<(&mut dyn SnapshotSink, f64)>) -> &[f64] {
        let dt = self.spec.dt;
        let nds = self.spec.nds;
        let window_end = self.spec.delay + self.spec.duration;
        let probe = self.spec.probe;

        // t = 0 state is the source pattern; the delay steps stay at it.
        self.field.assign(&self.source);
        for v in self.curve.iter_mut() {
            *v = 0.0;
        }

        let mut frame = snapshots.as_ref().map(|_| {
            Array2::zeros((self.spec.grid.nz, 2 * self.spec.grid.nr - 1))
        });
        let mut emitted = 0usize;

        for k in nds..self.spec.nt {
            if let Some((sink, spacing)) = snapshots.as_mut() {
                let since_onset = (k - nds) as f64 * dt;
                if since_onset >= emitted as f64 * *spacing {
                    let frame = frame.as_mut().expect("frame allocated with sink");
                    mirror_into(&self.field, frame);
                    let (min, max) = field_extrema(&self.field);
                    let meta = SnapshotMeta {
                        index: emitted,
                        time: since_onset,
                        min,
                        max,
                    };
                    if let Err(err) = sink.write(&meta, frame) {
                        log::warn!("snapshot #{emitted} not written: {err}");
                    }
                    emitted += 1;
                }
            }

            self.curve[k] = self.field[[probe.iz, probe.jr]];

            let t = k as f64 * dt;
            let inject = t + dt / 2.0 < window_end;
            self.stepper.step(
                &mut self.field,
                if inject { Some(&self.source) } else { None },
            );
        }

        &self.curve
    }
}
