// ─────────────────────────────────────────────────────────────────────
// RTI Layer Core — Stepper
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! One explicit time step of the layered diffusion problem.
//!
//! Two interchangeable steppers, selected once from the spec:
//!
//! * [`ThreeRegionStepper`] solves each layer on its own ghost-extended
//!   sub-field. The ghost rows extrapolate linearly through the
//!   interface concentration cb, which is weighted by D*·alpha on both
//!   sides so that the diffusive flux alpha·theta·grad(c) matches across
//!   the boundary under the explicit discretization.
//! * [`SingleRegionStepper`] treats the whole cylinder as one region
//!   with the bottom layer's parameters.
//!
//! After the Laplacian update both steppers add the injection field
//! (when the caller says the source is on), apply per-layer clearance
//! `c *= 1 - kappa*dt`, and reimpose the axis mirror
//! `c[[iz, 0]] = c[[iz, 2]]`.
//!
//! All scratch arrays are sized from the grid at construction and reused
//! for every step and every run; the fitter re-parameterizes a stepper
//! through [`LayerStepper::retune`] instead of rebuilding it.

use ndarray::{Array1, Array2};
use rti_math::laplacian::cyl_laplacian_delta;
use rti_types::geometry::{SimulationSpec, SteppingMode};
use rti_types::state::{LayerParams, LayerStack};

/// Per-region stencil scale factors and clearance decay.
#[derive(Debug, Clone, Copy)]
struct RegionCoeffs {
    /// D*·dt/dr² (diffusive term).
    s1: f64,
    /// D*·dt/(2 dr) (1/r term).
    s2: f64,
    /// 1 - kappa·dt.
    decay: f64,
    /// D*·alpha, the flux weight at interfaces.
    weight: f64,
}

impl RegionCoeffs {
    fn new(p: &LayerParams, d_free: f64, dt: f64, dr: f64) -> Self {
        let dstar = p.dstar(d_free);
        RegionCoeffs {
            s1: dstar * dt / (dr * dr),
            s2: dstar * dt / (2.0 * dr),
            decay: 1.0 - p.kappa * dt,
            weight: dstar * p.alpha,
        }
    }
}

/// One explicit step over the global concentration field.
pub trait LayerStepper {
    /// Advance `c` by one dt; `source` is the injection field when the
    /// source is currently on.
    fn step(&mut self, c: &mut Array2<f64>, source: Option<&Array2<f64>>);

    /// Recompute coefficients for a new layer stack without touching the
    /// scratch buffers. Grid and dt are fixed for the stepper's lifetime.
    fn retune(&mut self, layers: &LayerStack);

    fn name(&self) -> &'static str;
}

/// Build the stepper variant the spec asks for.
pub fn build_stepper(spec: &SimulationSpec) -> Box<dyn LayerStepper> {
    match spec.mode {
        SteppingMode::SingleRegion => Box::new(SingleRegionStepper::new(spec)),
        SteppingMode::ThreeRegion => Box::new(ThreeRegionStepper::new(spec)),
    }
}

/// Whole cylinder as one homogeneous region (bottom-layer parameters).
pub struct SingleRegionStepper {
    region: RegionCoeffs,
    inv_r: Array1<f64>,
    delta: Array2<f64>,
    d_free: f64,
    dt: f64,
    dr: f64,
    nz: usize,
}

impl SingleRegionStepper {
    pub fn new(spec: &SimulationSpec) -> Self {
        let grid = &spec.grid;
        SingleRegionStepper {
            region: RegionCoeffs::new(&spec.layers.bottom, spec.d_free, spec.dt, grid.dr),
            inv_r: grid.inv_r.clone(),
            delta: Array2::zeros((grid.nz, grid.cols())),
            d_free: spec.d_free,
            dt: spec.dt,
            dr: grid.dr,
            nz: grid.nz,
        }
    }
}

impl LayerStepper for SingleRegionStepper {
    fn step(&mut self, c: &mut Array2<f64>, source: Option<&Array2<f64>>) {
        cyl_laplacian_delta(c, self.region.s1, self.region.s2, &self.inv_r, &mut self.delta);
        c.zip_mut_with(&self.delta, |v, &d| *v += d);

        if let Some(s) = source {
            c.zip_mut_with(s, |v, &sv| *v += sv);
        }

        let decay = self.region.decay;
        c.mapv_inplace(|v| v * decay);

        for i in 0..self.nz {
            c[[i, 0]] = c[[i, 2]];
        }
    }

    fn retune(&mut self, layers: &LayerStack) {
        self.region = RegionCoeffs::new(&layers.bottom, self.d_free, self.dt, self.dr);
    }

    fn name(&self) -> &'static str {
        "single-region"
    }
}

/// Three stacked layers with flux-matched interfaces.
pub struct ThreeRegionStepper {
    bottom: RegionCoeffs,
    middle: RegionCoeffs,
    top: RegionCoeffs,
    inv_r: Array1<f64>,
    iz1: usize,
    iz2: usize,
    nz: usize,
    cols: usize,
    d_free: f64,
    dt: f64,
    dr: f64,
    /// Interface concentrations, one per radial column.
    cb_lower: Array1<f64>,
    cb_upper: Array1<f64>,
    /// Ghost-extended sub-fields and their deltas.
    c_bottom: Array2<f64>,
    d_bottom: Array2<f64>,
    c_middle: Array2<f64>,
    d_middle: Array2<f64>,
    c_top: Array2<f64>,
    d_top: Array2<f64>,
}

impl ThreeRegionStepper {
    pub fn new(spec: &SimulationSpec) -> Self {
        let grid = &spec.grid;
        let (iz1, iz2, nz, cols) = (grid.iz1, grid.iz2, grid.nz, grid.cols());
        // Bottom extends one ghost row up, top one ghost row down, middle
        // one each way; the interface itself sits between node rows.
        let bottom_rows = iz1 + 2;
        let middle_rows = iz2 - iz1 + 2;
        let top_rows = nz - iz2;

        ThreeRegionStepper {
            bottom: RegionCoeffs::new(&spec.layers.bottom, spec.d_free, spec.dt, grid.dr),
            middle: RegionCoeffs::new(&spec.layers.middle, spec.d_free, spec.dt, grid.dr),
            top: RegionCoeffs::new(&spec.layers.top, spec.d_free, spec.dt, grid.dr),
            inv_r: grid.inv_r.clone(),
            iz1,
            iz2,
            nz,
            cols,
            d_free: spec.d_free,
            dt: spec.dt,
            dr: grid.dr,
            cb_lower: Array1::zeros(cols),
            cb_upper: Array1::zeros(cols),
            c_bottom: Array2::zeros((bottom_rows, cols)),
            d_bottom: Array2::zeros((bottom_rows, cols)),
            c_middle: Array2::zeros((middle_rows, cols)),
            d_middle: Array2::zeros((middle_rows, cols)),
            c_top: Array2::zeros((top_rows, cols)),
            d_top: Array2::zeros((top_rows, cols)),
        }
    }
}

impl LayerStepper for ThreeRegionStepper {
    fn step(&mut self, c: &mut Array2<f64>, source: Option<&Array2<f64>>) {
        let (iz1, iz2, nz, cols) = (self.iz1, self.iz2, self.nz, self.cols);

        // Flux-weighted interface concentrations.
        let wb = self.bottom.weight;
        let wm = self.middle.weight;
        let wt = self.top.weight;
        for j in 0..cols {
            self.cb_lower[j] = (wb * c[[iz1, j]] + wm * c[[iz1 + 1, j]]) / (wb + wm);
            self.cb_upper[j] = (wm * c[[iz2, j]] + wt * c[[iz2 + 1, j]]) / (wm + wt);
        }

        // Sub-fields with linear-extrapolation ghost rows.
        for i in 0..=iz1 {
            for j in 0..cols {
                self.c_bottom[[i, j]] = c[[i, j]];
            }
        }
        for j in 0..cols {
            self.c_bottom[[iz1 + 1, j]] = 2.0 * self.cb_lower[j] - c[[iz1, j]];
            self.c_middle[[0, j]] = 2.0 * self.cb_lower[j] - c[[iz1 + 1, j]];
        }
        for i in iz1 + 1..=iz2 {
            for j in 0..cols {
                self.c_middle[[i - iz1, j]] = c[[i, j]];
            }
        }
        for j in 0..cols {
            self.c_middle[[iz2 - iz1 + 1, j]] = 2.0 * self.cb_upper[j] - c[[iz2, j]];
            self.c_top[[0, j]] = 2.0 * self.cb_upper[j] - c[[iz2 + 1, j]];
        }
        for i in iz2 + 1..nz {
            for j in 0..cols {
                self.c_top[[i - iz2, j]] = c[[i, j]];
            }
        }

        // Each layer diffuses with its own scale factors.
        cyl_laplacian_delta(
            &self.c_bottom,
            self.bottom.s1,
            self.bottom.s2,
            &self.inv_r,
            &mut self.d_bottom,
        );
        cyl_laplacian_delta(
            &self.c_middle,
            self.middle.s1,
            self.middle.s2,
            &self.inv_r,
            &mut self.d_middle,
        );
        cyl_laplacian_delta(
            &self.c_top,
            self.top.s1,
            self.top.s2,
            &self.inv_r,
            &mut self.d_top,
        );

        // Recompose the global field, dropping the ghost rows.
        for i in 0..=iz1 {
            for j in 0..cols {
                c[[i, j]] = self.c_bottom[[i, j]] + self.d_bottom[[i, j]];
            }
        }
        for i in iz1 + 1..=iz2 {
            for j in 0..cols {
                c[[i, j]] = self.c_middle[[i - iz1, j]] + self.d_middle[[i - iz1, j]];
            }
        }
        for i in iz2 + 1..nz {
            for j in 0..cols {
                c[[i, j]] = self.c_top[[i - iz2, j]] + self.d_top[[i - iz2, j]];
            }
        }

        if let Some(s) = source {
            c.zip_mut_with(s, |v, &sv| *v += sv);
        }

        // Per-layer clearance.
        for i in 0..=iz1 {
            for j in 0..cols {
                c[[i, j]] *= self.bottom.decay;
            }
        }
        for i in iz1 + 1..=iz2 {
            for j in 0..cols {
                c[[i, j]] *= self.middle.decay;
            }
        }
        for i in iz2 + 1..nz {
            for j in 0..cols {
                c[[i, j]] *= self.top.decay;
            }
        }

        // Axis symmetry about column 1.
        for i in 0..nz {
            c[[i, 0]] = c[[i, 2]];
        }
    }

    fn retune(&mut self, layers: &LayerStack) {
        self.bottom = RegionCoeffs::new(&layers.bottom, self.d_free, self.dt, self.dr);
        self.middle = RegionCoeffs::new(&layers.middle, self.d_free, self.dt, self.dr);
        self.top = RegionCoeffs::new(&layers.top, self.d_free, self.dt, self.dr);
    }

    fn name(&self) -> &'static str {
        "three-region"
    }
}
