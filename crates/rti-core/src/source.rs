// ─────────────────────────────────────────────────────────────────────
// RTI Layer Core — Source
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Source field assembly.
//!
//! Each point source releases `rate = current * transport_number / F`
//! mol/s. Per time step that amount is spread over the volume of its
//! grid cell and divided by the local extracellular volume fraction,
//! giving the per-step concentration increment
//!
//!   s = (1/alpha_cell) * rate * dt * 4 / (pi * dr^2 * dz)
//!
//! The field is added to the concentration every step while the source
//! is on, and also serves as the t = 0 initial condition.

use ndarray::Array2;
use rti_types::geometry::{PointSource, SimulationSpec};

/// Build the additive injection field for a spec. Cells were validated
/// in-bounds when the spec was built; the field is (nz, nr+1).
pub fn build_source_field(spec: &SimulationSpec) -> Array2<f64> {
    let grid = &spec.grid;
    let mut s = Array2::zeros((grid.nz, grid.cols()));

    add_point_source(&mut s, spec, &spec.source);
    for extra in &spec.extra_sources {
        add_point_source(&mut s, spec, extra);
    }
    s
}

fn add_point_source(s: &mut Array2<f64>, spec: &SimulationSpec, source: &PointSource) {
    let grid = &spec.grid;
    let alpha = spec.layers.at(source.cell.iz, grid).alpha;
    let increment = (1.0 / alpha) * source.rate * spec.dt * 4.0
        / (std::f64::consts::PI * grid.dr * grid.dr * grid.dz);
    s[[source.cell.iz, source.cell.jr]] += increment;
}
