// ─────────────────────────────────────────────────────────────────────
// RTI Layer Core — State
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use ndarray::Array1;

/// Discretized half-cylinder. Fields are (nz, nr + 1) arrays indexed
/// [[iz, jr]]; column jr = 1 is the axis r = 0 and column jr = 0 is its
/// mirror, so physical radii live at jr >= 1 with r = (jr - 1) * dr.
#[derive(Debug, Clone)]
pub struct CylGrid {
    pub nz: usize,
    pub nr: usize,
    pub dr: f64, // dz == dr, enforced by the geometry builder
    pub dz: f64,
    /// 1/r lookup per radial column: inv_r[0] = 1/dr (mirror column),
    /// inv_r[1] = 0 (axis, handled by the modified stencil),
    /// inv_r[j] = 1/((j-1) dr) otherwise.
    pub inv_r: Array1<f64>,
    /// z-index of the bottom/middle layer boundary.
    pub iz1: usize,
    /// z-index of the middle/top layer boundary.
    pub iz2: usize,
}

impl CylGrid {
    pub fn new(nz: usize, nr: usize, dr: f64, iz1: usize, iz2: usize) -> Self {
        let mut inv_r = Array1::zeros(nr + 1);
        inv_r[0] = 1.0 / dr;
        inv_r[1] = 0.0;
        for j in 2..nr + 1 {
            inv_r[j] = 1.0 / ((j as f64 - 1.0) * dr);
        }
        CylGrid {
            nz,
            nr,
            dr,
            dz: dr,
            inv_r,
            iz1,
            iz2,
        }
    }

    /// Number of radial columns in a field array.
    pub fn cols(&self) -> usize {
        self.nr + 1
    }
}

/// Diffusion parameters of one homogeneous tissue layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerParams {
    /// Extracellular volume fraction.
    pub alpha: f64,
    /// Permeability; effective diffusivity D* = theta * D_free.
    pub theta: f64,
    /// Nonspecific clearance rate (1/s).
    pub kappa: f64,
}

impl LayerParams {
    pub fn dstar(&self, d_free: f64) -> f64 {
        self.theta * d_free
    }
}

/// Three layers stacked along z: bottom (0..=iz1), middle (iz1+1..=iz2),
/// top (iz2+1..nz).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerStack {
    pub bottom: LayerParams,
    pub middle: LayerParams,
    pub top: LayerParams,
}

impl LayerStack {
    pub fn uniform(p: LayerParams) -> Self {
        LayerStack {
            bottom: p,
            middle: p,
            top: p,
        }
    }

    /// Parameters of the layer containing axial row iz.
    pub fn at(&self, iz: usize, grid: &CylGrid) -> &LayerParams {
        if iz <= grid.iz1 {
            &self.bottom
        } else if iz <= grid.iz2 {
            &self.middle
        } else {
            &self.top
        }
    }

    /// Largest effective diffusivity over the stack; sets the stability bound.
    pub fn max_dstar(&self, d_free: f64) -> f64 {
        self.bottom
            .dstar(d_free)
            .max(self.middle.dstar(d_free))
            .max(self.top.dstar(d_free))
    }
}
