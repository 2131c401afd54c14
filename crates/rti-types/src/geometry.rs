// ─────────────────────────────────────────────────────────────────────
// RTI Layer Core — Geometry
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Builds the validated, discretized simulation description from an
//! [`ExperimentConfig`].
//!
//! Positions in the config are measured relative to the primary source;
//! here they are shifted into cylinder coordinates (z = 0 at the bottom),
//! snapped to the grid, and every fatal configuration condition is
//! checked before any solver work starts.

use crate::config::ExperimentConfig;
use crate::constants::{FARADAY, VON_NEUMANN_DENOM, VON_NEUMANN_SAFETY};
use crate::error::{RtiError, RtiResult};
use crate::state::{CylGrid, LayerParams, LayerStack};

/// Stepping topology, fixed once at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SteppingMode {
    /// One homogeneous region using the bottom layer's parameters.
    SingleRegion,
    /// Three stacked layers with flux-matched interfaces.
    ThreeRegion,
}

/// Grid cell of the probe (or a source).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCell {
    pub iz: usize,
    pub jr: usize,
}

/// One point source snapped to the grid, release rate in mol/s.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointSource {
    pub cell: GridCell,
    pub rate: f64,
}

/// Complete discretized problem description. Immutable once built; the
/// solver and the fitter consume it read-only (the fitter carries its own
/// middle-layer overrides).
#[derive(Debug, Clone)]
pub struct SimulationSpec {
    pub grid: CylGrid,
    pub layers: LayerStack,
    pub d_free: f64,
    pub mode: SteppingMode,
    pub global_kappa: bool,
    /// Time step (s), either t_max/nt or the von Neumann default.
    pub dt: f64,
    /// Total step count.
    pub nt: usize,
    /// Source-on steps.
    pub ns: usize,
    /// Delay steps before the source switches on.
    pub nds: usize,
    /// Delay, duration, and total time after rounding to multiples of dt.
    pub delay: f64,
    pub duration: f64,
    pub t_max: f64,
    /// Primary source: release rate current*trn/F (mol/s) at its grid cell.
    pub source: PointSource,
    /// Additional validated point sources.
    pub extra_sources: Vec<PointSource>,
    pub probe: GridCell,
    /// Euclidean source-probe distance after grid snapping (m).
    pub source_probe_distance: f64,
    /// Shift applied to all source-relative z positions (m).
    pub coord_shift: f64,
}

impl SimulationSpec {
    /// Validate a configuration and discretize it.
    pub fn build(cfg: &ExperimentConfig) -> RtiResult<Self> {
        let mode = parse_mode(&cfg.mode)?;

        let mut lz1 = cfg.span.lz1;
        let mut lz2 = cfg.span.lz2;
        if lz2 <= lz1 {
            return Err(RtiError::ConfigError(format!(
                "Middle layer span inverted: lz1={lz1}, lz2={lz2}"
            )));
        }

        // Explicit cylinder edges are an alternative to z_max.
        match (cfg.span.ez1, cfg.span.ez2) {
            (Some(_), None) => {
                return Err(RtiError::ConfigError(
                    "ez1 specified without ez2".to_string(),
                ))
            }
            (None, Some(_)) => {
                return Err(RtiError::ConfigError(
                    "ez2 specified without ez1".to_string(),
                ))
            }
            (Some(_), Some(_)) if cfg.grid.z_max.is_some() => {
                return Err(RtiError::ConfigError(
                    "ez1/ez2 and z_max are mutually exclusive".to_string(),
                ))
            }
            _ => {}
        }
        if let (Some(ez1), Some(ez2)) = (cfg.span.ez1, cfg.span.ez2) {
            if ez1 > 0.0 {
                return Err(RtiError::ConfigError(format!(
                    "Bottom of cylinder ez1={ez1} must be <= 0 (source at z=0)"
                )));
            }
            if ez2 < 0.0 {
                return Err(RtiError::ConfigError(format!(
                    "Top of cylinder ez2={ez2} must be >= 0 (source at z=0)"
                )));
            }
            if ez1 > lz1 {
                return Err(RtiError::ConfigError(format!(
                    "Bottom of cylinder ez1={ez1} above middle layer lz1={lz1}"
                )));
            }
            if ez2 < lz2 {
                return Err(RtiError::ConfigError(format!(
                    "Top of cylinder ez2={ez2} below middle layer lz2={lz2}"
                )));
            }
        }

        // Layer parameter aliasing: a single region runs entirely on the
        // bottom layer's values; global kappa copies the middle kappa out.
        let mut layers = LayerStack {
            bottom: layer(&cfg.layers.bottom),
            middle: layer(&cfg.layers.middle),
            top: layer(&cfg.layers.top),
        };
        if mode == SteppingMode::SingleRegion {
            layers = LayerStack::uniform(layers.bottom);
        }
        if cfg.global_kappa {
            layers.bottom.kappa = layers.middle.kappa;
            layers.top.kappa = layers.middle.kappa;
        }
        validate_layers(&layers)?;

        // Shift source-relative coordinates into cylinder coordinates.
        let (z_max, coord_shift) = match (cfg.span.ez1, cfg.span.ez2) {
            (Some(ez1), Some(ez2)) => (ez2 - ez1, -ez1),
            _ => {
                let z_max = cfg.grid.z_max.unwrap_or(2.0e-3);
                (z_max, (z_max - (lz1 + lz2)) / 2.0)
            }
        };
        let mut sz = coord_shift;
        let mut pz = cfg.probe.z_offset + coord_shift;
        let mut pr = cfg.probe.r_offset;
        lz1 += coord_shift;
        lz2 += coord_shift;

        let nr = cfg.grid.nr;
        let nz = cfg.grid.nz;
        if nr < 2 || nz < 2 {
            return Err(RtiError::ConfigError(format!(
                "Grid too small: nz={nz}, nr={nr}"
            )));
        }

        // Uniform spacing with dr forced equal to dz.
        let mut dr = cfg.grid.r_max / nr as f64;
        let dz = z_max / nz as f64;
        if (dr - dz).abs() > 1.0e-15 {
            dr = dz;
        }
        if !(dr.is_finite() && dr > 0.0) {
            return Err(RtiError::ConfigError(format!(
                "Non-positive grid spacing: dr={dr}"
            )));
        }

        // Snap positions to the grid.
        sz = (sz / dz).round() * dz;
        pz = (pz / dz).round() * dz;
        pr = (pr / dr).round() * dr;

        let iz1 = (lz1 / dz).round() as i64;
        let iz2 = (lz2 / dz).round() as i64;
        if iz1 < 0 || iz2 >= nz as i64 || iz1 >= iz2 {
            return Err(RtiError::ConfigError(format!(
                "Layer boundaries inconsistent with the cylinder: iz1={iz1}, iz2={iz2}, nz={nz}"
            )));
        }
        let iz1 = iz1 as usize;
        let iz2 = iz2 as usize;
        if mode == SteppingMode::ThreeRegion && iz2 - iz1 < 2 {
            return Err(RtiError::ConfigError(format!(
                "Middle layer has too few discrete steps: iz2-iz1={}",
                iz2 - iz1
            )));
        }

        // Time step: explicit count, or the von Neumann stability default.
        let dstar_max = layers.max_dstar(cfg.d_free);
        if !(dstar_max.is_finite() && dstar_max > 0.0) {
            return Err(RtiError::ConfigError(format!(
                "Effective diffusivity must be positive, got D*={dstar_max}"
            )));
        }
        let t_max_in = cfg.timing.t_max;
        let mut dt = match cfg.timing.nt {
            Some(0) => {
                return Err(RtiError::ConfigError("nt must be >= 1".to_string()));
            }
            Some(nt) => t_max_in / nt as f64,
            None => VON_NEUMANN_SAFETY * dr * dr / (VON_NEUMANN_DENOM * dstar_max),
        };
        if let Some(scale) = cfg.timing.nt_scale {
            if !scale.is_finite() || scale <= 0.0 {
                return Err(RtiError::ConfigError(format!(
                    "nt_scale must be finite and > 0, got {scale}"
                )));
            }
            dt /= scale;
        }

        // Round total time, duration, and delay to multiples of dt.
        let nt = (t_max_in / dt).round() as usize;
        let t_max = dt * nt as f64;
        let ns = (cfg.source.duration / dt).round() as usize;
        let duration = dt * ns as f64;
        let nds = (cfg.source.delay / dt).round() as usize;
        let delay = dt * nds as f64;

        if delay >= t_max {
            return Err(RtiError::ConfigError(format!(
                "Source delay ({delay}) must be < total time ({t_max})"
            )));
        }
        if duration >= t_max {
            return Err(RtiError::ConfigError(format!(
                "Source duration ({duration}) must be < total time ({t_max})"
            )));
        }
        if delay + duration >= t_max {
            return Err(RtiError::ConfigError(format!(
                "Source delay ({delay}) + duration ({duration}) must be < total time ({t_max})"
            )));
        }

        let grid = CylGrid::new(nz, nr, dr, iz1, iz2);

        // Primary source sits on the axis at the (shifted) origin.
        let source_cell = checked_cell(sz / dz, 0.0, &grid)?;
        let source = PointSource {
            cell: source_cell,
            rate: cfg.source.current * cfg.source.transport_number / FARADAY,
        };

        let mut extra_sources = Vec::with_capacity(cfg.source.extra.len());
        for extra in &cfg.source.extra {
            let cell = checked_cell((extra.z + coord_shift) / dz, extra.r / dr, &grid)?;
            extra_sources.push(PointSource {
                cell,
                rate: extra.current * cfg.source.transport_number / FARADAY,
            });
        }

        let probe = checked_cell(pz / dz, pr / dr, &grid)?;
        let source_probe_distance = ((pz - sz).powi(2) + pr.powi(2)).sqrt();

        Ok(SimulationSpec {
            grid,
            layers,
            d_free: cfg.d_free,
            mode,
            global_kappa: cfg.global_kappa,
            dt,
            nt,
            ns,
            nds,
            delay,
            duration,
            t_max,
            source,
            extra_sources,
            probe,
            source_probe_distance,
            coord_shift,
        })
    }

    /// dt * 6 * max(D*) / dr^2; < 1 means the explicit scheme is stable.
    pub fn stability_ratio(&self) -> f64 {
        self.dt * VON_NEUMANN_DENOM * self.layers.max_dstar(self.d_free)
            / (self.grid.dr * self.grid.dr)
    }
}

fn parse_mode(mode: &str) -> RtiResult<SteppingMode> {
    match mode {
        "single-region" | "single" => Ok(SteppingMode::SingleRegion),
        "three-region" | "layered" => Ok(SteppingMode::ThreeRegion),
        other => Err(RtiError::ConfigError(format!(
            "Unknown stepping mode '{other}' (expected 'three-region' or 'single-region')"
        ))),
    }
}

fn layer(cfg: &crate::config::LayerConfig) -> LayerParams {
    LayerParams {
        alpha: cfg.alpha,
        theta: cfg.theta,
        kappa: cfg.kappa,
    }
}

fn validate_layers(layers: &LayerStack) -> RtiResult<()> {
    for (name, p) in [
        ("bottom", &layers.bottom),
        ("middle", &layers.middle),
        ("top", &layers.top),
    ] {
        if !(p.alpha.is_finite() && p.alpha > 0.0) {
            return Err(RtiError::ConfigError(format!(
                "{name} layer alpha must be finite and > 0, got {}",
                p.alpha
            )));
        }
        if !(p.theta.is_finite() && p.theta > 0.0) {
            return Err(RtiError::ConfigError(format!(
                "{name} layer theta must be finite and > 0, got {}",
                p.theta
            )));
        }
        if !(p.kappa.is_finite() && p.kappa >= 0.0) {
            return Err(RtiError::ConfigError(format!(
                "{name} layer kappa must be finite and >= 0, got {}",
                p.kappa
            )));
        }
    }
    Ok(())
}

/// Snap fractional (z, r) grid coordinates to a cell; radial index 1 is the
/// axis. Out-of-grid cells are fatal before any stepping happens.
fn checked_cell(z_over_dz: f64, r_over_dr: f64, grid: &CylGrid) -> RtiResult<GridCell> {
    let iz = z_over_dz.round() as i64;
    let jr = 1 + r_over_dr.round() as i64;
    if iz < 0 || iz > grid.nz as i64 - 1 || jr < 0 || jr > grid.nr as i64 {
        return Err(RtiError::SourceOutOfBounds { iz, jr });
    }
    Ok(GridCell {
        iz: iz as usize,
        jr: jr as usize,
    })
}
