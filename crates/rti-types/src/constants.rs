// ─────────────────────────────────────────────────────────────────────
// RTI Layer Core — Constants
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
/// Faraday constant (C/mol).
pub const FARADAY: f64 = 96485.3399;

/// Lower floor applied to volume fraction and permeability before every
/// objective evaluation. Keeps the forward model out of the degenerate
/// alpha <= 0 / theta <= 0 regime.
pub const PARAM_FLOOR: f64 = 0.001;

/// Safety factor applied to the von Neumann time-step bound
/// dt = SAFETY * dr^2 / (6 * max(D*)).
pub const VON_NEUMANN_SAFETY: f64 = 0.9;

/// Denominator of the von Neumann bound for the 3D cylindrical stencil.
pub const VON_NEUMANN_DENOM: f64 = 6.0;

/// Default linear multiplier for soft box-bound violations during fitting.
pub const DEFAULT_PENALTY_FACTOR: f64 = 10.0;

/// Default simplex size tolerance (stopping criterion).
pub const DEFAULT_FIT_TOLERANCE: f64 = 1.0e-4;

/// Default cap on simplex iterations.
pub const DEFAULT_FIT_MAX_ITERATIONS: usize = 100;
