// ─────────────────────────────────────────────────────────────────────
// RTI Layer Core — Fitter
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Simplex fitting of diffusion parameters.
//!
//! Two objectives share the Nelder-Mead driver:
//!
//! * [`fit_apparent`] fits homogeneous (alpha, theta) so the closed-form
//!   reference curve matches a layered model curve. The result is the
//!   classical "apparent parameter" readout of an RTI experiment; it is
//!   diagnostic, not physically authoritative.
//! * [`fit_layer`] fits the middle layer's (alpha, theta) or
//!   (alpha, theta, kappa) against measured or synthetic target data,
//!   running the full forward simulation for every candidate. This is
//!   the dominant cost of the program.
//!
//! Before each evaluation alpha and theta are clamped to a small
//! positive floor; the layer fit additionally adds a linear penalty per
//! box-bound violation. Non-convergence is a warning, not an error: the
//! best vertex found is always returned.

use crate::kernel::DiffusionKernel;
use crate::reference::homogeneous_curve;
use crate::snapshot::TraceSink;
use rti_math::simplex::{minimize, SimplexConfig};
use rti_types::config::FitConfig;
use rti_types::constants::PARAM_FLOOR;
use rti_types::error::{RtiError, RtiResult};
use rti_types::geometry::{SimulationSpec, SteppingMode};
use rti_types::state::LayerParams;

/// Which middle-layer parameters are free.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitMode {
    AlphaTheta,
    AlphaThetaKappa,
}

impl FitMode {
    pub fn param_count(self) -> usize {
        match self {
            FitMode::AlphaTheta => 2,
            FitMode::AlphaThetaKappa => 3,
        }
    }
}

/// Result of a fit; `params` is the raw best vertex in fit order
/// (alpha, theta[, kappa]).
#[derive(Debug, Clone)]
pub struct FitOutcome {
    pub params: Vec<f64>,
    pub mse: f64,
    pub simplex_size: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Mean squared error between two curves sampled at different rates.
///
/// The denser curve is aligned to the sparser one by nearest-index
/// lookup; the first sample is skipped and the sum is normalized by the
/// sparser count. Curves of equal length compare element-wise.
pub fn resampled_mse(model: &[f64], target: &[f64]) -> f64 {
    let nt = model.len();
    let nd = target.len();
    assert!(nt >= 2 && nd >= 2, "curves need at least two samples");

    let mut mse = 0.0;
    if nt > nd {
        let scale = nt as f64 / nd as f64;
        for (i, t) in target.iter().enumerate().skip(1) {
            let idx = (i as f64 * scale).round() as usize;
            let diff = model[idx] - t;
            mse += diff * diff;
        }
        mse / nd as f64
    } else {
        let scale = nd as f64 / nt as f64;
        for (i, m) in model.iter().enumerate().skip(1) {
            let idx = (i as f64 * scale).round() as usize;
            let diff = m - target[idx];
            mse += diff * diff;
        }
        mse / nt as f64
    }
}

fn floor_clamp(v: f64) -> f64 {
    if v <= PARAM_FLOOR {
        PARAM_FLOOR
    } else {
        v
    }
}

fn bound_penalty(v: f64, min: f64, max: f64, factor: f64) -> f64 {
    if v < min {
        (min - v) * factor
    } else if v > max {
        (v - max) * factor
    } else {
        0.0
    }
}

/// One evaluation of the layer-fit objective at vertex `x`: retune the
/// kernel, run the forward model, and return the penalized resampled
/// MSE against `target`. Exposed for diagnostics; the simplex driver
/// calls exactly this.
pub fn evaluate_layer_mse(
    kernel: &mut DiffusionKernel,
    target: &[f64],
    fit: &FitConfig,
    mode: FitMode,
    x: &[f64],
) -> f64 {
    assert_eq!(x.len(), mode.param_count(), "vertex arity mismatch");

    let base = kernel.spec().layers;
    let global_kappa = kernel.spec().global_kappa;

    let alpha = floor_clamp(x[0]);
    let theta = floor_clamp(x[1]);
    let kappa = match mode {
        FitMode::AlphaThetaKappa => x[2],
        FitMode::AlphaTheta => base.middle.kappa,
    };

    let mut layers = base;
    layers.middle = LayerParams {
        alpha,
        theta,
        kappa,
    };
    if global_kappa {
        layers.bottom.kappa = kappa;
        layers.top.kappa = kappa;
    }

    kernel.retune(&layers);
    let curve = kernel.run();
    let mut mse = resampled_mse(curve, target);

    mse += bound_penalty(alpha, fit.min_alpha, fit.max_alpha, fit.penalty_factor);
    mse += bound_penalty(theta, fit.min_theta, fit.max_theta, fit.penalty_factor);
    if mode == FitMode::AlphaThetaKappa {
        mse += bound_penalty(kappa, fit.min_kappa, fit.max_kappa, fit.penalty_factor);
    }
    mse
}

/// Fit the middle layer of the forward model against target data.
///
/// The simplex starts at the spec's configured middle-layer values with
/// the configured step sizes. Every iteration may be mirrored to a
/// trace sink; a sink failure is logged once and ignored.
pub fn fit_layer(
    kernel: &mut DiffusionKernel,
    target: &[f64],
    mode: FitMode,
    fit: &FitConfig,
    mut trace: Option<&mut dyn TraceSink>,
) -> RtiResult<FitOutcome> {
    if kernel.spec().mode == SteppingMode::SingleRegion {
        return Err(RtiError::ConfigError(
            "Layer fitting requires the three-region stepper".to_string(),
        ));
    }
    if target.len() < 2 {
        return Err(RtiError::ConfigError(format!(
            "Target curve needs at least two samples, got {}",
            target.len()
        )));
    }

    let middle = kernel.spec().layers.middle;
    let (x0, steps) = match mode {
        FitMode::AlphaTheta => (
            vec![middle.alpha, middle.theta],
            vec![fit.alpha_step, fit.theta_step],
        ),
        FitMode::AlphaThetaKappa => (
            vec![middle.alpha, middle.theta, middle.kappa],
            vec![fit.alpha_step, fit.theta_step, fit.kappa_step],
        ),
    };

    let config = SimplexConfig {
        step: steps,
        size_tolerance: fit.tolerance,
        max_iterations: fit.max_iterations,
    };

    let mut trace_warned = false;
    let result = minimize(
        |x| evaluate_layer_mse(kernel, target, fit, mode, x),
        &x0,
        &config,
        |iter, x, f, size| {
            if let Some(sink) = trace.as_deref_mut() {
                if let Err(err) = sink.record(iter, x, f, size) {
                    if !trace_warned {
                        log::warn!("fit trace not recorded: {err}");
                        trace_warned = true;
                    }
                }
            }
        },
    );

    if !result.converged {
        log::warn!(
            "simplex did not converge in {} iterations (size {:.3e} > {:.3e}); \
             returning best vertex",
            result.iterations,
            result.size,
            fit.tolerance
        );
    }

    // Leave the kernel tuned to the best vertex so its curve matches.
    let final_mse = evaluate_layer_mse(kernel, target, fit, mode, &result.x);

    Ok(FitOutcome {
        params: result.x,
        mse: final_mse,
        simplex_size: result.size,
        iterations: result.iterations,
        converged: result.converged,
    })
}

/// Fit homogeneous apparent parameters (alpha, theta) so the closed-form
/// reference curve matches `model_curve` (one sample per time step of
/// the spec). No box penalty applies here, only the parameter floor.
pub fn fit_apparent(
    spec: &SimulationSpec,
    model_curve: &[f64],
    init_alpha: f64,
    init_theta: f64,
    fit: &FitConfig,
    mut trace: Option<&mut dyn TraceSink>,
) -> FitOutcome {
    assert_eq!(
        model_curve.len(),
        spec.nt,
        "model curve must cover every time step"
    );

    let config = SimplexConfig {
        step: vec![fit.alpha_step, fit.theta_step],
        size_tolerance: fit.tolerance,
        max_iterations: fit.max_iterations,
    };

    let mut trace_warned = false;
    let result = minimize(
        |x| {
            let alpha = floor_clamp(x[0]);
            let theta = floor_clamp(x[1]);
            let theory = homogeneous_curve(
                spec.nt,
                spec.dt,
                spec.source_probe_distance,
                spec.source.rate,
                spec.delay,
                spec.duration,
                spec.d_free,
                alpha,
                theta,
            );
            resampled_mse(&theory, model_curve)
        },
        &[init_alpha, init_theta],
        &config,
        |iter, x, f, size| {
            if let Some(sink) = trace.as_deref_mut() {
                if let Err(err) = sink.record(iter, x, f, size) {
                    if !trace_warned {
                        log::warn!("fit trace not recorded: {err}");
                        trace_warned = true;
                    }
                }
            }
        },
    );

    if !result.converged {
        log::warn!(
            "apparent-parameter fit did not converge in {} iterations \
             (size {:.3e}); returning best vertex",
            result.iterations,
            result.size
        );
    }

    FitOutcome {
        params: result.x.clone(),
        mse: result.fval,
        simplex_size: result.size,
        iterations: result.iterations,
        converged: result.converged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rti_types::config::ExperimentConfig;

    #[test]
    fn test_resampled_mse_exact_on_integer_ratio() {
        // Dense curve sampled 10x finer over the same span: indices align
        // exactly and any shared function gives zero error.
        let nd = 100;
        let nt = 1000;
        let f = |t: f64| (t * 3.0).sin() + 0.5 * t;
        let model: Vec<f64> = (0..nt).map(|i| f(i as f64 / nt as f64)).collect();
        let target: Vec<f64> = (0..nd).map(|i| f(i as f64 / nd as f64)).collect();
        assert_eq!(resampled_mse(&model, &target), 0.0);
    }

    #[test]
    fn test_resampled_mse_small_on_ragged_ratio() {
        // Non-integer rate ratio: nearest-index alignment is off by at
        // most half a dense step, so a smooth curve stays near zero.
        let nd = 100;
        let nt = 997;
        let f = |t: f64| t * t;
        let model: Vec<f64> = (0..nt).map(|i| f(i as f64 / nt as f64)).collect();
        let target: Vec<f64> = (0..nd).map(|i| f(i as f64 / nd as f64)).collect();
        let mse = resampled_mse(&model, &target);
        assert!(mse < 1e-6, "mse = {mse}");
    }

    #[test]
    fn test_resampled_mse_skips_first_sample() {
        let mut model = vec![0.0; 50];
        let target = vec![0.0; 50];
        model[0] = 1.0e6;
        assert_eq!(resampled_mse(&model, &target), 0.0);
    }

    #[test]
    fn test_resampled_mse_sparse_model_dense_target() {
        // Model sparser than the data: the data is downsampled instead.
        let f = |t: f64| 2.0 * t;
        let model: Vec<f64> = (0..50).map(|i| f(i as f64 / 50.0)).collect();
        let target: Vec<f64> = (0..500).map(|i| f(i as f64 / 500.0)).collect();
        assert_eq!(resampled_mse(&model, &target), 0.0);
    }

    #[test]
    fn test_bound_penalty_linear_in_violation() {
        assert_eq!(bound_penalty(0.1, 0.0, 0.25, 10.0), 0.0);
        assert!((bound_penalty(0.35, 0.0, 0.25, 10.0) - 1.0).abs() < 1e-12);
        assert!((bound_penalty(0.45, 0.0, 0.25, 10.0) - 2.0).abs() < 1e-12);
        assert!((bound_penalty(-0.1, 0.0, 0.25, 10.0) - 1.0).abs() < 1e-12);
        // Doubling the factor doubles the penalty.
        assert!((bound_penalty(0.35, 0.0, 0.25, 20.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_floor_clamp() {
        assert_eq!(floor_clamp(-1.0), PARAM_FLOOR);
        assert_eq!(floor_clamp(0.0), PARAM_FLOOR);
        assert_eq!(floor_clamp(PARAM_FLOOR), PARAM_FLOOR);
        assert_eq!(floor_clamp(0.2), 0.2);
    }

    /// Apparent-parameter recovery: generate the reference curve from
    /// known parameters, fit from a different start, recover to 1e-3.
    #[test]
    fn test_apparent_fit_recovers_known_parameters() {
        let mut cfg = ExperimentConfig::with_defaults("apparent");
        cfg.timing.t_max = 100.0;
        cfg.timing.nt = Some(2000);
        cfg.source.delay = 5.0;
        cfg.source.duration = 40.0;
        let spec = rti_types::geometry::SimulationSpec::build(&cfg).unwrap();

        let (alpha_true, theta_true) = (0.21, 0.45);
        let model = homogeneous_curve(
            spec.nt,
            spec.dt,
            spec.source_probe_distance,
            spec.source.rate,
            spec.delay,
            spec.duration,
            spec.d_free,
            alpha_true,
            theta_true,
        );

        let mut fit = cfg.fit.clone();
        fit.tolerance = 1.0e-7;
        fit.max_iterations = 500;
        let outcome = fit_apparent(&spec, &model, 0.1, 0.25, &fit, None);

        assert!(outcome.converged, "apparent fit did not converge");
        assert!(
            (outcome.params[0] - alpha_true).abs() < 1e-3,
            "alpha = {}",
            outcome.params[0]
        );
        assert!(
            (outcome.params[1] - theta_true).abs() < 1e-3,
            "theta = {}",
            outcome.params[1]
        );
        assert!(outcome.mse < 1e-12);
    }

    #[test]
    fn test_apparent_fit_traces_iterations() {
        let mut cfg = ExperimentConfig::with_defaults("trace");
        cfg.timing.t_max = 50.0;
        cfg.timing.nt = Some(400);
        cfg.source.delay = 5.0;
        cfg.source.duration = 20.0;
        let spec = rti_types::geometry::SimulationSpec::build(&cfg).unwrap();

        let model = homogeneous_curve(
            spec.nt,
            spec.dt,
            spec.source_probe_distance,
            spec.source.rate,
            spec.delay,
            spec.duration,
            spec.d_free,
            0.2,
            0.4,
        );

        let mut trace = crate::snapshot::VecTraceSink::default();
        let outcome = fit_apparent(&spec, &model, 0.15, 0.3, &cfg.fit, Some(&mut trace));

        assert_eq!(trace.entries.len(), outcome.iterations);
        assert_eq!(trace.entries[0].0, 1);
        assert_eq!(trace.entries[0].1.len(), 2);
        // Final entry agrees with the outcome.
        let last = trace.entries.last().unwrap();
        assert!((last.2 - outcome.mse).abs() < 1e-15);
    }
}
