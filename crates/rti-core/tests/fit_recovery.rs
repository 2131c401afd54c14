// ─────────────────────────────────────────────────────────────────────
// RTI Layer Core — Fitter Integration Tests
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Layer-fit behavior against the full forward model: bound penalties,
//! known-truth recovery, trace emission, and mode validation.

use rti_core::fitter::{evaluate_layer_mse, fit_layer, FitMode};
use rti_core::kernel::DiffusionKernel;
use rti_core::snapshot::VecTraceSink;
use rti_types::config::ExperimentConfig;
use rti_types::error::RtiError;

/// Very coarse grid: one forward run costs well under a millisecond of
/// grid work, so the simplex can afford hundreds of evaluations.
fn coarse_config() -> ExperimentConfig {
    let mut cfg = ExperimentConfig::with_defaults("fit");
    cfg.grid.nr = 20;
    cfg.grid.nz = 40;
    cfg.span.lz1 = -200.0e-6;
    cfg.span.lz2 = 200.0e-6;
    cfg.timing.t_max = 40.0;
    cfg.source.delay = 4.0;
    cfg.source.duration = 16.0;
    cfg
}

/// Probe curve of the coarse protocol at given middle-layer parameters.
fn synthetic_target(alpha: f64, theta: f64, kappa: f64) -> Vec<f64> {
    let mut cfg = coarse_config();
    cfg.layers.middle.alpha = alpha;
    cfg.layers.middle.theta = theta;
    cfg.layers.middle.kappa = kappa;
    let mut kernel = DiffusionKernel::from_config(&cfg).unwrap();
    kernel.run().to_vec()
}

#[test]
fn out_of_bounds_alpha_pays_linear_penalty() {
    let cfg = coarse_config();
    let target = synthetic_target(0.2, 0.4, 0.01);
    let mut kernel = DiffusionKernel::from_config(&cfg).unwrap();

    // A penalty factor far above the raw MSE scale isolates the penalty
    // term from forward-model differences.
    let mut fit = cfg.fit.clone();
    fit.penalty_factor = 1.0e6;

    let at_bound = evaluate_layer_mse(
        &mut kernel,
        &target,
        &fit,
        FitMode::AlphaTheta,
        &[fit.max_alpha, 0.4],
    );
    let beyond_1 = evaluate_layer_mse(
        &mut kernel,
        &target,
        &fit,
        FitMode::AlphaTheta,
        &[fit.max_alpha + 0.1, 0.4],
    );
    let beyond_2 = evaluate_layer_mse(
        &mut kernel,
        &target,
        &fit,
        FitMode::AlphaTheta,
        &[fit.max_alpha + 0.2, 0.4],
    );

    assert!(beyond_1 > at_bound, "violation must raise the objective");
    let step_1 = beyond_1 - at_bound;
    let step_2 = beyond_2 - beyond_1;
    // Both increments carry the same 0.1 * factor penalty share.
    assert!(
        ((step_1 - 0.1 * fit.penalty_factor) / (0.1 * fit.penalty_factor)).abs() < 1e-2,
        "penalty increment {step_1} not proportional"
    );
    assert!(
        ((step_2 - step_1) / step_1).abs() < 1e-2,
        "penalty not linear: {step_1} vs {step_2}"
    );
}

#[test]
fn kappa_penalty_applies_only_in_three_parameter_mode() {
    let cfg = coarse_config();
    let target = synthetic_target(0.2, 0.4, 0.01);
    let mut kernel = DiffusionKernel::from_config(&cfg).unwrap();

    let mut fit = cfg.fit.clone();
    fit.penalty_factor = 1.0e6;
    let kappa_bad = fit.max_kappa + 0.05;

    let three = evaluate_layer_mse(
        &mut kernel,
        &target,
        &fit,
        FitMode::AlphaThetaKappa,
        &[0.2, 0.4, kappa_bad],
    );
    assert!(
        three > 0.04 * fit.penalty_factor,
        "kappa violation not penalized: {three}"
    );
}

#[test]
fn layer_fit_recovers_known_middle_parameters() {
    let cfg = coarse_config();
    // Truth differs from the configured starting point (0.2, 0.4).
    let (alpha_true, theta_true) = (0.15, 0.3);
    let target = synthetic_target(alpha_true, theta_true, 0.01);

    let mut kernel = DiffusionKernel::from_config(&cfg).unwrap();
    let mut fit = cfg.fit.clone();
    fit.tolerance = 1.0e-6;
    fit.max_iterations = 300;

    let mut trace = VecTraceSink::default();
    let outcome = fit_layer(
        &mut kernel,
        &target,
        FitMode::AlphaTheta,
        &fit,
        Some(&mut trace),
    )
    .unwrap();

    assert!(outcome.converged, "fit did not converge");
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
    // Target came from the same solver, so the floor is essentially zero.
    let peak = target.iter().cloned().fold(0.0_f64, f64::max);
    assert!(outcome.mse < 1e-8 * peak * peak, "mse = {}", outcome.mse);

    // Trace mirrors the iterations and the MSE is non-increasing.
    assert_eq!(trace.entries.len(), outcome.iterations);
    for pair in trace.entries.windows(2) {
        assert!(pair[1].2 <= pair[0].2 + 1e-18);
    }

    // The kernel was left tuned to the best vertex.
    let replay = kernel.curve().to_vec();
    let mse = rti_core::fitter::resampled_mse(&replay, &target);
    assert!((mse - outcome.mse).abs() <= f64::EPSILON * (1.0 + outcome.mse));
}

#[test]
fn three_parameter_fit_reaches_the_target_curve() {
    let cfg = coarse_config();
    let target = synthetic_target(0.17, 0.35, 0.02);

    let mut kernel = DiffusionKernel::from_config(&cfg).unwrap();
    let mut fit = cfg.fit.clone();
    fit.tolerance = 1.0e-6;
    fit.max_iterations = 400;

    let outcome = fit_layer(&mut kernel, &target, FitMode::AlphaThetaKappa, &fit, None).unwrap();

    let peak = target.iter().cloned().fold(0.0_f64, f64::max);
    assert!(
        outcome.mse < 1e-6 * peak * peak,
        "three-parameter fit stalled: mse = {}",
        outcome.mse
    );
    assert!(outcome.params.iter().all(|p| p.is_finite()));
}

#[test]
fn single_region_kernel_rejected_for_layer_fit() {
    let mut cfg = coarse_config();
    cfg.mode = "single-region".to_string();
    let target = synthetic_target(0.2, 0.4, 0.01);
    let mut kernel = DiffusionKernel::from_config(&cfg).unwrap();

    let err = fit_layer(
        &mut kernel,
        &target,
        FitMode::AlphaTheta,
        &cfg.fit,
        None,
    )
    .unwrap_err();
    assert!(matches!(err, RtiError::ConfigError(_)));
}

#[test]
fn short_target_rejected() {
    let cfg = coarse_config();
    let mut kernel = DiffusionKernel::from_config(&cfg).unwrap();
    let err = fit_layer(&mut kernel, &[0.0], FitMode::AlphaTheta, &cfg.fit, None).unwrap_err();
    assert!(matches!(err, RtiError::ConfigError(_)));
}

#[test]
fn sparse_target_data_is_resampled() {
    // Target with ~7x fewer samples than the model curve still drives
    // the fit: the model curve is downsampled by nearest index.
    let cfg = coarse_config();
    let dense = synthetic_target(0.16, 0.33, 0.01);
    let sparse: Vec<f64> = dense.iter().step_by(7).cloned().collect();
    assert!(sparse.len() * 6 < dense.len());

    let mut kernel = DiffusionKernel::from_config(&cfg).unwrap();
    let mut fit = cfg.fit.clone();
    fit.tolerance = 1.0e-5;
    fit.max_iterations = 300;

    let outcome = fit_layer(&mut kernel, &sparse, FitMode::AlphaTheta, &fit, None).unwrap();
    let peak = dense.iter().cloned().fold(0.0_f64, f64::max);
    // Nearest-index alignment leaves a small but bounded residual.
    assert!(
        outcome.mse < 1e-3 * peak * peak,
        "sparse-target fit stalled: mse = {}",
        outcome.mse
    );
    assert!((outcome.params[0] - 0.16).abs() < 0.05, "alpha drifted far");
}
