// ─────────────────────────────────────────────────────────────────────
// RTI Layer Core — Reference
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Closed-form diffusion curve for a homogeneous, isotropic medium.
//!
//! For a point source releasing Q mol/s switched on at t = delay, the
//! concentration at distance d is
//!
//!   c(t) = A erfc( d / (2 sqrt(D* (t - delay))) ),
//!   A = Q / (4 pi alpha D* d)
//!
//! and switching the source off at delay + duration subtracts the same
//! term shifted by the duration (superposition of an equal negative
//! source). Clearance is not modeled by this formula; the curve is the
//! classical diffusion-analysis reference against which the layered
//! solver's output is compared to extract apparent parameters.

use statrs::function::erf::erfc;

/// Sample the homogeneous curve on the solver's time grid t_k = k dt.
///
/// `distance` is the source-probe separation (m), `rate` the release in
/// mol/s, `alpha`/`theta` the homogeneous medium parameters.
#[allow(clippy::too_many_arguments)]
pub fn homogeneous_curve(
    nt: usize,
    dt: f64,
    distance: f64,
    rate: f64,
    delay: f64,
    duration: f64,
    d_free: f64,
    alpha: f64,
    theta: f64,
) -> Vec<f64> {
    let dstar = theta * d_free;
    let amplitude = rate / (4.0 * std::f64::consts::PI * alpha * dstar * distance);

    let mut curve = vec![0.0; nt];
    for (k, value) in curve.iter_mut().enumerate() {
        let t = k as f64 * dt;
        if t <= delay {
            continue;
        }
        let mut c = amplitude * erfc(distance / (2.0 * (dstar * (t - delay)).sqrt()));
        if t > delay + duration {
            c -= amplitude * erfc(distance / (2.0 * (dstar * (t - delay - duration)).sqrt()));
        }
        *value = c;
    }
    curve
}

#[cfg(test)]
mod tests {
    use super::*;

    const D_FREE: f64 = 1.24e-9;

    #[test]
    fn test_zero_before_and_during_delay() {
        let curve = homogeneous_curve(100, 0.5, 120.0e-6, 1.0e-13, 10.0, 20.0, D_FREE, 0.2, 0.4);
        // t = k * 0.5 <= 10 for k <= 20
        for k in 0..=20 {
            assert_eq!(curve[k], 0.0, "nonzero at k={k}");
        }
        assert!(curve[21] > 0.0);
    }

    #[test]
    fn test_monotone_rise_while_source_on() {
        let curve = homogeneous_curve(200, 0.5, 120.0e-6, 1.0e-13, 10.0, 60.0, D_FREE, 0.2, 0.4);
        // Source on for t in (10, 70]; the erfc argument shrinks with t.
        for k in 22..140 {
            assert!(
                curve[k] > curve[k - 1],
                "curve not rising at k={k}: {} <= {}",
                curve[k],
                curve[k - 1]
            );
        }
    }

    #[test]
    fn test_decay_after_shutoff() {
        let curve = homogeneous_curve(400, 0.5, 120.0e-6, 1.0e-13, 10.0, 50.0, D_FREE, 0.2, 0.4);
        // Well after shutoff at t = 60 the superposition drains the curve.
        for k in 130..400 {
            assert!(
                curve[k] < curve[k - 1],
                "curve not decaying at k={k}"
            );
        }
        assert!(curve[399] < 0.5 * curve[120]);
    }

    #[test]
    fn test_steady_state_amplitude() {
        // For t >> d^2/D* with the source still on, erfc -> 1 and the
        // curve approaches A = Q/(4 pi alpha D* d).
        let alpha = 0.2;
        let theta = 0.4;
        let d = 50.0e-6;
        let rate = 1.0e-13;
        let dstar = theta * D_FREE;
        let a = rate / (4.0 * std::f64::consts::PI * alpha * dstar * d);

        // d^2/D* ~ 5 s here; 10^4 s is deep in the plateau.
        let curve = homogeneous_curve(10_001, 1.0, d, rate, 0.0, 2.0e4, D_FREE, alpha, theta);
        let plateau = curve[10_000];
        assert!(
            (plateau - a).abs() / a < 0.02,
            "plateau {plateau} vs amplitude {a}"
        );
    }

    #[test]
    fn test_faster_medium_rises_earlier() {
        let slow = homogeneous_curve(200, 0.5, 120.0e-6, 1.0e-13, 5.0, 80.0, D_FREE, 0.2, 0.3);
        let fast = homogeneous_curve(200, 0.5, 120.0e-6, 1.0e-13, 5.0, 80.0, D_FREE, 0.2, 0.6);
        // Early on, higher permeability means the front arrives sooner.
        assert!(fast[30] > slow[30]);
    }
}
