// ─────────────────────────────────────────────────────────────────────
// RTI Layer Core — Laplacian
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Discrete Laplacian in cylindrical coordinates.
//!
//! The concentration update per explicit step is
//!
//!   delta = s1 · (∂²/∂z² + ∂²/∂r²) c + s2 · (1/r) ∂c/∂r
//!
//! with s1 = D*·Δt/Δr² and s2 = D*·Δt/(2Δr); the azimuthal term vanishes
//! by symmetry and Δz == Δr collapses the axial and radial kernels into a
//! single 5-point stencil. Rows are z, columns are r; column 1 is the
//! axis r = 0, where the 1/r term is replaced via L'Hôpital's rule by a
//! second ∂²/∂r², i.e. the kernel weights become (2, -6, 2) radially.
//!
//! Rows 0 and m-1 use one-sided stencils that drop the missing neighbor
//! while keeping the full center weight, so the outermost rows see an
//! implicit absorbing boundary; the same applies to the outermost radial
//! column. This edge treatment is the reference behavior of the solver
//! and is kept bit-for-bit, including the write order on the axis ends.

use ndarray::{Array1, Array2};

/// Accumulate the cylindrical-Laplacian delta of `a` into `out`.
///
/// `a` and `out` are (m, n) with m axial rows and n radial columns;
/// `inv_r[j]` is the 1/r lookup per column (zero on the axis column).
/// Caller guarantees m >= 2 and n >= 3 (axis column plus a mirror and at
/// least one physical column).
pub fn cyl_laplacian_delta(
    a: &Array2<f64>,
    scale1: f64,
    scale2: f64,
    inv_r: &Array1<f64>,
    out: &mut Array2<f64>,
) {
    let (m, n) = a.dim();
    assert!(m >= 2, "need at least two axial rows, got {m}");
    assert!(n >= 3, "need at least three radial columns, got {n}");
    assert_eq!(out.dim(), (m, n), "output shape mismatch");
    assert_eq!(inv_r.len(), n, "inv_r length mismatch");

    // Interior first, edges and corners after.
    for i in 1..m - 1 {
        for j in 2..n - 1 {
            out[[i, j]] = scale1
                * (a[[i - 1, j]] + a[[i, j - 1]] - 4.0 * a[[i, j]] + a[[i, j + 1]] + a[[i + 1, j]])
                + scale2 * ((-a[[i, j - 1]] + a[[i, j + 1]]) * inv_r[j]);
        }
    }

    // Axis column j = 1: modified radial weights (2, -6, 2).
    for i in 1..m - 1 {
        out[[i, 1]] = scale1
            * (a[[i - 1, 1]] + 2.0 * a[[i, 0]] - 6.0 * a[[i, 1]] + 2.0 * a[[i, 2]] + a[[i + 1, 1]]);
    }
    out[[0, 1]] =
        scale1 * (2.0 * a[[0, 0]] - 6.0 * a[[0, 1]] + 2.0 * a[[0, 2]] + a[[1, 1]]);
    out[[m - 1, 1]] = scale1
        * (a[[m - 2, 1]] + 2.0 * a[[m - 1, 0]] - 6.0 * a[[m - 1, 1]] + 2.0 * a[[m - 1, 2]]);

    // Bottom row i = 0 (overwrites the axis entry above with the plain
    // five-point form, matching the reference write order).
    for j in 1..n - 1 {
        out[[0, j]] = scale1
            * (a[[0, j - 1]] - 4.0 * a[[0, j]] + a[[0, j + 1]] + a[[1, j]])
            + scale2 * ((-a[[0, j - 1]] + a[[0, j + 1]]) * inv_r[j]);
    }

    // Top row i = m-1.
    for j in 1..n - 1 {
        out[[m - 1, j]] = scale1
            * (a[[m - 2, j]] + a[[m - 1, j - 1]] - 4.0 * a[[m - 1, j]] + a[[m - 1, j + 1]])
            + scale2 * ((-a[[m - 1, j - 1]] + a[[m - 1, j + 1]]) * inv_r[j]);
    }

    // Mirror column j = 0.
    for i in 1..m - 1 {
        out[[i, 0]] = scale1
            * (a[[i - 1, 0]] - 4.0 * a[[i, 0]] + a[[i, 1]] + a[[i + 1, 0]])
            + scale2 * (a[[i, 1]] * inv_r[0]);
    }

    // Outer column j = n-1.
    for i in 1..m - 1 {
        out[[i, n - 1]] = scale1
            * (a[[i - 1, n - 1]] + a[[i, n - 2]] - 4.0 * a[[i, n - 1]] + a[[i + 1, n - 1]])
            + scale2 * (-a[[i, n - 2]] * inv_r[n - 1]);
    }

    // Corners.
    out[[0, 0]] = scale1 * (-4.0 * a[[0, 0]] + a[[0, 1]] + a[[1, 0]])
        + scale2 * (a[[0, 1]] * inv_r[0]);
    out[[0, n - 1]] = scale1 * (a[[0, n - 2]] - 4.0 * a[[0, n - 1]] + a[[1, n - 1]])
        + scale2 * (-a[[0, n - 2]] * inv_r[n - 1]);
    out[[m - 1, 0]] = scale1 * (a[[m - 2, 0]] - 4.0 * a[[m - 1, 0]] + a[[m - 1, 1]])
        + scale2 * (a[[m - 1, 1]] * inv_r[0]);
    out[[m - 1, n - 1]] = scale1
        * (a[[m - 2, n - 1]] + a[[m - 1, n - 2]] - 4.0 * a[[m - 1, n - 1]])
        + scale2 * (-a[[m - 1, n - 2]] * inv_r[n - 1]);
}
