// ─────────────────────────────────────────────────────────────────────
// RTI Layer Core — Simplex
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Nelder-Mead simplex minimization.
//!
//! Derivative-free search over an n-dimensional parameter space: the
//! objective here is a full forward simulation, so gradients are neither
//! available nor trustworthy. The simplex starts at the initial guess
//! plus one vertex per parameter offset by its step size, then moves by
//! reflection, expansion, contraction, and shrink. The stopping measure
//! is the mean vertex distance from the simplex centroid.

/// Reflection coefficient.
const REFLECT: f64 = 1.0;
/// Expansion coefficient.
const EXPAND: f64 = 2.0;
/// Contraction coefficient.
const CONTRACT: f64 = 0.5;
/// Shrink coefficient (toward the best vertex).
const SHRINK: f64 = 0.5;

#[derive(Debug, Clone)]
pub struct SimplexConfig {
    /// Initial offset per parameter; defines the starting simplex.
    pub step: Vec<f64>,
    /// Stop when the simplex size falls below this.
    pub size_tolerance: f64,
    /// Hard cap on iterations.
    pub max_iterations: usize,
}

#[derive(Debug, Clone)]
pub struct SimplexResult {
    /// Best vertex found (also returned when not converged).
    pub x: Vec<f64>,
    /// Objective value at the best vertex.
    pub fval: f64,
    /// Final simplex size.
    pub size: f64,
    /// Iterations actually run.
    pub iterations: usize,
    /// True when the size tolerance was met within the cap.
    pub converged: bool,
}

/// Minimize `f` starting from `x0`.
///
/// `observer` is invoked after every iteration with
/// (iteration index starting at 1, current best vertex, its value,
/// simplex size); pass a no-op closure when no trace is wanted.
///
/// Panics when `x0` is empty, the step vector length differs from `x0`,
/// or the tolerance is not positive.
pub fn minimize<F, O>(mut f: F, x0: &[f64], config: &SimplexConfig, mut observer: O) -> SimplexResult
where
    F: FnMut(&[f64]) -> f64,
    O: FnMut(usize, &[f64], f64, f64),
{
    let n = x0.len();
    assert!(n > 0, "at least one parameter required");
    assert_eq!(config.step.len(), n, "step vector length mismatch");
    assert!(
        config.size_tolerance > 0.0,
        "size tolerance must be positive"
    );

    // Initial simplex: x0 plus one vertex per axis.
    let mut vertices: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
    vertices.push(x0.to_vec());
    for i in 0..n {
        let mut v = x0.to_vec();
        v[i] += config.step[i];
        vertices.push(v);
    }
    let mut values: Vec<f64> = vertices.iter().map(|v| f(v)).collect();

    let mut iterations = 0;
    let mut converged = false;
    let mut size = simplex_size(&vertices);

    for iter in 1..=config.max_iterations {
        iterations = iter;

        let (best, second_worst, worst) = order(&values);

        // Centroid of all vertices except the worst.
        let mut centroid = vec![0.0; n];
        for (idx, v) in vertices.iter().enumerate() {
            if idx == worst {
                continue;
            }
            for (c, x) in centroid.iter_mut().zip(v.iter()) {
                *c += x;
            }
        }
        for c in centroid.iter_mut() {
            *c /= n as f64;
        }

        let reflected = blend(&centroid, &vertices[worst], -REFLECT);
        let f_reflected = f(&reflected);

        if f_reflected < values[best] {
            // Promising direction: try going further.
            let expanded = blend(&centroid, &vertices[worst], -EXPAND);
            let f_expanded = f(&expanded);
            if f_expanded < f_reflected {
                vertices[worst] = expanded;
                values[worst] = f_expanded;
            } else {
                vertices[worst] = reflected;
                values[worst] = f_reflected;
            }
        } else if f_reflected < values[second_worst] {
            vertices[worst] = reflected;
            values[worst] = f_reflected;
        } else {
            // Contract, outside or inside of the worst vertex.
            let (contracted, f_contracted) = if f_reflected < values[worst] {
                let c = blend(&centroid, &reflected, CONTRACT);
                let fc = f(&c);
                (c, fc)
            } else {
                let c = blend(&centroid, &vertices[worst], CONTRACT);
                let fc = f(&c);
                (c, fc)
            };

            if f_contracted < values[worst].min(f_reflected) {
                vertices[worst] = contracted;
                values[worst] = f_contracted;
            } else {
                // Nothing helped: shrink everything toward the best vertex.
                let best_vertex = vertices[best].clone();
                for (idx, v) in vertices.iter_mut().enumerate() {
                    if idx == best {
                        continue;
                    }
                    for (x, b) in v.iter_mut().zip(best_vertex.iter()) {
                        *x = b + SHRINK * (*x - b);
                    }
                    values[idx] = f(v);
                }
            }
        }

        size = simplex_size(&vertices);
        let (best, _, _) = order(&values);
        observer(iter, &vertices[best], values[best], size);

        if size < config.size_tolerance {
            converged = true;
            break;
        }
    }

    let (best, _, _) = order(&values);
    SimplexResult {
        x: vertices[best].clone(),
        fval: values[best],
        size,
        iterations,
        converged,
    }
}

/// Indices of the best, second-worst, and worst vertices.
fn order(values: &[f64]) -> (usize, usize, usize) {
    let mut best = 0;
    let mut worst = 0;
    for (i, &v) in values.iter().enumerate() {
        if v < values[best] {
            best = i;
        }
        if v > values[worst] {
            worst = i;
        }
    }
    let mut second_worst = best;
    for (i, &v) in values.iter().enumerate() {
        if i != worst && v > values[second_worst] {
            second_worst = i;
        }
    }
    (best, second_worst, worst)
}

/// centroid + coeff * (vertex - centroid); negative coeff reflects.
fn blend(centroid: &[f64], vertex: &[f64], coeff: f64) -> Vec<f64> {
    centroid
        .iter()
        .zip(vertex.iter())
        .map(|(c, v)| c + coeff * (v - c))
        .collect()
}

/// Mean Euclidean distance of the vertices from the simplex centroid.
fn simplex_size(vertices: &[Vec<f64>]) -> f64 {
    let n = vertices[0].len();
    let count = vertices.len() as f64;

    let mut center = vec![0.0; n];
    for v in vertices {
        for (c, x) in center.iter_mut().zip(v.iter()) {
            *c += x;
        }
    }
    for c in center.iter_mut() {
        *c /= count;
    }

    let mut total = 0.0;
    for v in vertices {
        let dist_sq: f64 = v
            .iter()
            .zip(center.iter())
            .map(|(x, c)| (x - c) * (x - c))
            .sum();
        total += dist_sq.sqrt();
    }
    total / count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(steps: &[f64]) -> SimplexConfig {
        SimplexConfig {
            step: steps.to_vec(),
            size_tolerance: 1e-8,
            max_iterations: 500,
        }
    }

    #[test]
    fn test_quadratic_bowl_recovered() {
        let target = [1.5, -2.0];
        let result = minimize(
            |x| (x[0] - target[0]).powi(2) + (x[1] - target[1]).powi(2),
            &[0.0, 0.0],
            &config(&[0.5, 0.5]),
            |_, _, _, _| {},
        );
        assert!(result.converged, "should converge on a quadratic");
        assert!((result.x[0] - target[0]).abs() < 1e-4, "x0 = {}", result.x[0]);
        assert!((result.x[1] - target[1]).abs() < 1e-4, "x1 = {}", result.x[1]);
        assert!(result.fval < 1e-7);
    }

    #[test]
    fn test_anisotropic_quadratic() {
        // Strongly different curvatures per axis, off-center start.
        let result = minimize(
            |x| 100.0 * (x[0] - 0.3).powi(2) + 0.01 * (x[1] - 7.0).powi(2) + 5.0,
            &[2.0, 0.0],
            &SimplexConfig {
                step: vec![0.1, 1.0],
                size_tolerance: 1e-10,
                max_iterations: 2000,
            },
            |_, _, _, _| {},
        );
        assert!(result.converged);
        assert!((result.x[0] - 0.3).abs() < 1e-3);
        assert!((result.x[1] - 7.0).abs() < 1e-2);
        assert!((result.fval - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_one_dimensional_minimization() {
        let result = minimize(
            |x| (x[0] - 4.0).powi(2),
            &[0.0],
            &config(&[1.0]),
            |_, _, _, _| {},
        );
        assert!(result.converged);
        assert!((result.x[0] - 4.0).abs() < 1e-4);
    }

    #[test]
    fn test_iteration_cap_reported_as_not_converged() {
        let result = minimize(
            |x| (x[0] - 100.0).powi(2) + (x[1] + 50.0).powi(2),
            &[0.0, 0.0],
            &SimplexConfig {
                step: vec![0.01, 0.01],
                size_tolerance: 1e-14,
                max_iterations: 3,
            },
            |_, _, _, _| {},
        );
        assert!(!result.converged);
        assert_eq!(result.iterations, 3);
        // Best vertex is still returned.
        assert!(result.fval.is_finite());
    }

    #[test]
    fn test_observer_sees_every_iteration() {
        let mut seen = Vec::new();
        let result = minimize(
            |x| x[0] * x[0] + x[1] * x[1],
            &[1.0, 1.0],
            &SimplexConfig {
                step: vec![0.5, 0.5],
                size_tolerance: 1e-6,
                max_iterations: 300,
            },
            |iter, _, fval, size| seen.push((iter, fval, size)),
        );
        assert_eq!(seen.len(), result.iterations);
        assert_eq!(seen[0].0, 1);
        // Best value never increases along the trace.
        for w in seen.windows(2) {
            assert!(w[1].1 <= w[0].1 + 1e-15, "best value increased: {w:?}");
        }
        // Final trace entry matches the returned state.
        let last = seen.last().unwrap();
        assert!((last.1 - result.fval).abs() < 1e-15);
        assert!((last.2 - result.size).abs() < 1e-15);
    }

    #[test]
    fn test_initial_simplex_spans_steps() {
        // With a zero-iteration budget the result is the best initial
        // vertex; steps pointing downhill must be visible.
        let result = minimize(
            |x| (x[0] - 1.0).powi(2),
            &[0.0],
            &SimplexConfig {
                step: vec![1.0],
                size_tolerance: 1e-12,
                max_iterations: 1,
            },
            |_, _, _, _| {},
        );
        // Vertex x0 + step = 1.0 is the exact minimum.
        assert!(result.fval < 1e-12);
    }

    #[test]
    #[should_panic(expected = "at least one parameter")]
    fn test_empty_parameter_vector_rejected() {
        minimize(|_| 0.0, &[], &config(&[]), |_, _, _, _| {});
    }
}
