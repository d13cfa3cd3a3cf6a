//! Numerical kernels used by the layout phases.

pub mod bfgs;
pub mod poly;
pub mod root;
pub mod simplex;

use std::time::{Duration, Instant};

/// Iteration and wall-clock limits for one optimizer run.
#[derive(Debug, Clone, Copy)]
pub struct Budget {
    pub max_iterations: usize,
    /// Relative decrease of the objective below which a run counts as converged.
    pub tolerance: f64,
    pub deadline: Option<Instant>,
}

impl Budget {
    pub fn new(max_iterations: usize, tolerance: f64, time_budget: Option<Duration>) -> Self {
        Self {
            max_iterations,
            tolerance,
            deadline: time_budget.map(|d| Instant::now() + d),
        }
    }

    pub fn expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// A scalar function of a parameter vector.
pub trait Objective {
    fn value(&self, x: &[f64]) -> f64;

    /// Gradient into `grad`. Defaults to central differences.
    fn gradient(&self, x: &[f64], grad: &mut [f64]) {
        central_difference(|p| self.value(p), x, grad);
    }
}

/// Central finite differences with a per-coordinate step scaled to the coordinate's magnitude.
pub fn central_difference<F>(f: F, x: &[f64], grad: &mut [f64])
where
    F: Fn(&[f64]) -> f64,
{
    // Optimal central-difference step is ~ cbrt(machine epsilon) times the variable scale.
    let base = f64::EPSILON.cbrt();
    let mut probe = x.to_vec();
    for i in 0..x.len() {
        let h = base * x[i].abs().max(1.0);
        probe[i] = x[i] + h;
        let up = f(&probe);
        probe[i] = x[i] - h;
        let down = f(&probe);
        probe[i] = x[i];
        let g = (up - down) / (2.0 * h);
        grad[i] = if g.is_finite() { g } else { 0.0 };
    }
}

/// Outcome of a minimization: the best point seen, never worse than the start.
#[derive(Debug, Clone)]
pub struct Minimum {
    pub x: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    pub converged: bool,
}

#[cfg(test)]
mod tests {
    use super::{Budget, central_difference};
    use std::time::Duration;

    #[test]
    fn central_difference_matches_analytic_gradient() {
        let f = |x: &[f64]| x[0].powi(2) * x[1] + (3.0 * x[1]).sin();
        let x = [1.5, -0.25];
        let mut g = [0.0; 2];
        central_difference(f, &x, &mut g);
        assert!((g[0] - 2.0 * 1.5 * -0.25).abs() < 1e-8);
        assert!((g[1] - (1.5f64.powi(2) + 3.0 * (3.0 * -0.25f64).cos())).abs() < 1e-8);
    }

    #[test]
    fn zero_time_budget_expires_immediately() {
        let b = Budget::new(10, 1e-9, Some(Duration::ZERO));
        assert!(b.expired());
        assert!(!Budget::new(10, 1e-9, None).expired());
    }
}
