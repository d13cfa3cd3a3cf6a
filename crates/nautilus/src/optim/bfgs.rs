use nalgebra::{DMatrix, DVector};

use super::{Budget, Minimum, Objective};

const ARMIJO_C1: f64 = 1e-4;
const MAX_BACKTRACKS: usize = 60;

/// Quasi-Newton (BFGS) minimization with a backtracking Armijo line search.
///
/// The objective may be only piecewise smooth; whenever the quasi-Newton direction stops being
/// a descent direction the inverse-Hessian estimate is reset to the identity. The run stops on
/// convergence, on budget exhaustion, or when no step along steepest descent improves the
/// value, and always reports the best point it evaluated.
pub fn minimize<O: Objective + ?Sized>(objective: &O, x0: &[f64], budget: &Budget) -> Minimum {
    let n = x0.len();
    let mut x = DVector::from_column_slice(x0);
    let mut fx = objective.value(x.as_slice());
    if n == 0 || !fx.is_finite() {
        return Minimum {
            x: x0.to_vec(),
            value: fx,
            iterations: 0,
            converged: n == 0,
        };
    }

    let mut g = DVector::<f64>::zeros(n);
    objective.gradient(x.as_slice(), g.as_mut_slice());

    let mut h_inv = DMatrix::<f64>::identity(n, n);
    let mut h_is_identity = true;
    let mut iterations = 0;
    let mut converged = false;

    while iterations < budget.max_iterations {
        if budget.expired() {
            tracing::debug!(iterations, value = fx, "bfgs: time budget exhausted");
            break;
        }
        iterations += 1;

        let g_norm = g.norm();
        if g_norm == 0.0 || !g_norm.is_finite() {
            converged = g_norm == 0.0;
            break;
        }

        let mut p = -(&h_inv * &g);
        let mut slope = p.dot(&g);
        if !(slope < 0.0) || !slope.is_finite() {
            h_inv.fill_with_identity();
            h_is_identity = true;
            p = -g.clone();
            slope = p.dot(&g);
        }

        // The very first steepest-descent step has no curvature information: bound it by the
        // scale of the current point so the line search starts somewhere sensible.
        if h_is_identity {
            let max_step = x.norm().max(1.0);
            let p_norm = p.norm();
            if p_norm > max_step {
                p *= max_step / p_norm;
                slope = p.dot(&g);
            }
        }

        let mut step = 1.0;
        let mut accepted = None;
        for _ in 0..MAX_BACKTRACKS {
            let candidate = &x + &p * step;
            let fc = objective.value(candidate.as_slice());
            if fc.is_finite() && fc <= fx + ARMIJO_C1 * step * slope {
                accepted = Some((candidate, fc));
                break;
            }
            step *= 0.5;
        }

        let Some((x_new, f_new)) = accepted else {
            if h_is_identity {
                // Steepest descent cannot make progress either: a (possibly non-smooth) minimum.
                converged = true;
                break;
            }
            h_inv.fill_with_identity();
            h_is_identity = true;
            continue;
        };

        let mut g_new = DVector::<f64>::zeros(n);
        objective.gradient(x_new.as_slice(), g_new.as_mut_slice());

        let s = &x_new - &x;
        let y = &g_new - &g;
        let sy = s.dot(&y);
        if sy > 1e-12 * s.norm() * y.norm() {
            if h_is_identity {
                // Nocedal & Wright (6.20): rescale the initial estimate before the first update.
                h_inv *= sy / y.dot(&y);
            }
            let rho = 1.0 / sy;
            let hy = &h_inv * &y;
            let yhy = y.dot(&hy);
            // H+ = H - rho (H y s^T + s y^T H) + (rho^2 y^T H y + rho) s s^T
            h_inv -= (&hy * s.transpose() + &s * hy.transpose()) * rho;
            h_inv += (&s * s.transpose()) * (rho * rho * yhy + rho);
            h_is_identity = false;
        }

        let decrease = fx - f_new;
        tracing::trace!(iterations, value = f_new, step, "bfgs: step accepted");
        x = x_new;
        fx = f_new;
        g = g_new;

        if decrease <= budget.tolerance * (fx.abs() + budget.tolerance) {
            converged = true;
            break;
        }
    }

    Minimum {
        x: x.as_slice().to_vec(),
        value: fx,
        iterations,
        converged,
    }
}
