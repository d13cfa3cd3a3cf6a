//! Real roots of low-degree polynomials.

use std::f64::consts::PI;

/// Real roots of `a x^2 + b x + c = 0`, ascending. A double root is reported once.
///
/// `slack` widens the acceptance of a slightly negative discriminant (relative to `b^2`), which
/// is how tangencies survive rounding.
pub fn solve_quadratic(a: f64, b: f64, c: f64, slack: f64) -> Vec<f64> {
    let scale = a.abs().max(b.abs()).max(c.abs());
    if scale == 0.0 || !scale.is_finite() {
        return Vec::new();
    }
    let (a, b, c) = (a / scale, b / scale, c / scale);

    if a.abs() < 1e-14 {
        if b.abs() < 1e-14 {
            return Vec::new();
        }
        return vec![-c / b];
    }

    let mut disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        if disc >= -slack * (b * b).max(4.0 * (a * c).abs()) {
            disc = 0.0;
        } else {
            return Vec::new();
        }
    }

    if disc == 0.0 {
        return vec![-b / (2.0 * a)];
    }

    // Citardauq form avoids cancellation when b^2 >> 4ac.
    let q = -0.5 * (b + b.signum() * disc.sqrt());
    let (mut r0, mut r1) = if q == 0.0 {
        let r = (-c / a).sqrt();
        (-r, r)
    } else {
        (q / a, c / q)
    };
    if r0 > r1 {
        std::mem::swap(&mut r0, &mut r1);
    }
    vec![r0, r1]
}

/// Real roots of `a x^3 + b x^2 + c x + d = 0`, ascending, each polished by Newton steps.
pub fn solve_cubic(a: f64, b: f64, c: f64, d: f64) -> Vec<f64> {
    let scale = a.abs().max(b.abs()).max(c.abs()).max(d.abs());
    if scale == 0.0 || !scale.is_finite() {
        return Vec::new();
    }
    if a.abs() <= 1e-12 * scale {
        return solve_quadratic(b, c, d, 0.0);
    }

    let (b, c, d) = (b / a, c / a, d / a);
    let shift = b / 3.0;
    let q = (3.0 * c - b * b) / 9.0;
    let r = (9.0 * b * c - 27.0 * d - 2.0 * b * b * b) / 54.0;
    let disc = q * q * q + r * r;

    let mut roots = if disc > 0.0 {
        let sq = disc.sqrt();
        vec![(r + sq).cbrt() + (r - sq).cbrt() - shift]
    } else if q >= 0.0 {
        // q == 0 and r == 0: triple root.
        vec![r.cbrt() - shift]
    } else {
        let m = 2.0 * (-q).sqrt();
        let theta = (r / (-q * q * q).sqrt()).clamp(-1.0, 1.0).acos();
        vec![
            m * (theta / 3.0).cos() - shift,
            m * ((theta + 2.0 * PI) / 3.0).cos() - shift,
            m * ((theta + 4.0 * PI) / 3.0).cos() - shift,
        ]
    };

    for root in &mut roots {
        *root = polish_cubic_root(*root, b, c, d);
    }
    roots.sort_by(|x, y| x.total_cmp(y));
    roots
}

fn polish_cubic_root(mut x: f64, b: f64, c: f64, d: f64) -> f64 {
    for _ in 0..4 {
        let f = ((x + b) * x + c) * x + d;
        let df = (3.0 * x + 2.0 * b) * x + c;
        if df == 0.0 || !df.is_finite() {
            break;
        }
        let next = x - f / df;
        if !next.is_finite() {
            break;
        }
        // Only keep the step if it actually reduces the residual.
        let f_next = ((next + b) * next + c) * next + d;
        if f_next.abs() >= f.abs() {
            break;
        }
        x = next;
    }
    x
}
