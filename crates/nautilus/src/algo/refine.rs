//! Area refinement: move (and for ellipses reshape) every shape to minimize the squared error
//! between fitted and target disjoint areas.

use super::{FitOptions, ShapeKind};
use crate::combination::{Combination, Targets};
use crate::error::{Error, Result};
use crate::geometry::Ellipse;
use crate::geometry::area::Overlaps;
use crate::optim::{Budget, Objective, bfgs};

/// Outcome of [`refine`]. Tables are indexed by combination bitmask; entry 0 is unused.
#[derive(Debug, Clone)]
pub struct Refined {
    pub shapes: Vec<Ellipse>,
    pub fitted: Vec<f64>,
    /// `target - fitted` per combination.
    pub residuals: Vec<f64>,
    /// Sum of squared residuals.
    pub loss: f64,
    pub iterations: usize,
    pub converged: bool,
}

impl Refined {
    pub fn fitted(&self, c: Combination) -> f64 {
        self.fitted.get(c.bits() as usize).copied().unwrap_or(0.0)
    }

    pub fn residual(&self, c: Combination) -> f64 {
        self.residuals.get(c.bits() as usize).copied().unwrap_or(0.0)
    }
}

/// Squared disjoint-area error as a function of the free shape parameters.
///
/// Per active set the parameters are `[h, k]` for circles (radius held at the template's) and
/// `[h, k, ln a, ln b, phi]` for ellipses, which keeps both semi-axes positive.
struct AreaLoss<'a> {
    template: Vec<Ellipse>,
    active: Vec<usize>,
    kind: ShapeKind,
    targets: &'a [f64],
    tol: f64,
}

impl AreaLoss<'_> {
    fn encode(&self) -> Vec<f64> {
        let mut x = Vec::with_capacity(self.active.len() * self.kind.parameters());
        for &i in &self.active {
            let e = &self.template[i];
            match self.kind {
                ShapeKind::Circle => x.extend([e.h, e.k]),
                ShapeKind::Ellipse => x.extend([e.h, e.k, e.a.ln(), e.b.ln(), e.phi]),
            }
        }
        x
    }

    fn decode(&self, x: &[f64]) -> Vec<Ellipse> {
        let mut shapes = self.template.clone();
        let stride = self.kind.parameters();
        for (slot, &i) in self.active.iter().enumerate() {
            let p = &x[slot * stride..(slot + 1) * stride];
            let s = &mut shapes[i];
            s.h = p[0];
            s.k = p[1];
            if self.kind == ShapeKind::Ellipse {
                s.a = p[2].exp();
                s.b = p[3].exp();
                s.phi = p[4];
            }
        }
        shapes
    }

    fn fitted_table(&self, shapes: &[Ellipse]) -> Vec<f64> {
        Overlaps::new(shapes, self.tol).disjoint_table()
    }
}

impl Objective for AreaLoss<'_> {
    fn value(&self, x: &[f64]) -> f64 {
        let shapes = self.decode(x);
        if shapes.iter().any(|s| !(s.h.is_finite() && s.k.is_finite() && s.area().is_finite())) {
            return f64::INFINITY;
        }
        sum_squared_error(&self.fitted_table(&shapes), self.targets)
    }
}

fn sum_squared_error(fitted: &[f64], targets: &[f64]) -> f64 {
    fitted
        .iter()
        .zip(targets)
        .skip(1)
        .map(|(f, t)| (f - t).powi(2))
        .sum()
}

/// Refine `initial` toward `targets`.
///
/// Circles keep their radii and only move. Ellipses are fitted in a second stage seeded with
/// the circle result, and that stage only replaces the circles when it lowers the loss. Sets
/// with zero total area become empty shapes and stay out of the optimization. Non-convergence
/// is not an error: the best parameters seen are returned with their residuals.
pub fn refine(initial: &[Ellipse], targets: &Targets, opts: &FitOptions) -> Result<Refined> {
    let n = targets.set_count();
    if initial.len() != n {
        return Err(Error::ShapeCountMismatch {
            expected: n,
            got: initial.len(),
        });
    }

    let mut template = initial.to_vec();
    let mut active = Vec::with_capacity(n);
    for (i, shape) in template.iter_mut().enumerate() {
        if targets.set_area(i) > 0.0 && !shape.is_empty() {
            active.push(i);
        } else {
            *shape = Ellipse::circle(shape.h, shape.k, 0.0);
        }
    }

    let table = targets.disjoint_table();
    let mut stage = AreaLoss {
        template,
        active,
        kind: ShapeKind::Circle,
        targets: table,
        tol: opts.geometry_tolerance,
    };

    let budget = Budget::new(opts.refine_max_iterations, opts.tolerance, opts.time_budget);
    let circles = bfgs::minimize(&stage, &stage.encode(), &budget);
    let mut shapes = stage.decode(&circles.x);
    let mut loss = circles.value;
    let mut iterations = circles.iterations;
    let mut converged = circles.converged;
    tracing::debug!(loss, iterations, converged, "refine: circle stage");

    if opts.shape == ShapeKind::Ellipse {
        stage.template = shapes.clone();
        stage.kind = ShapeKind::Ellipse;
        let budget = Budget::new(opts.refine_max_iterations, opts.tolerance, opts.time_budget);
        let ellipses = bfgs::minimize(&stage, &stage.encode(), &budget);
        tracing::debug!(
            loss = ellipses.value,
            iterations = ellipses.iterations,
            converged = ellipses.converged,
            "refine: ellipse stage"
        );
        iterations += ellipses.iterations;
        if ellipses.value < loss {
            shapes = stage.decode(&ellipses.x);
            loss = ellipses.value;
            converged = ellipses.converged;
        }
    }

    let fitted = stage.fitted_table(&shapes);
    let residuals: Vec<f64> = table
        .iter()
        .zip(&fitted)
        .enumerate()
        .map(|(i, (t, f))| if i == 0 { 0.0 } else { t - f })
        .collect();

    Ok(Refined {
        shapes,
        fitted,
        residuals,
        loss,
        iterations,
        converged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combination::FitInput;
    use std::f64::consts::PI;

    #[test]
    fn shape_count_must_match_set_count() {
        let t = FitInput::new(["A", "B"])
            .with_area(&["A"], 1.0)
            .validate()
            .expect("valid");
        let err = refine(&[Ellipse::circle(0.0, 0.0, 1.0)], &t, &FitOptions::default());
        assert!(matches!(
            err,
            Err(Error::ShapeCountMismatch {
                expected: 2,
                got: 1
            })
        ));
    }

    #[test]
    fn two_circles_reach_the_target_overlap() {
        let t = FitInput::new(["A", "B"])
            .with_area(&["A"], 2.0)
            .with_area(&["B"], 2.0)
            .with_area(&["A", "B"], 1.0)
            .validate()
            .expect("valid");
        let r = (3.0 / PI).sqrt();
        let start = [Ellipse::circle(0.0, 0.0, r), Ellipse::circle(1.8, 0.1, r)];
        let out = refine(&start, &t, &FitOptions::default()).expect("refined");
        assert!(out.loss < 1e-6, "loss {}", out.loss);
        assert!((out.fitted(Combination::from_indices([0, 1])) - 1.0).abs() < 1e-3);
        assert!((out.shapes[0].a - r).abs() < 1e-12, "circle radii stay fixed");
    }

    #[test]
    fn zero_area_set_becomes_an_empty_shape() {
        let t = FitInput::new(["A", "B"])
            .with_area(&["A"], 1.0)
            .with_area(&["B"], 0.0)
            .validate()
            .expect("valid");
        let start = [
            Ellipse::circle(0.0, 0.0, (1.0 / PI).sqrt()),
            Ellipse::circle(0.3, 0.0, 1.0),
        ];
        let out = refine(&start, &t, &FitOptions::default()).expect("refined");
        assert!(out.shapes[1].is_empty());
        assert!(out.loss < 1e-12);
    }

    #[test]
    fn residuals_are_target_minus_fitted() {
        let t = FitInput::new(["A", "B"])
            .with_area(&["A"], 1.0)
            .with_area(&["B"], 1.0)
            .with_area(&["A", "B"], 0.5)
            .validate()
            .expect("valid");
        let r = (1.5 / PI).sqrt();
        let start = [Ellipse::circle(0.0, 0.0, r), Ellipse::circle(0.9, 0.0, r)];
        let opts = FitOptions {
            refine_max_iterations: 0,
            ..FitOptions::default()
        };
        let out = refine(&start, &t, &opts).expect("refined");
        for c in Combination::all(2) {
            let want = t.disjoint(c) - out.fitted(c);
            assert!((out.residual(c) - want).abs() < 1e-15);
        }
        let ssq: f64 = out.residuals.iter().map(|r| r * r).sum();
        assert!((ssq - out.loss).abs() < 1e-12);
    }
}
