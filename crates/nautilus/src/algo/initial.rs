//! Initial placement of circle centres.
//!
//! Every pair of sets is classified from the targets alone. Overlapping pairs get a target
//! centre distance at which two circles of the set areas overlap by exactly the pair's target;
//! the centres are then placed by minimizing `sum (d^2 - D^2)^2` over those pairs. Disjoint and
//! nested pairs only contribute while their constraint is violated (too close, or too far
//! apart), so they never pull the layout toward an arbitrary distance.

use std::f64::consts::PI;

use super::FitOptions;
use crate::combination::Targets;
use crate::geometry::area::circle_overlap;
use crate::geometry::{Ellipse, Point};
use crate::optim::root::brent;
use crate::optim::{Budget, Objective, bfgs};
use crate::rng::XorShift64Star;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairRelation {
    /// The pair shares no area.
    Disjoint,
    /// The smaller set lies entirely inside the larger.
    Nested,
    Overlapping,
}

#[derive(Debug, Clone, Copy)]
pub struct PairTarget {
    pub i: usize,
    pub j: usize,
    pub relation: PairRelation,
    /// Target centre-to-centre distance.
    pub distance: f64,
}

/// Radii and pairwise distance targets for the initial layout.
#[derive(Debug, Clone)]
pub struct InitialProblem {
    pub radii: Vec<f64>,
    pub pairs: Vec<PairTarget>,
}

impl InitialProblem {
    pub fn from_targets(targets: &Targets) -> Self {
        let n = targets.set_count();
        let radii: Vec<f64> = (0..n)
            .map(|i| (targets.set_area(i) / PI).sqrt())
            .collect();

        let mut pairs = Vec::new();
        for i in 0..n {
            for j in (i + 1)..n {
                // Empty sets take no part in placement.
                if radii[i] <= 0.0 || radii[j] <= 0.0 {
                    continue;
                }
                let overlap = targets.pair_overlap(i, j);
                let smaller = targets.set_area(i).min(targets.set_area(j));
                let relation = classify(overlap, smaller);
                pairs.push(PairTarget {
                    i,
                    j,
                    relation,
                    distance: target_distance(radii[i], radii[j], overlap),
                });
            }
        }
        Self { radii, pairs }
    }

    /// Loss of a flat `[x0, y0, x1, y1, ...]` placement.
    pub fn loss(&self, centers: &[Point]) -> f64 {
        self.value(&flatten(centers))
    }
}

fn classify(overlap: f64, smaller_area: f64) -> PairRelation {
    if overlap <= 0.0 {
        PairRelation::Disjoint
    } else if overlap >= smaller_area * (1.0 - 1e-12) {
        PairRelation::Nested
    } else {
        PairRelation::Overlapping
    }
}

/// Centre distance at which circles of radii `r1`, `r2` overlap by `overlap`.
///
/// Saturates at `r1 + r2` (no overlap) and `|r1 - r2|` (full containment).
pub fn target_distance(r1: f64, r2: f64, overlap: f64) -> f64 {
    let lo = (r1 - r2).abs();
    let hi = r1 + r2;
    if overlap <= 0.0 {
        return hi;
    }
    if overlap >= PI * r1.min(r2).powi(2) {
        return lo;
    }
    let tol = 1e-12 * hi.max(1.0);
    brent(|d| circle_overlap(r1, r2, d) - overlap, lo, hi, tol, 200).unwrap_or((lo + hi) / 2.0)
}

impl Objective for InitialProblem {
    fn value(&self, x: &[f64]) -> f64 {
        let mut loss = 0.0;
        for p in &self.pairs {
            let (dx, dy) = (x[2 * p.i] - x[2 * p.j], x[2 * p.i + 1] - x[2 * p.j + 1]);
            let d2 = dx * dx + dy * dy;
            if satisfied(p, d2) {
                continue;
            }
            loss += (d2 - p.distance * p.distance).powi(2);
        }
        loss
    }

    fn gradient(&self, x: &[f64], grad: &mut [f64]) {
        grad.fill(0.0);
        for p in &self.pairs {
            let (dx, dy) = (x[2 * p.i] - x[2 * p.j], x[2 * p.i + 1] - x[2 * p.j + 1]);
            let d2 = dx * dx + dy * dy;
            if satisfied(p, d2) {
                continue;
            }
            let s = 4.0 * (d2 - p.distance * p.distance);
            grad[2 * p.i] += s * dx;
            grad[2 * p.i + 1] += s * dy;
            grad[2 * p.j] -= s * dx;
            grad[2 * p.j + 1] -= s * dy;
        }
    }
}

fn satisfied(p: &PairTarget, d2: f64) -> bool {
    let target = p.distance * p.distance;
    match p.relation {
        PairRelation::Disjoint => d2 >= target,
        PairRelation::Nested => d2 <= target,
        PairRelation::Overlapping => false,
    }
}

#[derive(Debug, Clone)]
pub struct InitialLayout {
    pub centers: Vec<Point>,
    pub radii: Vec<f64>,
    pub loss: f64,
}

impl InitialLayout {
    pub fn circles(&self) -> Vec<Ellipse> {
        self.centers
            .iter()
            .zip(&self.radii)
            .map(|(c, &r)| Ellipse::circle(c.x, c.y, r))
            .collect()
    }
}

/// Best of `opts.initial_restarts` seeded random starts.
pub fn initial_layout(
    problem: &InitialProblem,
    opts: &FitOptions,
    rng: &mut XorShift64Star,
) -> InitialLayout {
    let n = problem.radii.len();
    let spread = problem
        .radii
        .iter()
        .map(|r| PI * r * r)
        .sum::<f64>()
        .sqrt()
        .max(f64::MIN_POSITIVE);

    let mut best: Option<InitialLayout> = None;
    for restart in 0..opts.initial_restarts.max(1) {
        let start: Vec<Point> = (0..n)
            .map(|_| {
                Point::new(
                    rng.next_f64_range(0.0, spread),
                    rng.next_f64_range(0.0, spread),
                )
            })
            .collect();
        let candidate = initial_layout_from(problem, &start, opts);
        tracing::trace!(restart, loss = candidate.loss, "initial layout restart");
        let better = best.as_ref().is_none_or(|b| candidate.loss < b.loss);
        if better {
            best = Some(candidate);
        }
        if best.as_ref().is_some_and(|b| b.loss <= f64::EPSILON) {
            break;
        }
    }

    // `initial_restarts.max(1)` guarantees at least one run.
    best.unwrap_or_else(|| InitialLayout {
        centers: vec![Point::new(0.0, 0.0); n],
        radii: problem.radii.clone(),
        loss: 0.0,
    })
}

/// One run from caller-supplied centres.
pub fn initial_layout_from(
    problem: &InitialProblem,
    start: &[Point],
    opts: &FitOptions,
) -> InitialLayout {
    let budget = Budget::new(opts.initial_max_iterations, opts.tolerance, opts.time_budget);
    let min = bfgs::minimize(problem, &flatten(start), &budget);
    let centers = min
        .x
        .chunks_exact(2)
        .map(|c| Point::new(c[0], c[1]))
        .collect();
    InitialLayout {
        centers,
        radii: problem.radii.clone(),
        loss: min.value,
    }
}

fn flatten(points: &[Point]) -> Vec<f64> {
    points.iter().flat_map(|p| [p.x, p.y]).collect()
}
