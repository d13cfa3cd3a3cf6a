//! Nelder–Mead simplex search in the plane, confined to a feasible set.

use crate::geometry::Point;

const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;
const CLAMP_BISECTIONS: usize = 32;

/// Pull `trial` back along the segment from `anchor` until it is feasible.
///
/// `anchor` must be feasible. Returns `trial` untouched when it already is; otherwise the
/// farthest feasible point found by bisection (at worst `anchor` itself).
pub fn clamp_to_feasible<F>(anchor: Point, trial: Point, feasible: &F) -> Point
where
    F: Fn(Point) -> bool,
{
    if feasible(trial) {
        return trial;
    }
    let lerp = |t: f64| {
        Point::new(
            anchor.x + t * (trial.x - anchor.x),
            anchor.y + t * (trial.y - anchor.y),
        )
    };
    let mut lo = 0.0;
    let mut hi = 1.0;
    for _ in 0..CLAMP_BISECTIONS {
        let mid = 0.5 * (lo + hi);
        if feasible(lerp(mid)) {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    lerp(lo)
}

#[derive(Debug, Clone, Copy)]
pub struct SimplexResult {
    pub point: Point,
    pub value: f64,
    pub iterations: usize,
}

/// Minimize `f` starting from the triangle `start`, never evaluating an infeasible point.
///
/// Every vertex of `start` must satisfy `feasible`. Each reflection, expansion, contraction and
/// shrink step is clamped into the feasible set with [`clamp_to_feasible`], anchored at the
/// current best vertex. Stops after `max_iterations` or once the simplex diameter falls below
/// `tolerance`.
pub fn minimize_clamped<F, C>(
    f: F,
    feasible: C,
    start: [Point; 3],
    max_iterations: usize,
    tolerance: f64,
) -> SimplexResult
where
    F: Fn(Point) -> f64,
    C: Fn(Point) -> bool,
{
    let mut simplex: [(Point, f64); 3] = start.map(|p| (p, f(p)));
    let mut iterations = 0;

    while iterations < max_iterations {
        simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
        let (best, f_best) = simplex[0];
        let (second, f_second) = simplex[1];
        let (worst, f_worst) = simplex[2];

        let diameter = best.distance(&second).max(best.distance(&worst));
        if diameter < tolerance {
            break;
        }
        iterations += 1;

        let centroid = Point::new((best.x + second.x) / 2.0, (best.y + second.y) / 2.0);
        let toward = |from: Point, to: Point, t: f64| {
            clamp_to_feasible(
                best,
                Point::new(from.x + t * (to.x - from.x), from.y + t * (to.y - from.y)),
                &feasible,
            )
        };

        let reflected = toward(centroid, worst, -REFLECT);
        let f_reflected = f(reflected);

        if f_reflected < f_best {
            let expanded = toward(centroid, reflected, EXPAND);
            let f_expanded = f(expanded);
            simplex[2] = if f_expanded < f_reflected {
                (expanded, f_expanded)
            } else {
                (reflected, f_reflected)
            };
            continue;
        }

        if f_reflected < f_second {
            simplex[2] = (reflected, f_reflected);
            continue;
        }

        let contracted = if f_reflected < f_worst {
            toward(centroid, reflected, CONTRACT)
        } else {
            toward(centroid, worst, CONTRACT)
        };
        let f_contracted = f(contracted);
        if f_contracted < f_reflected.min(f_worst) {
            simplex[2] = (contracted, f_contracted);
            continue;
        }

        for vertex in simplex.iter_mut().skip(1) {
            let shrunk = toward(best, vertex.0, SHRINK);
            *vertex = (shrunk, f(shrunk));
        }
    }

    simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
    SimplexResult {
        point: simplex[0].0,
        value: simplex[0].1,
        iterations,
    }
}
