//! Label anchors: one interior point per region, pushed as far from every boundary as the
//! region allows.

use std::f64::consts::{PI, TAU};

use super::FitOptions;
use crate::combination::Combination;
use crate::geometry::{Ellipse, Point};
use crate::optim::simplex::{clamp_to_feasible, minimize_clamped};

/// Golden-angle increment, `pi * (3 - sqrt 5)`.
const GOLDEN_ANGLE: f64 = PI * (3.0 - 2.236_067_977_499_79);

/// `n` points spread evenly over `shape` (Vogel's spiral, mapped onto the ellipse frame).
pub fn vogel_seeds(shape: &Ellipse, n: usize) -> Vec<Point> {
    (0..n)
        .map(|k| {
            let r = (k as f64 / n as f64).sqrt();
            let (s, c) = (k as f64 * GOLDEN_ANGLE).sin_cos();
            shape.from_local(shape.a * r * c, shape.b * r * s)
        })
        .collect()
}

/// Strict membership in the region of `combination`: inside every member and outside the rest,
/// with `tol` of slack on each level function.
pub fn in_region(shapes: &[Ellipse], combination: Combination, p: Point, tol: f64) -> bool {
    shapes.iter().enumerate().all(|(i, s)| {
        if combination.contains(i) {
            s.level(p) < -tol
        } else {
            s.level(p) > tol
        }
    })
}

/// Relative offsets off each boundary tried when no interior seed lands in the region.
const BOUNDARY_OFFSETS: [f64; 4] = [1e-2, 1e-3, 1e-4, 1e-5];

/// Points just inside and just outside every boundary, `n` per ring.
///
/// Every region is bounded by arcs of its members (region on the inside) and of the other
/// shapes (region on the outside), so a thin sliver always has one of these near its widest
/// part.
pub fn boundary_seeds(shapes: &[Ellipse], n: usize) -> impl Iterator<Item = Point> + '_ {
    let n = n.max(1);
    shapes
        .iter()
        .filter(|s| !s.is_empty())
        .flat_map(move |s| {
            BOUNDARY_OFFSETS.iter().flat_map(move |&f| {
                (0..n).flat_map(move |k| {
                    let (sin, cos) = (k as f64 * TAU / n as f64).sin_cos();
                    [1.0 - f, 1.0 + f]
                        .map(|scale| s.from_local(s.a * scale * cos, s.b * scale * sin))
                })
            })
        })
}

/// A point strictly inside the region of `combination`, or `None` when none can be found.
///
/// Seeds are scanned over the smallest member shape, then on both sides of every boundary when
/// the region is too thin for the spiral to hit. The first seed inside the region starts a
/// simplex search that maximizes the distance to the nearest boundary. Every simplex step is
/// clamped back into the region, so the returned point is always a member.
pub fn locate_point(
    shapes: &[Ellipse],
    combination: Combination,
    opts: &FitOptions,
) -> Option<Point> {
    if combination.is_empty() || combination.indices().any(|i| i >= shapes.len()) {
        return None;
    }
    let smallest = combination
        .indices()
        .map(|i| &shapes[i])
        .min_by(|a, b| a.area().total_cmp(&b.area()))?;
    if smallest.is_empty() {
        return None;
    }

    let tol = opts.geometry_tolerance;
    let feasible = |p: Point| in_region(shapes, combination, p, tol);
    let seeds = opts.label_seeds.max(1);
    let start = vogel_seeds(smallest, seeds)
        .into_iter()
        .find(|&p| feasible(p))
        .or_else(|| boundary_seeds(shapes, seeds.max(64)).find(|&p| feasible(p)))?;

    let clearance = |p: Point| {
        shapes
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| s.boundary_distance(p))
            .fold(f64::INFINITY, f64::min)
    };

    // Keep the first triangle inside the clearance of a sliver seed.
    let step = match clearance(start) {
        c if c > 0.0 => (0.01 * smallest.a.min(smallest.b)).min(c),
        _ => 0.01 * smallest.a.min(smallest.b),
    };
    let simplex = [
        start,
        clamp_to_feasible(start, Point::new(start.x + step, start.y), &feasible),
        clamp_to_feasible(start, Point::new(start.x, start.y + step), &feasible),
    ];
    let found = minimize_clamped(
        |p| -clearance(p),
        feasible,
        simplex,
        opts.label_max_iterations,
        1e-7 * step,
    );
    tracing::trace!(
        combination = combination.bits(),
        clearance = -found.value,
        iterations = found.iterations,
        "label: located"
    );

    Some(found.point).filter(|&p| in_region(shapes, combination, p, tol))
}
