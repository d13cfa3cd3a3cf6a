//! Plane primitives shared by every phase of the fit.

pub mod area;
pub mod conic;

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

pub use conic::{Conic, intersect};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    pub fn expand(&self, pad: f64) -> Bounds {
        Bounds {
            min_x: self.min_x - pad,
            min_y: self.min_y - pad,
            max_x: self.max_x + pad,
            max_y: self.max_y + pad,
        }
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Bounds {
        Bounds {
            min_x: self.min_x + dx,
            min_y: self.min_y + dy,
            max_x: self.max_x + dx,
            max_y: self.max_y + dy,
        }
    }

    /// True when the interiors overlap; touching edges do not count.
    pub fn overlaps(&self, other: &Bounds) -> bool {
        self.min_x < other.max_x
            && other.min_x < self.max_x
            && self.min_y < other.max_y
            && other.min_y < self.max_y
    }
}

/// One set's shape: an ellipse centred at `(h, k)` with semi-axes `a`, `b` and rotation `phi`
/// (radians, counter-clockwise from +x). Circles are the `a == b` case.
///
/// A shape with a non-positive semi-axis is *empty*: it has no area, no boundary crossings and
/// contains nothing. Sets with zero total area are represented this way.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ellipse {
    pub h: f64,
    pub k: f64,
    pub a: f64,
    pub b: f64,
    pub phi: f64,
}

impl Ellipse {
    pub fn new(h: f64, k: f64, a: f64, b: f64, phi: f64) -> Self {
        Self { h, k, a, b, phi }
    }

    pub fn circle(h: f64, k: f64, r: f64) -> Self {
        Self::new(h, k, r, r, 0.0)
    }

    pub fn center(&self) -> Point {
        Point::new(self.h, self.k)
    }

    pub fn is_empty(&self) -> bool {
        !(self.a > 0.0 && self.b > 0.0 && self.a.is_finite() && self.b.is_finite())
    }

    pub fn area(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            PI * self.a * self.b
        }
    }

    /// Matrix form, recomputed from the current parameters on every call.
    pub fn conic(&self) -> Conic {
        Conic::from_ellipse(self)
    }

    /// Coordinates of `p` in the ellipse's own frame (centred, axis-aligned).
    pub fn to_local(&self, p: Point) -> (f64, f64) {
        let (s, c) = self.phi.sin_cos();
        let dx = p.x - self.h;
        let dy = p.y - self.k;
        (c * dx + s * dy, -s * dx + c * dy)
    }

    pub fn from_local(&self, u: f64, v: f64) -> Point {
        let (s, c) = self.phi.sin_cos();
        Point::new(self.h + c * u - s * v, self.k + s * u + c * v)
    }

    /// `(u/a)^2 + (v/b)^2 - 1`: negative inside, zero on the boundary, positive outside.
    pub fn level(&self, p: Point) -> f64 {
        if self.is_empty() {
            return f64::INFINITY;
        }
        let (u, v) = self.to_local(p);
        (u / self.a).powi(2) + (v / self.b).powi(2) - 1.0
    }

    /// Inside or on the boundary, within `tol` of the level function.
    pub fn contains(&self, p: Point, tol: f64) -> bool {
        self.level(p) <= tol
    }

    /// Boundary point at eccentric angle `t`.
    pub fn point_at(&self, t: f64) -> Point {
        let (s, c) = t.sin_cos();
        self.from_local(self.a * c, self.b * s)
    }

    /// Eccentric angle of (the projection of) `p` onto the boundary, in `(-pi, pi]`.
    pub fn eccentric_angle(&self, p: Point) -> f64 {
        let (u, v) = self.to_local(p);
        (v / self.b).atan2(u / self.a)
    }

    pub fn bounds(&self) -> Bounds {
        let (s, c) = self.phi.sin_cos();
        let half_w = ((self.a * c).powi(2) + (self.b * s).powi(2)).sqrt();
        let half_h = ((self.a * s).powi(2) + (self.b * c).powi(2)).sqrt();
        Bounds {
            min_x: self.h - half_w,
            min_y: self.k - half_h,
            max_x: self.h + half_w,
            max_y: self.k + half_h,
        }
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.h += dx;
        self.k += dy;
    }

    /// Euclidean distance from `p` to the boundary (inside or outside).
    pub fn boundary_distance(&self, p: Point) -> f64 {
        if self.is_empty() {
            return p.distance(&self.center());
        }
        let (u, v) = self.to_local(p);
        // The solver wants the major axis first; swap frames for tall ellipses.
        if self.a >= self.b {
            distance_to_axis_aligned(self.a, self.b, u.abs(), v.abs())
        } else {
            distance_to_axis_aligned(self.b, self.a, v.abs(), u.abs())
        }
    }
}

/// Distance from `(y0, y1)` (first quadrant) to the ellipse `(x/e0)^2 + (y/e1)^2 = 1`, `e0 >= e1`.
///
/// Bisection on the Lagrange multiplier of the closest-point problem (Eberly, "Distance from a
/// Point to an Ellipse").
fn distance_to_axis_aligned(e0: f64, e1: f64, y0: f64, y1: f64) -> f64 {
    if y1 > 0.0 {
        if y0 > 0.0 {
            let z0 = y0 / e0;
            let z1 = y1 / e1;
            let g = z0 * z0 + z1 * z1 - 1.0;
            if g == 0.0 {
                return 0.0;
            }
            let r0 = (e0 / e1).powi(2);
            let sbar = closest_point_root(r0, z0, z1, g);
            let x0 = r0 * y0 / (sbar + r0);
            let x1 = y1 / (sbar + 1.0);
            (x0 - y0).hypot(x1 - y1)
        } else {
            (y1 - e1).abs()
        }
    } else {
        let numer0 = e0 * y0;
        let denom0 = e0 * e0 - e1 * e1;
        if numer0 < denom0 {
            let xde0 = numer0 / denom0;
            let x0 = e0 * xde0;
            let x1 = e1 * (1.0 - xde0 * xde0).max(0.0).sqrt();
            (x0 - y0).hypot(x1)
        } else {
            (y0 - e0).abs()
        }
    }
}

fn closest_point_root(r0: f64, z0: f64, z1: f64, g: f64) -> f64 {
    let n0 = r0 * z0;
    let mut s0 = z1 - 1.0;
    let mut s1 = if g < 0.0 { 0.0 } else { n0.hypot(z1) - 1.0 };
    let mut s = 0.0;
    for _ in 0..200 {
        s = (s0 + s1) / 2.0;
        if s == s0 || s == s1 {
            break;
        }
        let ratio0 = n0 / (s + r0);
        let ratio1 = z1 / (s + 1.0);
        let g = ratio0 * ratio0 + ratio1 * ratio1 - 1.0;
        if g > 0.0 {
            s0 = s;
        } else if g < 0.0 {
            s1 = s;
        } else {
            break;
        }
    }
    s
}

/// Signed (shoelace) area of a closed polygon; positive for counter-clockwise order.
pub fn polygon_area(points: &[Point]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut acc = 0.0;
    for i in 0..n {
        let p = points[i];
        let q = points[(i + 1) % n];
        acc += p.x * q.y - q.x * p.y;
    }
    acc / 2.0
}
