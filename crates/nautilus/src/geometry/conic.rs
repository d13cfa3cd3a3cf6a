//! Conic matrices and conic–conic intersection.
//!
//! Two conics meet in up to four points. Every member `λA + B` of their pencil passes through
//! those points; the members with `det(λA + B) = 0` are line pairs, so intersecting one of them
//! with `A` reduces the problem to two quadratics (Richter-Gebert, *Perspectives on Projective
//! Geometry*, §11.3–11.4).

use nalgebra::{Matrix2, Matrix3, Vector2, Vector3};

use super::{Ellipse, Point};
use crate::optim::poly::{solve_cubic, solve_quadratic};

/// Residual (relative to matrix and point scale) below which a candidate counts as lying on a
/// conic.
const ON_CONIC: f64 = 1e-6;
const NEWTON_POLISH_STEPS: usize = 3;

/// Symmetric 3x3 matrix `Q` of the curve `[x y 1] Q [x y 1]^T = 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conic {
    pub mat: Matrix3<f64>,
}

impl Conic {
    /// `A x^2 + B xy + C y^2 + D x + E y + F = 0`.
    pub fn from_quadratic_coeffs(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self {
            mat: Matrix3::new(
                a,
                b * 0.5,
                d * 0.5,
                b * 0.5,
                c,
                e * 0.5,
                d * 0.5,
                e * 0.5,
                f,
            ),
        }
    }

    /// Scaled so the level at the centre is `-1` and the boundary is `0`, matching
    /// [`Ellipse::level`].
    pub fn from_ellipse(e: &Ellipse) -> Self {
        let (s, c) = e.phi.sin_cos();
        let ia2 = 1.0 / (e.a * e.a);
        let ib2 = 1.0 / (e.b * e.b);
        let qa = c * c * ia2 + s * s * ib2;
        let qb = 2.0 * c * s * (ia2 - ib2);
        let qc = s * s * ia2 + c * c * ib2;
        let qd = -(2.0 * qa * e.h + qb * e.k);
        let qe = -(qb * e.h + 2.0 * qc * e.k);
        let qf = qa * e.h * e.h + qb * e.h * e.k + qc * e.k * e.k - 1.0;
        Self::from_quadratic_coeffs(qa, qb, qc, qd, qe, qf)
    }

    pub fn eval(&self, p: Point) -> f64 {
        let x = Vector3::new(p.x, p.y, 1.0);
        x.dot(&(self.mat * x))
    }

    fn quadratic_part(&self) -> Matrix2<f64> {
        self.mat.fixed_view::<2, 2>(0, 0).into_owned()
    }

    fn linear_part(&self) -> Vector2<f64> {
        Vector2::new(self.mat[(0, 2)], self.mat[(1, 2)])
    }

    pub fn gradient(&self, p: Point) -> Vector2<f64> {
        (self.quadratic_part() * Vector2::new(p.x, p.y) + self.linear_part()) * 2.0
    }

    /// `|x^T Q x| / (|Q| |x|^2)`: invariant under rescaling `Q`.
    fn relative_residual(&self, p: Point) -> f64 {
        let x = Vector3::new(p.x, p.y, 1.0);
        let n = self.mat.norm() * x.norm_squared();
        if n == 0.0 {
            return f64::INFINITY;
        }
        x.dot(&(self.mat * x)).abs() / n
    }

    fn normalized(&self) -> Option<Self> {
        let n = self.mat.norm();
        if !n.is_finite() || n <= 1e-300 {
            return None;
        }
        Some(Self { mat: self.mat / n })
    }
}

/// All real intersection points of two conics (0–4), tangencies reported once.
///
/// `tol` is the relative slack granted to a vanishing discriminant, i.e. how hard a near
/// tangency is pulled onto an exact one. Numerical breakdown yields an empty result.
pub fn intersect(a: &Conic, b: &Conic, tol: f64) -> Vec<Point> {
    let (Some(a), Some(b)) = (a.normalized(), b.normalized()) else {
        return Vec::new();
    };

    let (alpha, beta, gamma, delta) = pencil_cubic(&a.mat, &b.mat);
    let mut out: Vec<Point> = Vec::new();

    for lambda in solve_cubic(alpha, beta, gamma, delta) {
        let degenerate = a.mat * lambda + b.mat;
        for line in split_degenerate(&degenerate) {
            for p in intersect_line(&a, &line, tol) {
                let p = polish(&a, &b, p);
                if a.relative_residual(p) > ON_CONIC || b.relative_residual(p) > ON_CONIC {
                    continue;
                }
                push_unique(&mut out, p);
            }
        }
    }

    out
}

/// Convenience wrapper that skips empty shapes and far-apart bounding boxes.
pub fn intersect_ellipses(e1: &Ellipse, e2: &Ellipse, tol: f64) -> Vec<Point> {
    if e1.is_empty() || e2.is_empty() {
        return Vec::new();
    }
    let b1 = e1.bounds();
    let b2 = e2.bounds();
    let pad = 1e-9 * (b1.width() + b1.height() + b2.width() + b2.height());
    if !b1.expand(pad).overlaps(&b2.expand(pad)) {
        return Vec::new();
    }
    intersect(&e1.conic(), &e2.conic(), tol)
}

/// Coefficients of `det(λA + B) = αλ³ + βλ² + γλ + δ`.
fn pencil_cubic(a: &Matrix3<f64>, b: &Matrix3<f64>) -> (f64, f64, f64, f64) {
    let det = |c0: Vector3<f64>, c1: Vector3<f64>, c2: Vector3<f64>| {
        Matrix3::from_columns(&[c0, c1, c2]).determinant()
    };
    let (a0, a1, a2) = (
        a.column(0).into_owned(),
        a.column(1).into_owned(),
        a.column(2).into_owned(),
    );
    let (b0, b1, b2) = (
        b.column(0).into_owned(),
        b.column(1).into_owned(),
        b.column(2).into_owned(),
    );

    let alpha = a.determinant();
    let beta = det(a0, a1, b2) + det(a0, b1, a2) + det(b0, a1, a2);
    let gamma = det(a0, b1, b2) + det(b0, a1, b2) + det(b0, b1, a2);
    let delta = b.determinant();
    (alpha, beta, gamma, delta)
}

fn adjugate(m: &Matrix3<f64>) -> Matrix3<f64> {
    let c = |r0: usize, r1: usize, c0: usize, c1: usize| {
        m[(r0, c0)] * m[(r1, c1)] - m[(r0, c1)] * m[(r1, c0)]
    };
    // adj(M)[i][j] = cofactor(M)[j][i]
    Matrix3::new(
        c(1, 2, 1, 2),
        -c(0, 2, 1, 2),
        c(0, 1, 1, 2),
        -c(1, 2, 0, 2),
        c(0, 2, 0, 2),
        -c(0, 1, 0, 2),
        c(1, 2, 0, 1),
        -c(0, 2, 0, 1),
        c(0, 1, 0, 1),
    )
}

/// Split a rank-deficient conic into its two lines (homogeneous coefficients).
///
/// Returns nothing when the lines are complex (a real conic that is a single real point).
fn split_degenerate(c: &Matrix3<f64>) -> Vec<Vector3<f64>> {
    let scale = c.norm();
    if scale <= 1e-300 {
        return Vec::new();
    }

    // For C = g h^T + h g^T, -adj(C) = p p^T with p = g x h the lines' common point.
    let b = -adjugate(c);
    if b.amax() <= 1e-10 * scale * scale {
        // Rank one: a double line. Any dominant row is that line.
        let row = (0..3)
            .map(|i| c.row(i).transpose())
            .max_by(|x, y| x.norm_squared().total_cmp(&y.norm_squared()));
        return row.map(|r| vec![r]).unwrap_or_default();
    }

    let i = (0..3)
        .max_by(|&x, &y| b[(x, x)].abs().total_cmp(&b[(y, y)].abs()))
        .unwrap_or(0);
    let bii = b[(i, i)];
    if bii < -1e-10 * scale * scale {
        return Vec::new();
    }
    let beta = bii.max(0.0).sqrt();
    if beta == 0.0 {
        return Vec::new();
    }
    let p = b.column(i) / beta;

    // Adding the cross-product matrix of p turns C into the rank-one g h^T (up to scale).
    let mp = Matrix3::new(0.0, p[2], -p[1], -p[2], 0.0, p[0], p[1], -p[0], 0.0);
    let rank_one = c + mp;

    let mut best = (0, 0);
    for r in 0..3 {
        for col in 0..3 {
            if rank_one[(r, col)].abs() > rank_one[best].abs() {
                best = (r, col);
            }
        }
    }
    if rank_one[best] == 0.0 {
        return Vec::new();
    }

    vec![
        rank_one.row(best.0).transpose(),
        rank_one.column(best.1).into_owned(),
    ]
}

/// Real points where the line `l0 x + l1 y + l2 = 0` meets `conic`.
fn intersect_line(conic: &Conic, line: &Vector3<f64>, tol: f64) -> Vec<Point> {
    let n2 = line[0] * line[0] + line[1] * line[1];
    if n2 <= 1e-24 * line.norm_squared() {
        // The line at infinity (or numerically indistinguishable from it).
        return Vec::new();
    }
    let n = n2.sqrt();
    let origin = Vector2::new(-line[0] * line[2] / n2, -line[1] * line[2] / n2);
    let dir = Vector2::new(-line[1] / n, line[0] / n);

    let m = conic.quadratic_part();
    let lin = conic.linear_part();
    let qa = dir.dot(&(m * dir));
    let qb = 2.0 * (dir.dot(&(m * origin)) + lin.dot(&dir));
    let qc = conic.eval(Point::new(origin[0], origin[1]));

    solve_quadratic(qa, qb, qc, tol)
        .into_iter()
        .map(|s| {
            let q = origin + dir * s;
            Point::new(q[0], q[1])
        })
        .filter(|p| p.x.is_finite() && p.y.is_finite())
        .collect()
}

/// A few Newton steps on `(QA, QB) = 0`, kept only while they reduce the residual. Skipped at
/// tangencies, where the Jacobian is singular.
fn polish(a: &Conic, b: &Conic, mut p: Point) -> Point {
    let residual = |p: Point| a.relative_residual(p) + b.relative_residual(p);
    let mut r = residual(p);
    for _ in 0..NEWTON_POLISH_STEPS {
        let ga = a.gradient(p);
        let gb = b.gradient(p);
        let jac = Matrix2::new(ga[0], ga[1], gb[0], gb[1]);
        let Some(inv) = jac.try_inverse() else {
            break;
        };
        let step = inv * Vector2::new(a.eval(p), b.eval(p));
        let next = Point::new(p.x - step[0], p.y - step[1]);
        let rn = residual(next);
        if !(rn < r) {
            break;
        }
        p = next;
        r = rn;
    }
    p
}

fn push_unique(out: &mut Vec<Point>, p: Point) {
    let scale = 1.0 + p.x.abs().max(p.y.abs());
    if out.iter().any(|q| q.distance(&p) <= 1e-7 * scale) {
        return;
    }
    out.push(p);
}
