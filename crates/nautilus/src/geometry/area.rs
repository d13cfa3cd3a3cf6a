//! Exact areas of intersections and disjoint regions of ellipses.
//!
//! The intersection of any group of ellipses is convex, so its boundary vertices (pairwise
//! crossings lying inside every member) can be ordered by angle around their centroid. The area
//! is the polygon on those vertices plus, for each edge, the elliptical segment between the
//! chord and the arc that bounds the region. Disjoint region areas follow by inclusion–exclusion
//! over supersets.

use rustc_hash::FxHashMap;
use std::f64::consts::TAU;

use super::conic::intersect_ellipses;
use super::{Ellipse, Point, polygon_area};
use crate::combination::Combination;

#[derive(Debug, Clone, Copy)]
struct Vertex {
    point: Point,
    /// Shapes whose boundary passes through the point.
    parents: u32,
    /// Shapes whose closure contains the point, parents included.
    inside: u32,
}

/// Pairwise boundary crossings of one snapshot of shapes.
///
/// Built once per shape snapshot and then queried for any number of combinations; it borrows
/// the shapes, so it cannot outlive a parameter update.
#[derive(Debug)]
pub struct Overlaps<'a> {
    shapes: &'a [Ellipse],
    tol: f64,
    vertices: Vec<Vertex>,
}

impl<'a> Overlaps<'a> {
    pub fn new(shapes: &'a [Ellipse], tol: f64) -> Self {
        let mut vertices: Vec<Vertex> = Vec::new();
        for i in 0..shapes.len() {
            for j in (i + 1)..shapes.len() {
                for point in intersect_ellipses(&shapes[i], &shapes[j], tol) {
                    let parents = (1u32 << i) | (1u32 << j);
                    // Three or more boundaries through one point collapse into a single vertex.
                    let scale = 1.0 + point.x.abs().max(point.y.abs());
                    if let Some(v) = vertices
                        .iter_mut()
                        .find(|v| v.point.distance(&point) <= 1e-9 * scale)
                    {
                        v.parents |= parents;
                        v.inside |= parents;
                        continue;
                    }
                    let mut inside = parents;
                    for (k, s) in shapes.iter().enumerate() {
                        if inside & (1 << k) == 0 && s.contains(point, tol) {
                            inside |= 1 << k;
                        }
                    }
                    vertices.push(Vertex {
                        point,
                        parents,
                        inside,
                    });
                }
            }
        }
        Self {
            shapes,
            tol,
            vertices,
        }
    }

    /// Number of boundary crossings between shapes `i` and `j`.
    pub fn crossings(&self, i: usize, j: usize) -> usize {
        let pair = (1u32 << i) | (1u32 << j);
        self.vertices
            .iter()
            .filter(|v| v.parents & pair == pair)
            .count()
    }

    /// Area of the intersection of every shape in `members`.
    pub fn intersection_area(&self, members: Combination) -> f64 {
        let mask = members.bits();
        let idx: Vec<usize> = members
            .indices()
            .filter(|&i| i < self.shapes.len())
            .collect();
        if idx.is_empty() || idx.iter().any(|&i| self.shapes[i].is_empty()) {
            return 0.0;
        }
        if idx.len() == 1 {
            return self.shapes[idx[0]].area();
        }

        let verts: Vec<&Vertex> = self
            .vertices
            .iter()
            .filter(|v| (v.parents & mask).count_ones() >= 2 && v.inside & mask == mask)
            .collect();

        let smallest_area = idx
            .iter()
            .map(|&i| self.shapes[i].area())
            .fold(f64::INFINITY, f64::min);

        if verts.len() < 2 {
            return self.contained_area(&idx);
        }

        let n = verts.len() as f64;
        let cx = verts.iter().map(|v| v.point.x).sum::<f64>() / n;
        let cy = verts.iter().map(|v| v.point.y).sum::<f64>() / n;
        let mut ordered = verts;
        ordered.sort_by(|a, b| {
            let ta = (a.point.y - cy).atan2(a.point.x - cx);
            let tb = (b.point.y - cy).atan2(b.point.x - cx);
            ta.total_cmp(&tb)
        });

        let polygon: Vec<Point> = ordered.iter().map(|v| v.point).collect();
        let mut area = polygon_area(&polygon);
        for k in 0..ordered.len() {
            let from = ordered[k];
            let to = ordered[(k + 1) % ordered.len()];
            area += self.bounding_segment(from, to, mask);
        }

        area.clamp(0.0, smallest_area)
    }

    /// No usable vertices: the intersection is either empty or the smallest member whole.
    fn contained_area(&self, idx: &[usize]) -> f64 {
        let Some(&smallest) = idx
            .iter()
            .min_by(|&&a, &&b| self.shapes[a].area().total_cmp(&self.shapes[b].area()))
        else {
            return 0.0;
        };
        let s = &self.shapes[smallest];
        let center = s.center();
        let inside_all = idx
            .iter()
            .all(|&o| o == smallest || self.shapes[o].contains(center, self.tol));
        if inside_all { s.area() } else { 0.0 }
    }

    /// Segment area between the chord `from -> to` and the arc bounding the region.
    ///
    /// Candidate arcs come from shapes whose boundary carries both vertices; the right one is
    /// the counter-clockwise arc whose midpoint stays inside every member.
    fn bounding_segment(&self, from: &Vertex, to: &Vertex, mask: u32) -> f64 {
        let mut best_inside: Option<f64> = None;
        let mut best_any: Option<f64> = None;

        let shared = from.parents & to.parents & mask;
        for s in Combination::from_bits(shared).indices() {
            let e = &self.shapes[s];
            let t0 = e.eccentric_angle(from.point);
            let t1 = e.eccentric_angle(to.point);
            let delta = (t1 - t0).rem_euclid(TAU);
            let segment = 0.5 * e.a * e.b * (delta - delta.sin());

            let mid = e.point_at(t0 + delta / 2.0);
            let mid_inside = (0..self.shapes.len())
                .filter(|&o| o != s && mask & (1 << o) != 0)
                .all(|o| self.shapes[o].contains(mid, self.tol));

            best_any = Some(best_any.map_or(segment, |b: f64| b.min(segment)));
            if mid_inside {
                best_inside = Some(best_inside.map_or(segment, |b: f64| b.min(segment)));
            }
        }

        best_inside.or(best_any).unwrap_or(0.0)
    }

    /// Area of every intersection, indexed by bitmask (entry 0 unused).
    ///
    /// Supersets of an empty intersection are skipped.
    pub fn intersection_table(&self) -> Vec<f64> {
        let n = self.shapes.len();
        let mut table = vec![0.0; 1 << n];
        for c in Combination::all(n) {
            let bits = c.bits();
            let pruned = c.len() > 1
                && c.indices().any(|i| table[(bits & !(1 << i)) as usize] <= 0.0);
            if !pruned {
                table[bits as usize] = self.intersection_area(c);
            }
        }
        table
    }

    /// Area of every disjoint region, indexed by bitmask (entry 0 unused).
    pub fn disjoint_table(&self) -> Vec<f64> {
        let n = self.shapes.len();
        let mut table = self.intersection_table();
        // Möbius inversion over supersets: d(S) = sum over T ⊇ S of (-1)^|T \ S| i(T).
        for bit in 0..n {
            for mask in 1..(1usize << n) {
                if mask & (1 << bit) == 0 {
                    table[mask] -= table[mask | (1 << bit)];
                }
            }
        }
        for v in table.iter_mut().skip(1) {
            *v = v.max(0.0);
        }
        table
    }

    /// Area belonging to exactly `combination`: inside all of its shapes, outside the rest.
    pub fn region_area(&self, combination: Combination) -> f64 {
        let n = self.shapes.len();
        if combination.is_empty() || combination.indices().any(|i| i >= n) {
            return 0.0;
        }
        let base = combination.bits();
        let rest: Vec<usize> = (0..n).filter(|&i| base & (1 << i) == 0).collect();

        let mut memo: FxHashMap<u32, f64> = FxHashMap::default();
        let mut total = 0.0;
        for sub in 0u32..(1u32 << rest.len()) {
            let mut mask = base;
            for (k, &i) in rest.iter().enumerate() {
                if sub & (1 << k) != 0 {
                    mask |= 1 << i;
                }
            }
            let area = self.memoized_intersection(mask, base, &mut memo);
            if sub.count_ones() % 2 == 0 {
                total += area;
            } else {
                total -= area;
            }
        }
        total.max(0.0)
    }

    fn memoized_intersection(&self, mask: u32, base: u32, memo: &mut FxHashMap<u32, f64>) -> f64 {
        if let Some(&v) = memo.get(&mask) {
            return v;
        }
        // An empty intersection stays empty when more shapes join it.
        let mut extra = mask & !base;
        while extra != 0 {
            let bit = extra & extra.wrapping_neg();
            extra &= !bit;
            if memo.get(&(mask & !bit)).is_some_and(|&v| v <= 0.0) {
                memo.insert(mask, 0.0);
                return 0.0;
            }
        }
        let v = self.intersection_area(Combination::from_bits(mask));
        memo.insert(mask, v);
        v
    }
}

/// Area of the intersection of the shapes in `members`.
pub fn intersection_area(shapes: &[Ellipse], members: Combination, tol: f64) -> f64 {
    Overlaps::new(shapes, tol).intersection_area(members)
}

/// Area of the region belonging to exactly `combination`.
pub fn region_area(shapes: &[Ellipse], combination: Combination, tol: f64) -> f64 {
    Overlaps::new(shapes, tol).region_area(combination)
}

/// Disjoint area of every combination, indexed by bitmask (entry 0 unused).
pub fn disjoint_areas(shapes: &[Ellipse], tol: f64) -> Vec<f64> {
    Overlaps::new(shapes, tol).disjoint_table()
}

/// Closed-form overlap of two discs with radii `r1`, `r2` and centre distance `d`.
pub fn circle_overlap(r1: f64, r2: f64, d: f64) -> f64 {
    if d >= r1 + r2 {
        return 0.0;
    }
    let (small, large) = if r1 < r2 { (r1, r2) } else { (r2, r1) };
    if d <= large - small {
        return std::f64::consts::PI * small * small;
    }
    let c1 = ((d * d + r1 * r1 - r2 * r2) / (2.0 * d * r1)).clamp(-1.0, 1.0);
    let c2 = ((d * d + r2 * r2 - r1 * r1) / (2.0 * d * r2)).clamp(-1.0, 1.0);
    let k = ((-d + r1 + r2) * (d + r1 - r2) * (d - r1 + r2) * (d + r1 + r2)).max(0.0);
    r1 * r1 * c1.acos() + r2 * r2 * c2.acos() - 0.5 * k.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const TOL: f64 = 1e-9;

    #[test]
    fn lone_shape_region_is_its_whole_area() {
        let shapes = [Ellipse::new(0.0, 0.0, 2.0, 1.0, 0.4)];
        let a = region_area(&shapes, Combination::single(0), TOL);
        assert!((a - 2.0 * PI).abs() < 1e-12);
    }

    #[test]
    fn disjoint_shapes_have_empty_intersection() {
        let shapes = [
            Ellipse::circle(0.0, 0.0, 1.0),
            Ellipse::circle(5.0, 0.0, 1.0),
        ];
        let t = disjoint_areas(&shapes, TOL);
        assert_eq!(t[0b11], 0.0);
        assert!((t[0b01] - PI).abs() < 1e-12);
        assert!((t[0b10] - PI).abs() < 1e-12);
    }

    #[test]
    fn nested_circle_is_fully_shared() {
        let shapes = [
            Ellipse::circle(0.0, 0.0, 3.0),
            Ellipse::circle(0.5, 0.0, 1.0),
        ];
        let t = disjoint_areas(&shapes, TOL);
        assert!((t[0b11] - PI).abs() < 1e-12);
        assert!(t[0b10].abs() < 1e-12);
        assert!((t[0b01] - 8.0 * PI).abs() < 1e-9);
    }

    #[test]
    fn lens_matches_closed_form() {
        let shapes = [
            Ellipse::circle(0.0, 0.0, 1.0),
            Ellipse::circle(1.2, 0.3, 0.8),
        ];
        let d = 1.2f64.hypot(0.3);
        let got = intersection_area(&shapes, Combination::from_indices([0, 1]), TOL);
        assert!((got - circle_overlap(1.0, 0.8, d)).abs() < 1e-9);
    }

    #[test]
    fn region_area_agrees_with_disjoint_table() {
        let shapes = [
            Ellipse::new(0.0, 0.0, 2.0, 1.0, 0.2),
            Ellipse::new(1.0, 0.5, 1.5, 1.0, -0.4),
            Ellipse::new(0.5, -0.8, 1.0, 1.0, 0.0),
        ];
        let overlaps = Overlaps::new(&shapes, TOL);
        let table = overlaps.disjoint_table();
        for c in Combination::all(3) {
            let single = overlaps.region_area(c);
            assert!(
                (single - table[c.bits() as usize]).abs() < 1e-9,
                "{c:?}: {single} vs {}",
                table[c.bits() as usize]
            );
        }
    }

    #[test]
    fn triple_intersection_of_three_circles_matches_sampling() {
        let shapes = [
            Ellipse::circle(0.0, 0.0, 1.0),
            Ellipse::circle(1.0, 0.0, 1.0),
            Ellipse::circle(0.5, 0.8, 1.0),
        ];
        let exact = intersection_area(&shapes, Combination::from_indices([0, 1, 2]), TOL);

        let steps = 1200;
        let (lo, hi) = (-1.0, 2.0);
        let h = (hi - lo) / steps as f64;
        let mut hits = 0usize;
        for i in 0..steps {
            for j in 0..steps {
                let p = Point::new(lo + (i as f64 + 0.5) * h, lo + (j as f64 + 0.5) * h);
                if shapes.iter().all(|s| s.contains(p, 0.0)) {
                    hits += 1;
                }
            }
        }
        let sampled = hits as f64 * h * h;
        assert!((exact - sampled).abs() < 5e-3, "exact {exact} sampled {sampled}");
    }

    #[test]
    fn circle_overlap_limits() {
        assert_eq!(circle_overlap(1.0, 1.0, 2.5), 0.0);
        assert!((circle_overlap(1.0, 2.0, 0.5) - PI).abs() < 1e-12);
        assert!((circle_overlap(1.0, 1.0, 0.0) - PI).abs() < 1e-12);
    }
}
