//! Packing of disconnected clusters.
//!
//! The refined layout can drift into several groups that share no area; their relative
//! placement is arbitrary. Each group is moved as a rigid unit onto a skyline so the canvas stays
//! compact, then the whole canvas is centred on the origin.

use crate::geometry::conic::intersect_ellipses;
use crate::geometry::{Bounds, Ellipse};

#[derive(Debug, Clone)]
pub struct Packed {
    pub shapes: Vec<Ellipse>,
    pub canvas: Bounds,
    /// Members of each connected cluster, in order of their first member. Empty shapes belong
    /// to none.
    pub clusters: Vec<Vec<usize>>,
}

/// True when the two shapes share area: their boundaries meet or one holds the other.
pub fn connected(a: &Ellipse, b: &Ellipse, tol: f64) -> bool {
    if a.is_empty() || b.is_empty() || !a.bounds().overlaps(&b.bounds()) {
        return false;
    }
    !intersect_ellipses(a, b, tol).is_empty()
        || a.contains(b.center(), tol)
        || b.contains(a.center(), tol)
}

/// Connected components of the non-empty shapes.
pub fn clusters(shapes: &[Ellipse], tol: f64) -> Vec<Vec<usize>> {
    let n = shapes.len();
    let mut component = vec![usize::MAX; n];
    let mut out: Vec<Vec<usize>> = Vec::new();
    for start in 0..n {
        if component[start] != usize::MAX || shapes[start].is_empty() {
            continue;
        }
        let id = out.len();
        component[start] = id;
        let mut members = vec![start];
        let mut stack = vec![start];
        while let Some(i) = stack.pop() {
            for j in 0..n {
                if component[j] == usize::MAX && connected(&shapes[i], &shapes[j], tol) {
                    component[j] = id;
                    members.push(j);
                    stack.push(j);
                }
            }
        }
        members.sort_unstable();
        out.push(members);
    }
    out
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    x: f64,
    width: f64,
    y: f64,
}

/// Upper contour of everything placed so far, as a run of flat segments covering `[0, width]`.
#[derive(Debug)]
struct Skyline {
    width: f64,
    segments: Vec<Segment>,
}

impl Skyline {
    fn new(width: f64) -> Self {
        Self {
            width,
            segments: vec![Segment {
                x: 0.0,
                width,
                y: 0.0,
            }],
        }
    }

    /// Lowest resting position for a box of width `w`, as `(x, y)`; ties go to the leftmost.
    fn find(&self, w: f64) -> Option<(f64, f64)> {
        let slack = 1e-9 * self.width.max(1.0);
        let mut best: Option<(f64, f64)> = None;
        for (i, seg) in self.segments.iter().enumerate() {
            let x = seg.x;
            if x + w > self.width + slack {
                break;
            }
            let y = self.segments[i..]
                .iter()
                .take_while(|s| s.x < x + w - slack)
                .map(|s| s.y)
                .fold(f64::NEG_INFINITY, f64::max);
            if best.is_none_or(|(_, by)| y < by - slack) {
                best = Some((x, y));
            }
        }
        best
    }

    fn place(&mut self, x: f64, w: f64, top: f64) {
        let end = x + w;
        let mut next = Vec::with_capacity(self.segments.len() + 2);
        for s in &self.segments {
            let s_end = s.x + s.width;
            if s_end <= x || s.x >= end {
                next.push(*s);
                continue;
            }
            if s.x < x {
                next.push(Segment {
                    x: s.x,
                    width: x - s.x,
                    y: s.y,
                });
            }
            if s_end > end {
                next.push(Segment {
                    x: end,
                    width: s_end - end,
                    y: s.y,
                });
            }
        }
        next.push(Segment { x, width: w, y: top });
        next.sort_by(|a, b| a.x.total_cmp(&b.x));

        let mut merged: Vec<Segment> = Vec::with_capacity(next.len());
        for s in next {
            match merged.last_mut() {
                Some(last) if last.y == s.y => last.width = s.x + s.width - last.x,
                _ => merged.push(s),
            }
        }
        self.segments = merged;
    }
}

/// Pack the connected clusters of `shapes` onto one canvas.
///
/// Clusters are placed tallest first at the lowest point of the skyline. `margin` is the gap
/// between clusters and around the canvas, as a fraction of the packed extent. Shapes inside a
/// cluster move together, so overlaps within a cluster are preserved exactly. Empty shapes are
/// parked at the canvas centre.
pub fn pack(shapes: &[Ellipse], margin: f64, tol: f64) -> Packed {
    let groups = clusters(shapes, tol);
    let mut out = shapes.to_vec();

    let boxes: Vec<Bounds> = groups
        .iter()
        .filter_map(|g| g.iter().map(|&i| shapes[i].bounds()).reduce(|a, b| a.union(&b)))
        .collect();
    if boxes.is_empty() {
        for s in &mut out {
            s.h = 0.0;
            s.k = 0.0;
        }
        return Packed {
            shapes: out,
            canvas: Bounds {
                min_x: 0.0,
                min_y: 0.0,
                max_x: 0.0,
                max_y: 0.0,
            },
            clusters: groups,
        };
    }

    let extent = boxes.iter().map(Bounds::area).sum::<f64>().sqrt();
    let gap = margin.max(0.0) * extent;

    let mut order: Vec<usize> = (0..boxes.len()).collect();
    order.sort_by(|&a, &b| boxes[b].height().total_cmp(&boxes[a].height()));

    let padded_area: f64 = boxes
        .iter()
        .map(|b| (b.width() + gap) * (b.height() + gap))
        .sum();
    let widest = boxes
        .iter()
        .map(|b| b.width() + gap)
        .fold(0.0, f64::max);
    let mut skyline = Skyline::new(widest.max(padded_area.sqrt()));

    let mut placed: Vec<Bounds> = Vec::with_capacity(boxes.len());
    for &c in &order {
        let b = boxes[c];
        let (w, h) = (b.width() + gap, b.height() + gap);
        let (x, y) = skyline.find(w).unwrap_or((0.0, 0.0));
        skyline.place(x, w, y + h);

        let (dx, dy) = (x - b.min_x, y - b.min_y);
        for &i in &groups[c] {
            out[i].translate(dx, dy);
        }
        placed.push(b.translate(dx, dy));
    }

    let used = placed
        .iter()
        .skip(1)
        .fold(placed[0], |acc, b| acc.union(b));
    let canvas = used.expand(gap);
    let center = canvas.center();
    for s in &mut out {
        if s.is_empty() {
            s.h = center.x;
            s.k = center.y;
        }
        s.translate(-center.x, -center.y);
    }
    tracing::debug!(
        clusters = groups.len(),
        width = canvas.width(),
        height = canvas.height(),
        "pack: clusters placed"
    );

    Packed {
        shapes: out,
        canvas: canvas.translate(-center.x, -center.y),
        clusters: groups,
    }
}
