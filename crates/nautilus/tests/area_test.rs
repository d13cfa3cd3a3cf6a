use nautilus::geometry::area::{Overlaps, circle_overlap};
use nautilus::{Combination, Ellipse, Point, disjoint_areas, intersection_area, region_area};
use std::f64::consts::PI;

const TOL: f64 = 1e-9;

fn three_ellipses() -> Vec<Ellipse> {
    vec![
        Ellipse::new(0.0, 0.0, 2.0, 1.2, 0.3),
        Ellipse::new(1.4, 0.4, 1.6, 1.0, -0.6),
        Ellipse::new(0.6, -1.0, 1.3, 1.3, 0.0),
    ]
}

fn sampled_area(shapes: &[Ellipse], inside: impl Fn(Point) -> bool) -> f64 {
    let b = shapes
        .iter()
        .map(Ellipse::bounds)
        .reduce(|a, b| a.union(&b))
        .expect("shapes");
    let steps = 1000;
    let (hx, hy) = (b.width() / steps as f64, b.height() / steps as f64);
    let mut hits = 0usize;
    for i in 0..steps {
        for j in 0..steps {
            let p = Point::new(
                b.min_x + (i as f64 + 0.5) * hx,
                b.min_y + (j as f64 + 0.5) * hy,
            );
            if inside(p) {
                hits += 1;
            }
        }
    }
    hits as f64 * hx * hy
}

#[test]
fn circle_lens_matches_closed_form_across_distances() {
    let r1: f64 = 1.0;
    for r2 in [0.25, 0.6, 1.0, 1.5, 3.0] {
        let small = r1.min(r2);
        for step in 0..80 {
            let d = step as f64 * (r1 + r2 + 0.5) / 79.0;
            let shapes = [
                Ellipse::circle(-0.3, 0.7, r1),
                Ellipse::circle(-0.3 + d * 0.8, 0.7 - d * 0.6, r2),
            ];
            let got = intersection_area(&shapes, Combination::from_indices([0, 1]), TOL);
            let want = circle_overlap(r1, r2, d);
            assert!(
                (got - want).abs() <= 1e-6 * PI * small * small,
                "r2={r2} d={d}: got {got}, want {want}"
            );
        }
    }
}

#[test]
fn regions_partition_the_union() {
    let shapes = three_ellipses();
    let total: f64 = disjoint_areas(&shapes, TOL).iter().skip(1).sum();
    let union = sampled_area(&shapes, |p| shapes.iter().any(|s| s.contains(p, 0.0)));
    assert!(
        (total - union).abs() < 5e-3 * union,
        "regions {total} vs union {union}"
    );
}

#[test]
fn every_region_matches_sampling() {
    let shapes = three_ellipses();
    let table = disjoint_areas(&shapes, TOL);
    for c in Combination::all(shapes.len()) {
        let sampled = sampled_area(&shapes, |p| {
            shapes
                .iter()
                .enumerate()
                .all(|(i, s)| s.contains(p, 0.0) == c.contains(i))
        });
        let exact = table[c.bits() as usize];
        assert!(exact >= 0.0);
        assert!((exact - sampled).abs() < 2e-2, "{c:?}: exact {exact} sampled {sampled}");
    }
}

#[test]
fn region_area_ignores_shape_order() {
    let shapes = three_ellipses();
    // New position k holds old shape perm[k].
    let perm = [2usize, 0, 1];
    let shuffled: Vec<Ellipse> = perm.iter().map(|&i| shapes[i]).collect();
    for c in Combination::all(3) {
        let moved = Combination::from_indices((0..3).filter(|&k| c.contains(perm[k])));
        let a = region_area(&shapes, c, TOL);
        let b = region_area(&shuffled, moved, TOL);
        assert!((a - b).abs() < 1e-10, "{c:?}: {a} vs {b}");
    }
}

#[test]
fn isolated_shape_keeps_its_full_area() {
    let shapes = [
        Ellipse::new(0.0, 0.0, 2.0, 0.5, 1.1),
        Ellipse::circle(10.0, 10.0, 1.0),
    ];
    let o = Overlaps::new(&shapes, TOL);
    assert_eq!(o.crossings(0, 1), 0);
    assert!((o.region_area(Combination::single(0)) - PI).abs() < 1e-12);
    assert_eq!(o.region_area(Combination::from_indices([0, 1])), 0.0);
}

#[test]
fn three_boundaries_through_one_point() {
    // All three unit circles pass through the origin.
    let shapes = [
        Ellipse::circle(1.0, 0.0, 1.0),
        Ellipse::circle(-0.5, 3f64.sqrt() / 2.0, 1.0),
        Ellipse::circle(-0.5, -(3f64.sqrt()) / 2.0, 1.0),
    ];
    let triple = intersection_area(&shapes, Combination::from_indices([0, 1, 2]), TOL);
    assert!(triple.abs() < 1e-9, "triple {triple}");
    let pair = intersection_area(&shapes, Combination::from_indices([0, 1]), TOL);
    let d = 3f64.sqrt();
    assert!((pair - circle_overlap(1.0, 1.0, d)).abs() < 1e-9);
}
