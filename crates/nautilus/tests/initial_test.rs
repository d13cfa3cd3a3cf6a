use nautilus::algo::initial::{PairRelation, target_distance};
use nautilus::geometry::area::circle_overlap;
use nautilus::{FitInput, FitOptions, InitialProblem, Point, XorShift64Star};
use nautilus::{initial_layout, initial_layout_from};
use std::f64::consts::{PI, TAU};

fn symmetric_triple() -> FitInput {
    FitInput::new(["A", "B", "C"])
        .with_area(&["A"], 1.0)
        .with_area(&["B"], 1.0)
        .with_area(&["C"], 1.0)
        .with_area(&["A", "B"], 0.5)
        .with_area(&["A", "C"], 0.5)
        .with_area(&["B", "C"], 0.5)
}

#[test]
fn symmetric_seed_converges_to_threefold_symmetry() {
    let targets = symmetric_triple().validate().expect("valid");
    let problem = InitialProblem::from_targets(&targets);
    assert!(
        problem
            .pairs
            .iter()
            .all(|p| p.relation == PairRelation::Overlapping)
    );

    let seed: Vec<Point> = (0..3)
        .map(|i| {
            let t = TAU * i as f64 / 3.0 + 0.2;
            Point::new(1.7 + 0.4 * t.cos(), -0.6 + 0.4 * t.sin())
        })
        .collect();
    let layout = initial_layout_from(&problem, &seed, &FitOptions::default());

    let c = &layout.centers;
    let centroid = Point::new(
        (c[0].x + c[1].x + c[2].x) / 3.0,
        (c[0].y + c[1].y + c[2].y) / 3.0,
    );
    let radial: Vec<f64> = c.iter().map(|p| p.distance(&centroid)).collect();
    let sides = [
        c[0].distance(&c[1]),
        c[1].distance(&c[2]),
        c[2].distance(&c[0]),
    ];
    for k in 1..3 {
        assert!((radial[k] - radial[0]).abs() < 1e-6, "{radial:?}");
        assert!((sides[k] - sides[0]).abs() < 1e-6, "{sides:?}");
    }
    // Rotating by a third of a turn about the centroid maps the layout onto itself.
    let angle = |p: &Point| (p.y - centroid.y).atan2(p.x - centroid.x);
    let step = (angle(&c[1]) - angle(&c[0])).rem_euclid(TAU);
    assert!(
        (step - TAU / 3.0).abs() < 1e-6 || (step - 2.0 * TAU / 3.0).abs() < 1e-6,
        "step {step}"
    );

    let r = (2.0 / PI).sqrt();
    assert!((sides[0] - target_distance(r, r, 0.5)).abs() < 1e-5);
    assert!(layout.loss < 1e-8);
    assert_eq!(problem.loss(&layout.centers), layout.loss);
}

#[test]
fn disjoint_and_nested_pairs_only_push_when_violated() {
    let targets = FitInput::new(["A", "B", "C"])
        .with_area(&["A"], 3.0)
        .with_area(&["B"], 1.0)
        .with_area(&["A", "C"], 0.5)
        .validate()
        .expect("valid");
    let problem = InitialProblem::from_targets(&targets);
    let mut rng = XorShift64Star::new(11);
    let layout = initial_layout(&problem, &FitOptions::default(), &mut rng);
    assert!(layout.loss < 1e-8, "loss {}", layout.loss);

    let circles = layout.circles();
    let (a, b, c) = (&circles[0], &circles[1], &circles[2]);
    // A and B share nothing; C lies inside A.
    assert!(a.center().distance(&b.center()) >= a.a + b.a - 1e-4);
    assert!(circle_overlap(a.a, c.a, a.center().distance(&c.center())) >= c.area() - 1e-4);
}

#[test]
fn restarts_are_reproducible_per_seed() {
    let targets = symmetric_triple().validate().expect("valid");
    let problem = InitialProblem::from_targets(&targets);
    let opts = FitOptions {
        initial_restarts: 4,
        ..FitOptions::default()
    };
    let a = initial_layout(&problem, &opts, &mut XorShift64Star::new(42));
    let b = initial_layout(&problem, &opts, &mut XorShift64Star::new(42));
    assert_eq!(a.centers, b.centers);
    assert_eq!(a.loss, b.loss);
}
