use nautilus::algo::label::in_region;
use nautilus::{Error, Fit, FitInput, FitOptions, ShapeKind, Targets, fit, fit_targets};

fn two_sets() -> FitInput {
    FitInput::new(["A", "B"])
        .with_area(&["A"], 2.0)
        .with_area(&["B"], 1.0)
        .with_area(&["A", "B"], 0.5)
}

fn three_sets() -> FitInput {
    FitInput::new(["A", "B", "C"])
        .with_area(&["A"], 4.0)
        .with_area(&["B"], 3.0)
        .with_area(&["C"], 2.0)
        .with_area(&["A", "B"], 1.0)
        .with_area(&["A", "C"], 0.8)
        .with_area(&["B", "C"], 0.6)
        .with_area(&["A", "B", "C"], 0.3)
}

#[test]
fn two_sets_fit_exactly() {
    let out = fit(&two_sets(), &FitOptions::default()).expect("fit");
    assert_eq!(out.shapes.keys().collect::<Vec<_>>(), vec!["A", "B"]);
    assert_eq!(out.regions.keys().collect::<Vec<_>>(), vec!["A", "B", "A&B"]);
    for r in out.regions.values() {
        assert!(r.residual.abs() < 1e-3, "{r:?}");
        assert!(r.label.is_some(), "{r:?}");
    }
    assert!(out.loss < 1e-6);
    assert_eq!(out.clusters, vec![vec!["A".to_string(), "B".to_string()]]);
}

#[test]
fn labels_lie_inside_their_regions() {
    let out = fit(&three_sets(), &FitOptions::ellipses()).expect("fit");
    let shapes: Vec<_> = out.shapes.values().copied().collect();
    for r in out.regions.values() {
        if let Some(p) = r.label {
            assert!(in_region(&shapes, r.combination, p, 0.0), "{r:?}");
        } else {
            assert!(r.fitted < 1e-3, "{r:?}");
        }
    }
    assert!(out.region(&["C", "A"]).is_some());
    assert!(out.region(&["A", "D"]).is_none());
}

#[test]
fn fits_are_deterministic_per_seed() {
    let opts = FitOptions {
        random_seed: 17,
        ..FitOptions::default()
    };
    let a = fit(&three_sets(), &opts).expect("fit");
    let b = fit(&three_sets(), &opts).expect("fit");
    assert_eq!(a.shapes, b.shapes);
    assert_eq!(a.loss, b.loss);
}

#[test]
fn ellipses_never_fit_worse_than_circles() {
    let circles = fit(&three_sets(), &FitOptions::default()).expect("circles");
    let ellipses = fit(&three_sets(), &FitOptions::ellipses()).expect("ellipses");
    assert!(ellipses.loss <= circles.loss);
}

#[test]
fn disjoint_sets_form_separate_clusters() {
    let input = FitInput::new(["A", "B", "C"])
        .with_area(&["A"], 1.0)
        .with_area(&["B"], 1.0)
        .with_area(&["C"], 1.0)
        .with_area(&["A", "B"], 0.3);
    let out = fit(&input, &FitOptions::default()).expect("fit");
    assert_eq!(out.clusters.len(), 2);
    let c = out.canvas.center();
    assert!(c.x.abs() < 1e-9 && c.y.abs() < 1e-9);
    // Unlisted and empty, so either absent or reported without a label.
    assert!(
        out.region(&["A", "C"])
            .is_none_or(|r| r.fitted.abs() < 1e-9 && r.label.is_none())
    );
}

#[test]
fn zero_area_set_gets_an_empty_shape() {
    let input = FitInput::new(["A", "B"])
        .with_area(&["A"], 1.0)
        .with_area(&["B"], 0.0);
    let out = fit(&input, &FitOptions::default()).expect("fit");
    assert!(out.shapes["B"].is_empty());
    assert_eq!(out.regions["B"].fitted, 0.0);
    assert_eq!(out.regions["B"].label, None);
    assert!(out.regions["A"].label.is_some());
}

#[test]
fn invalid_input_is_rejected_before_fitting() {
    let negative = FitInput::new(["A"]).with_area(&["A"], -1.0);
    assert!(matches!(
        fit(&negative, &FitOptions::default()),
        Err(Error::InvalidArea { .. })
    ));
    assert!(matches!(
        fit(&FitInput::default(), &FitOptions::default()),
        Err(Error::NoSets)
    ));
    let table = Targets::from_disjoint(
        ["A", "B"].into_iter().map(String::from).collect(),
        vec![0.0, 1.0],
    );
    assert!(matches!(table, Err(Error::TargetTableSize { expected: 4, got: 2 })));
}

#[test]
fn dense_target_table_fits_like_named_input() {
    let targets = Targets::from_disjoint(
        ["A", "B"].into_iter().map(String::from).collect(),
        vec![0.0, 2.0, 1.0, 0.5],
    )
    .expect("targets");
    let dense = fit_targets(&targets, &FitOptions::default()).expect("fit");
    let named = fit(&two_sets(), &FitOptions::default()).expect("fit");
    assert_eq!(dense.shapes, named.shapes);
}

#[test]
fn fit_serializes_to_json_and_back() {
    let out = fit(&two_sets(), &FitOptions::ellipses()).expect("fit");
    let json = serde_json::to_string(&out).expect("serialize");
    let value: serde_json::Value = serde_json::from_str(&json).expect("json");
    assert!(value["shapes"]["A"]["a"].is_number());
    assert_eq!(value["regions"]["A&B"]["sets"], serde_json::json!(["A", "B"]));
    assert_eq!(value["regions"]["A&B"]["combination"], serde_json::json!(3));

    let back: Fit = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back.regions.keys().collect::<Vec<_>>(), out.regions.keys().collect::<Vec<_>>());
    for (name, shape) in &out.shapes {
        let other = back.shapes[name.as_str()];
        assert!((other.h - shape.h).abs() < 1e-12 && (other.a - shape.a).abs() < 1e-12);
        assert!((other.phi - shape.phi).abs() < 1e-12);
    }
    assert_eq!(back.clusters, out.clusters);
    assert_eq!(
        serde_json::to_value(ShapeKind::Ellipse).expect("kind"),
        serde_json::json!("ellipse")
    );
}
