#![forbid(unsafe_code)]

//! Headless area-proportional Euler/Venn diagram layout.
//!
//! `nautilus` places one circle or ellipse per set so that every disjoint region (the area
//! belonging to exactly one combination of sets) matches a target as closely as possible, packs
//! disconnected clusters onto one canvas and finds a label anchor inside every region. Rendering
//! is left to the caller.
//!
//! The phases can also be driven one at a time through [`algo`] and [`geometry`].

pub mod algo;
pub mod combination;
pub mod error;
pub mod geometry;
pub mod optim;
pub mod rng;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

pub use algo::initial::{InitialLayout, InitialProblem, initial_layout, initial_layout_from};
pub use algo::label::locate_point;
pub use algo::pack::{Packed, pack};
pub use algo::refine::{Refined, refine};
pub use algo::{FitOptions, ShapeKind};
pub use combination::{Combination, FitInput, MAX_SETS, Targets};
pub use error::{Error, Result};
pub use geometry::area::{disjoint_areas, intersection_area, region_area};
pub use geometry::{Bounds, Conic, Ellipse, Point, intersect};
pub use rng::XorShift64Star;

/// One disjoint region of the fitted diagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitRegion {
    pub combination: Combination,
    pub sets: Vec<String>,
    pub target: f64,
    pub fitted: f64,
    /// `target - fitted`.
    pub residual: f64,
    /// Anchor strictly inside the region; `None` when the region is empty or degenerate.
    pub label: Option<Point>,
}

/// A finished layout, ready to draw.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fit {
    /// Shape per set, in the order of the input universe.
    pub shapes: IndexMap<String, Ellipse>,
    /// Listed combinations plus every combination with positive fitted area, keyed like `A&B`.
    pub regions: IndexMap<String, FitRegion>,
    /// Bounding box of all clusters plus margin, centred on the origin.
    pub canvas: Bounds,
    /// Set names of each connected cluster.
    pub clusters: Vec<Vec<String>>,
    /// Sum of squared residuals over every combination.
    pub loss: f64,
    pub converged: bool,
}

impl Fit {
    pub fn region(&self, sets: &[&str]) -> Option<&FitRegion> {
        self.regions.values().find(|r| {
            r.sets.len() == sets.len() && sets.iter().all(|s| r.sets.iter().any(|m| m == s))
        })
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct FitTimings {
    total: Duration,
    initial: Duration,
    refine: Duration,
    pack: Duration,
    labels: Duration,
}

/// Fit a diagram to caller-supplied disjoint areas.
pub fn fit(input: &FitInput, opts: &FitOptions) -> Result<Fit> {
    let targets = input.validate()?;
    fit_targets(&targets, opts)
}

/// Fit a diagram to already validated targets.
pub fn fit_targets(targets: &Targets, opts: &FitOptions) -> Result<Fit> {
    let timing_enabled = std::env::var("NAUTILUS_FIT_TIMING").ok().as_deref() == Some("1");
    let mut timings = FitTimings::default();
    let total_start = timing_enabled.then(Instant::now);

    let n = targets.set_count();
    let mut rng = XorShift64Star::new(opts.random_seed);

    let initial_start = timing_enabled.then(Instant::now);
    let problem = InitialProblem::from_targets(targets);
    let initial = initial_layout(&problem, opts, &mut rng);
    if let Some(s) = initial_start {
        timings.initial = s.elapsed();
    }
    tracing::debug!(sets = n, loss = initial.loss, "fit: initial layout");

    let refine_start = timing_enabled.then(Instant::now);
    let refined = refine(&initial.circles(), targets, opts)?;
    if let Some(s) = refine_start {
        timings.refine = s.elapsed();
    }

    let pack_start = timing_enabled.then(Instant::now);
    let packed = pack(&refined.shapes, opts.pack_margin, opts.geometry_tolerance);
    if let Some(s) = pack_start {
        timings.pack = s.elapsed();
    }

    let labels_start = timing_enabled.then(Instant::now);
    let mut regions = IndexMap::new();
    for c in Combination::all(n) {
        let fitted = refined.fitted(c);
        if !targets.listed().contains(&c) && fitted <= 0.0 {
            continue;
        }
        let label = if fitted > 0.0 {
            locate_point(&packed.shapes, c, opts)
        } else {
            None
        };
        let sets = c
            .indices()
            .filter_map(|i| targets.names().get_index(i).cloned())
            .collect();
        regions.insert(
            targets.label(c),
            FitRegion {
                combination: c,
                sets,
                target: targets.disjoint(c),
                fitted,
                residual: refined.residual(c),
                label,
            },
        );
    }
    if let Some(s) = labels_start {
        timings.labels = s.elapsed();
    }

    let shapes: IndexMap<String, Ellipse> = targets
        .names()
        .iter()
        .cloned()
        .zip(packed.shapes.iter().copied())
        .collect();
    let clusters: Vec<Vec<String>> = packed
        .clusters
        .iter()
        .map(|members| {
            members
                .iter()
                .filter_map(|&i| targets.names().get_index(i).cloned())
                .collect()
        })
        .collect();

    if let Some(s) = total_start {
        timings.total = s.elapsed();
        tracing::debug!(
            total = ?timings.total,
            initial = ?timings.initial,
            refine = ?timings.refine,
            pack = ?timings.pack,
            labels = ?timings.labels,
            sets = n,
            regions = regions.len(),
            iterations = refined.iterations,
            "fit timing"
        );
    }

    Ok(Fit {
        shapes,
        regions,
        canvas: packed.canvas,
        clusters,
        loss: refined.loss,
        converged: refined.converged,
    })
}
