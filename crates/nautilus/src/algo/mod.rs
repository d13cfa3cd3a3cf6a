//! The layout phases, run in order by [`crate::fit`]: initial placement, area refinement,
//! cluster packing and label placement.

pub mod initial;
pub mod label;
pub mod pack;
pub mod refine;

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    /// One free centre per set; radii follow the set areas.
    #[default]
    Circle,
    /// Centre, both semi-axes and rotation are free.
    Ellipse,
}

impl ShapeKind {
    /// Free parameters per set during refinement.
    pub fn parameters(self) -> usize {
        match self {
            ShapeKind::Circle => 2,
            ShapeKind::Ellipse => 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FitOptions {
    pub shape: ShapeKind,
    /// Seed for the per-fit random generator (initial placements and restarts).
    pub random_seed: u64,
    /// Random starts tried by the initial layout; the lowest loss wins.
    pub initial_restarts: usize,
    pub initial_max_iterations: usize,
    pub refine_max_iterations: usize,
    /// Relative decrease of the loss below which an optimizer run counts as converged.
    pub tolerance: f64,
    /// Wall-clock limit applied to each optimizer run separately.
    pub time_budget: Option<Duration>,
    /// Slack on the level function for inside/outside tests and intersection acceptance.
    pub geometry_tolerance: f64,
    /// Gap between packed clusters and around the canvas, as a fraction of the packed extent.
    pub pack_margin: f64,
    /// Candidate points scanned when seeding a label search.
    pub label_seeds: usize,
    pub label_max_iterations: usize,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            shape: ShapeKind::Circle,
            random_seed: 0,
            initial_restarts: 10,
            initial_max_iterations: 200,
            refine_max_iterations: 500,
            tolerance: 1e-10,
            time_budget: None,
            geometry_tolerance: 1e-9,
            pack_margin: 0.05,
            label_seeds: 500,
            label_max_iterations: 200,
        }
    }
}

impl FitOptions {
    pub fn ellipses() -> Self {
        Self {
            shape: ShapeKind::Ellipse,
            ..Self::default()
        }
    }
}
