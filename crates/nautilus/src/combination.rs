//! Set combinations and validated fit targets.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Largest universe a fit accepts. Region enumeration is exponential in the set count.
pub const MAX_SETS: usize = 16;

/// A non-empty subset of the fit's sets, as a bitmask over set indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Combination(u32);

impl Combination {
    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Indices must be below [`MAX_SETS`].
    pub fn from_indices(indices: impl IntoIterator<Item = usize>) -> Self {
        Self(indices.into_iter().fold(0u32, |acc, i| acc | Self::single(i).0))
    }

    /// `index` must be below [`MAX_SETS`].
    pub fn single(index: usize) -> Self {
        debug_assert!(index < MAX_SETS, "set index {index} exceeds MAX_SETS");
        Self(u32::try_from(index).ok().and_then(|i| 1u32.checked_shl(i)).unwrap_or(0))
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, index: usize) -> bool {
        index < 32 && self.0 & (1 << index) != 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn is_subset_of(self, other: Combination) -> bool {
        self.0 & !other.0 == 0
    }

    pub fn indices(self) -> impl Iterator<Item = usize> {
        let bits = self.0;
        (0..32).filter(move |i| bits & (1 << i) != 0)
    }

    /// Every non-empty combination over `n` sets, in bitmask order.
    pub fn all(n: usize) -> impl Iterator<Item = Combination> {
        (1u32..(1u32 << n)).map(Combination)
    }
}

/// Caller-facing fit input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FitInput {
    /// The universe of set names; its order fixes the order of the fitted shapes. When empty,
    /// the universe is the sets named by `areas`, in order of first appearance.
    pub sets: Vec<String>,
    /// Disjoint target area for each listed combination (the area belonging to exactly those
    /// sets). Unlisted combinations have target 0.
    pub areas: Vec<(Vec<String>, f64)>,
}

impl FitInput {
    pub fn new<S: Into<String>>(sets: impl IntoIterator<Item = S>) -> Self {
        Self {
            sets: sets.into_iter().map(Into::into).collect(),
            areas: Vec::new(),
        }
    }

    pub fn with_area(mut self, members: &[&str], area: f64) -> Self {
        self.areas
            .push((members.iter().map(|s| s.to_string()).collect(), area));
        self
    }

    /// Check the input and derive the canonical per-combination targets.
    pub fn validate(&self) -> Result<Targets> {
        let mut names: IndexSet<String> = IndexSet::with_capacity(self.sets.len());
        for name in &self.sets {
            if !names.insert(name.clone()) {
                return Err(Error::DuplicateSet { name: name.clone() });
            }
        }
        let explicit_universe = !names.is_empty();
        if !explicit_universe {
            for (members, _) in &self.areas {
                for m in members {
                    names.insert(m.clone());
                }
            }
        }
        if names.is_empty() {
            return Err(Error::NoSets);
        }
        if names.len() > MAX_SETS {
            return Err(Error::TooManySets {
                count: names.len(),
                max: MAX_SETS,
            });
        }

        let n = names.len();
        let mut disjoint = vec![0.0; 1 << n];
        let mut listed: Vec<Combination> = Vec::with_capacity(self.areas.len());
        for (members, area) in &self.areas {
            if members.is_empty() {
                return Err(Error::EmptyCombination);
            }
            let mut combo = Combination(0);
            for m in members {
                let idx = names
                    .get_index_of(m.as_str())
                    .ok_or_else(|| Error::UnknownSet { name: m.clone() })?;
                if combo.contains(idx) {
                    return Err(Error::DuplicateSet { name: m.clone() });
                }
                combo = Combination(combo.0 | (1 << idx));
            }
            let label = members.join("&");
            if !area.is_finite() || *area < 0.0 {
                return Err(Error::InvalidArea {
                    combination: label,
                    area: *area,
                });
            }
            if listed.contains(&combo) {
                return Err(Error::DuplicateCombination { combination: label });
            }
            listed.push(combo);
            disjoint[combo.0 as usize] = *area;
        }

        Ok(Targets {
            names,
            disjoint,
            listed,
        })
    }
}

/// Validated targets: one disjoint area per combination, indexed by bitmask.
#[derive(Debug, Clone)]
pub struct Targets {
    names: IndexSet<String>,
    disjoint: Vec<f64>,
    listed: Vec<Combination>,
}

impl Targets {
    /// Targets straight from a dense bitmask-indexed table (index 0 is ignored).
    pub fn from_disjoint(names: IndexSet<String>, disjoint: Vec<f64>) -> Result<Self> {
        if names.is_empty() {
            return Err(Error::NoSets);
        }
        if names.len() > MAX_SETS {
            return Err(Error::TooManySets {
                count: names.len(),
                max: MAX_SETS,
            });
        }
        let expected = 1usize << names.len();
        if disjoint.len() != expected {
            return Err(Error::TargetTableSize {
                expected,
                got: disjoint.len(),
            });
        }
        let mut listed = Vec::new();
        for c in Combination::all(names.len()) {
            let area = disjoint[c.bits() as usize];
            if !area.is_finite() || area < 0.0 {
                return Err(Error::InvalidArea {
                    combination: label_of(&names, c),
                    area,
                });
            }
            if area > 0.0 {
                listed.push(c);
            }
        }
        Ok(Self {
            names,
            disjoint,
            listed,
        })
    }

    pub fn set_count(&self) -> usize {
        self.names.len()
    }

    pub fn names(&self) -> &IndexSet<String> {
        &self.names
    }

    pub fn disjoint(&self, c: Combination) -> f64 {
        self.disjoint.get(c.bits() as usize).copied().unwrap_or(0.0)
    }

    /// Dense table indexed by bitmask; entry 0 is unused.
    pub fn disjoint_table(&self) -> &[f64] {
        &self.disjoint
    }

    /// Combinations the caller listed (or, from a dense table, the positive ones).
    pub fn listed(&self) -> &[Combination] {
        &self.listed
    }

    /// Total area of the combination's intersection: the sum of every disjoint target that
    /// contains it.
    pub fn inclusive(&self, c: Combination) -> f64 {
        Combination::all(self.set_count())
            .filter(|t| c.is_subset_of(*t))
            .map(|t| self.disjoint[t.bits() as usize])
            .sum()
    }

    pub fn set_area(&self, i: usize) -> f64 {
        self.inclusive(Combination::single(i))
    }

    pub fn pair_overlap(&self, i: usize, j: usize) -> f64 {
        self.inclusive(Combination::from_indices([i, j]))
    }

    /// Human-readable name such as `A&B`.
    pub fn label(&self, c: Combination) -> String {
        label_of(&self.names, c)
    }
}

fn label_of(names: &IndexSet<String>, c: Combination) -> String {
    c.indices()
        .filter_map(|i| names.get_index(i).map(String::as_str))
        .collect::<Vec<_>>()
        .join("&")
}
