#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("input does not name any sets")]
    NoSets,
    #[error("too many sets: {count} (at most {max} are supported)")]
    TooManySets { count: usize, max: usize },
    #[error("set combination must name at least one set")]
    EmptyCombination,
    #[error("set combination refers to an unknown set: {name}")]
    UnknownSet { name: String },
    #[error("set is named more than once: {name}")]
    DuplicateSet { name: String },
    #[error("set combination is listed more than once: {combination}")]
    DuplicateCombination { combination: String },
    #[error("target area for {combination} must be finite and non-negative, got {area}")]
    InvalidArea { combination: String, area: f64 },
    #[error("target table must have {expected} entries (one per bitmask), got {got}")]
    TargetTableSize { expected: usize, got: usize },
    #[error("expected {expected} shapes (one per set), got {got}")]
    ShapeCountMismatch { expected: usize, got: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
