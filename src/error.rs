//! Error types for authored data and configuration
//!
//! The simulation itself never fails; these only surface while loading
//! assets or tuning before play begins.

/// Malformed authored content. Construction aborts on any of these.
#[derive(thiserror::Error, Debug)]
pub enum AssetError {
    /// A pose track or rig refers to a bone the skeleton doesn't have
    #[error("bone `{0}` is not in the skeleton")]
    MissingBone(String),

    /// A bone's parent index doesn't precede it in the hierarchy
    #[error("bone {bone} has invalid parent index {parent}")]
    BadParent { bone: usize, parent: usize },

    /// Zero-length tongue segment
    #[error("tongue segment {index} has zero length")]
    DegenerateSegment { index: usize },

    /// A table that must have samples has none
    #[error("{0} table is empty")]
    EmptyTable(&'static str),

    /// Keyframe times must strictly increase
    #[error("{0} keyframe times are not strictly increasing")]
    UnsortedKeyframes(&'static str),

    /// A track has a different sample count than its table's keyframes
    #[error("track for bone `{bone}` has {got} samples, expected {expected}")]
    TrackLength {
        bone: String,
        got: usize,
        expected: usize,
    },

    /// Non-positive pipe radius or slot spacing
    #[error("invalid pipe metrics: {0}")]
    PipeMetrics(String),

    #[error("asset JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("asset IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Tuning / score-table file errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Value outside its meaningful range
    #[error("invalid setting: {0}")]
    Invalid(String),
}
