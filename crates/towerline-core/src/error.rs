//! Error types shared by the core vocabulary.

use thiserror::Error;

/// Configuration could not be parsed or is inconsistent.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("malformed config json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// A waypoint sequence that cannot form a route.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PathError {
    #[error("path needs at least 2 waypoints, got {len}")]
    TooShort { len: usize },
    #[error("waypoint {index} has a non-finite coordinate")]
    NonFinite { index: usize },
}
