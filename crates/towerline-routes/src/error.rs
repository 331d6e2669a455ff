//! Errors raised while loading street graphs and building routes.

use thiserror::Error;

use towerline_core::{PathError, SpawnId};

use crate::graph::NodeId;

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("malformed street graph json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("node {0} is defined more than once")]
    DuplicateNode(NodeId),
    #[error("street {street} references unknown node {node}")]
    UnknownNode { street: i64, node: NodeId },
    #[error("street {0} has fewer than two distinct nodes")]
    DegenerateStreet(i64),
    #[error("no route from {spawn} to the base")]
    NoRoute { spawn: SpawnId },
    #[error("route is not a valid path: {0}")]
    InvalidPath(#[from] PathError),
}
