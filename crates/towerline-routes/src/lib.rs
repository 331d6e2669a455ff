//! Route construction for Towerline.
//!
//! Street graph loading, A* search from each spawn point to the base,
//! and the path processor that turns a raw node path into a cached,
//! height-smoothed route.

pub use towerline_core as core;

pub mod astar;
pub mod cache;
pub mod error;
pub mod graph;
pub mod heights;
pub mod processor;
pub mod projection;

// Re-export key types for convenience.
pub use astar::find_path;
pub use cache::{BuildTicket, RouteCache};
pub use error::RouteError;
pub use graph::{Node, NodeId, Street, StreetGraph};
pub use heights::{smooth_path_heights, NoTerrain, SmoothingParams, TerrainSampler};
pub use processor::{PathProcessor, ProcessedRoute, RouteBuild, RouteConfig};
pub use projection::GeoProjection;
