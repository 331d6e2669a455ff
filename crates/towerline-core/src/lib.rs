//! Core types and definitions for the Towerline simulation.
//!
//! This crate defines the vocabulary shared across all other crates:
//! geographic positions, paths, components, events, configuration,
//! state snapshots and constants. It has no dependency on the ECS or
//! any rendering framework.

pub mod components;
pub mod config;
pub mod constants;
pub mod enums;
pub mod error;
pub mod events;
pub mod path;
pub mod state;
pub mod types;

pub use error::{ConfigError, PathError};
pub use path::Path;
pub use types::{EntityId, GeoPosition, SimTime, SpawnId, SpawnPoint};
