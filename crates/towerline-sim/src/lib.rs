//! Simulation engine for Towerline.
//!
//! Owns the hecs ECS world, runs the enemy, tower, projectile, wave and
//! audio managers in a fixed order each tick, and produces
//! GameStateSnapshots for the renderer.

pub mod bus;
pub mod completions;
pub mod engine;
pub mod entity;
pub mod error;
pub mod ledger;
pub mod managers;
pub mod systems;
pub mod world_setup;

pub use towerline_core as core;
pub use towerline_routes as routes;

pub use bus::{EventBus, Listener, ListenerId};
pub use completions::{Completion, CompletionSender, CompletionTicket};
pub use engine::GameStateManager;
pub use error::{PlacementCheck, PlacementError, SimError};
