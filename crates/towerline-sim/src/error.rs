//! Simulation and tower placement errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use towerline_core::EntityId;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("simulation has not been initialized")]
    NotInitialized,
    #[error("game is over")]
    GameOver,
    #[error("a wave is already in progress")]
    WaveInProgress,
    #[error("unknown enemy type '{0}'")]
    UnknownEnemyType(String),
    #[error("no spawn points configured")]
    NoSpawnPoints,
    #[error("entity {entity} is in an invalid state: {reason}")]
    InvalidEntity { entity: EntityId, reason: String },
}

/// Why a tower cannot be placed. `Display` is the reason shown to the player.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlacementError {
    #[error("simulation has not been initialized")]
    NotInitialized,
    #[error("outside the playable area")]
    OutOfBounds,
    #[error("too close to a street ({distance:.1} m < {required:.1} m)")]
    TooCloseToStreet { distance: f64, required: f64 },
    #[error("too close to the base ({distance:.1} m < {required:.1} m)")]
    TooCloseToBase { distance: f64, required: f64 },
    #[error("too close to another tower ({distance:.1} m < {required:.1} m)")]
    TooCloseToTower { distance: f64, required: f64 },
    #[error("unknown tower type '{0}'")]
    UnknownTowerType(String),
    #[error("not enough credits ({have} < {cost})")]
    InsufficientCredits { cost: u32, have: u32 },
}

/// Placement verdict for the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementCheck {
    pub valid: bool,
    pub reason: Option<String>,
}

impl From<Result<(), PlacementError>> for PlacementCheck {
    fn from(result: Result<(), PlacementError>) -> Self {
        match result {
            Ok(()) => Self {
                valid: true,
                reason: None,
            },
            Err(e) => Self {
                valid: false,
                reason: Some(e.to_string()),
            },
        }
    }
}
