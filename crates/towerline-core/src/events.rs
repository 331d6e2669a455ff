//! Events emitted by the simulation during a tick.
//!
//! Managers enqueue these while they run; the orchestrator drains the queue
//! once per tick and hands every event to each registered listener.

use serde::{Deserialize, Serialize};

use crate::enums::SoundKind;
use crate::types::{EntityId, GeoPosition, SpawnId};

/// Instruction for the external audio backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command")]
pub enum AudioCommand {
    /// Start (or replace) the sound bound to `entity`.
    Play {
        entity: EntityId,
        handle: u64,
        sound: SoundKind,
        position: GeoPosition,
    },
    /// Stop the sound bound to `entity`.
    Stop { entity: EntityId, handle: u64 },
}

/// Everything observable that happened during a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SimEvent {
    EnemySpawned {
        entity: EntityId,
        spawn: SpawnId,
        type_id: String,
    },
    /// An enemy finished its path. Not a kill; no reward.
    EnemyReachedBase { entity: EntityId, damage: f64 },
    EnemyHit {
        entity: EntityId,
        damage: f64,
        hp_remaining: f64,
    },
    EnemyKilled { entity: EntityId, reward: u32 },
    TowerPlaced {
        entity: EntityId,
        type_id: String,
        position: GeoPosition,
    },
    TowerFired { tower: EntityId, target: EntityId },
    /// Target was gone before the projectile arrived.
    ProjectileDiscarded { projectile: EntityId },
    WaveStarted { wave: u32, enemy_count: u32 },
    WaveCompleted { wave: u32, reward: u32 },
    WaveAborted { wave: u32 },
    BaseDamaged { damage: f64, health_remaining: f64 },
    GameOver { wave: u32 },
    Audio(AudioCommand),
    DebugLog { message: String },
}

impl SimEvent {
    pub fn debug(message: impl Into<String>) -> Self {
        SimEvent::DebugLog {
            message: message.into(),
        }
    }
}
