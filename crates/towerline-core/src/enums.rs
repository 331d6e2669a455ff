//! Enumeration types used throughout the simulation.

use serde::{Deserialize, Serialize};

/// Kind of a simulated entity. Fixes the component set it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Enemy,
    Tower,
    Projectile,
}

/// Game phase (top-level state).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// No street graph or base loaded yet.
    #[default]
    Uninitialized,
    Running,
    Paused,
    /// Base destroyed. Only `reset` leaves this phase.
    GameOver,
}

/// Wave lifecycle: `Setup -> Active -> Complete -> Setup`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WavePhase {
    #[default]
    Setup,
    Active,
    Complete,
}

/// How a wave's enemies are assigned to spawn points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnMode {
    /// Round-robin across all spawn points (balanced to within one).
    #[default]
    Distributed,
    /// Each enemy samples its spawn point independently.
    Random,
}

/// Per-entity sound category. Declaration order is eviction priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SoundKind {
    /// Looping movement sound while an enemy travels.
    Movement,
    /// An enemy was struck by a projectile.
    Impact,
    /// An enemy died.
    Death,
}

/// Result of applying damage to a Health component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Still alive after the hit.
    Survived,
    /// This hit took hp from positive to zero.
    Killed,
    /// Health was already zero; nothing changed.
    AlreadyDead,
}
