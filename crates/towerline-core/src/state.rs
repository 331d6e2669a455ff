//! Game state snapshot: the externally visible state handed to the host each tick.

use serde::{Deserialize, Serialize};

use crate::enums::{GamePhase, WavePhase};
use crate::events::SimEvent;
use crate::types::{EntityId, GeoPosition, SimTime};

/// Complete state broadcast after each `update`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameStateSnapshot {
    pub time: SimTime,
    pub phase: GamePhase,
    pub wave: WaveView,
    pub base: BaseView,
    pub credits: u32,
    pub enemies: Vec<EnemyView>,
    pub towers: Vec<TowerView>,
    pub projectiles: Vec<ProjectileView>,
    /// Events drained during this tick, in emission order.
    pub events: Vec<SimEvent>,
}

/// Wave progress for the HUD.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WaveView {
    pub number: u32,
    pub phase: WavePhase,
    pub pending_spawns: u32,
    pub enemies_alive: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BaseView {
    pub position: GeoPosition,
    pub health: f64,
    pub max_health: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemyView {
    pub id: EntityId,
    pub type_id: String,
    pub position: GeoPosition,
    /// Radians, 0 = North.
    pub heading: f64,
    pub health_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TowerView {
    pub id: EntityId,
    pub type_id: String,
    pub position: GeoPosition,
    pub heading: f64,
    pub target: Option<EntityId>,
    pub cooldown: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectileView {
    pub id: EntityId,
    pub position: GeoPosition,
    pub target: EntityId,
}
