//! ECS components for hecs entities.
//!
//! Components are plain data with small invariant-preserving helpers.
//! Game logic lives in the managers, not here.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::enums::{DamageOutcome, EntityKind};
use crate::path::Path;
use crate::types::{EntityId, GeoPosition};

/// Liveness flag carried by every entity.
/// `active` flips to false the moment the entity is destroyed, before any
/// deferred cleanup runs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Lifecycle {
    pub kind: EntityKind,
    pub active: bool,
}

impl Lifecycle {
    pub fn new(kind: EntityKind) -> Self {
        Self { kind, active: true }
    }
}

/// World placement of an entity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Transform {
    pub position: GeoPosition,
    /// Radians, 0 = North, clockwise.
    pub heading: f64,
    pub scale: f64,
}

impl Transform {
    pub fn at(position: GeoPosition) -> Self {
        Self {
            position,
            heading: 0.0,
            scale: 1.0,
        }
    }
}

/// Hit points. `hp` stays within `[0, max_hp]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Health {
    pub hp: f64,
    pub max_hp: f64,
}

impl Health {
    pub fn new(max_hp: f64) -> Self {
        let max_hp = max_hp.max(0.0);
        Self { hp: max_hp, max_hp }
    }

    pub fn alive(&self) -> bool {
        self.hp > 0.0
    }

    /// Fraction of health remaining in `[0, 1]`.
    pub fn percent(&self) -> f64 {
        if self.max_hp <= 0.0 {
            return 0.0;
        }
        (self.hp / self.max_hp).clamp(0.0, 1.0)
    }

    /// Subtract damage, clamping at zero.
    pub fn apply_damage(&mut self, amount: f64) -> DamageOutcome {
        if !self.alive() {
            return DamageOutcome::AlreadyDead;
        }
        self.hp = (self.hp - amount.max(0.0)).clamp(0.0, self.max_hp);
        if self.alive() {
            DamageOutcome::Survived
        } else {
            DamageOutcome::Killed
        }
    }

    pub fn deplete(&mut self) {
        self.hp = 0.0;
    }
}

/// Path-following state of an enemy.
#[derive(Debug, Clone)]
pub struct Movement {
    /// Shared with the route cache; never copied per enemy.
    pub path: Arc<Path>,
    /// Index of the waypoint that starts the current segment,
    /// clamped to `[0, path.len() - 1]`.
    pub current_index: usize,
    /// Fractional progress through the current segment in `[0, 1]`.
    pub segment_progress: f64,
    /// Arc length travelled along the path (meters).
    pub distance_travelled: f64,
    /// Meters per second.
    pub speed: f64,
    /// Waiting for the rest of a gathering batch.
    pub paused: bool,
}

impl Movement {
    pub fn new(path: Arc<Path>, speed: f64, paused: bool) -> Self {
        Self {
            path,
            current_index: 0,
            segment_progress: 0.0,
            distance_travelled: 0.0,
            speed,
            paused,
        }
    }

    pub fn at_end(&self) -> bool {
        self.current_index >= self.path.last_index()
    }
}

/// Offensive stats of a tower.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Combat {
    pub damage: f64,
    /// Meters.
    pub range: f64,
    /// Shots per second.
    pub fire_rate: f64,
    /// Seconds until the tower may fire again, never negative.
    pub cooldown: f64,
}

impl Combat {
    pub fn new(damage: f64, range: f64, fire_rate: f64) -> Self {
        Self {
            damage,
            range,
            fire_rate,
            cooldown: 0.0,
        }
    }

    /// Full reload interval (seconds).
    pub fn interval(&self) -> f64 {
        if self.fire_rate > 0.0 {
            1.0 / self.fire_rate
        } else {
            f64::INFINITY
        }
    }

    pub fn tick(&mut self, dt: f64) {
        self.cooldown = (self.cooldown - dt).max(0.0);
    }

    pub fn ready(&self) -> bool {
        self.cooldown <= 0.0
    }
}

/// Handle of the sound currently attached to an entity.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Audio {
    pub handle: Option<u64>,
}

/// Per-enemy type data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enemy {
    pub type_id: String,
    /// Credits granted when killed.
    pub reward: u32,
    /// Damage dealt to the base on arrival.
    pub base_damage: f64,
}

/// Per-tower type data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tower {
    pub type_id: String,
    /// Target chosen this tick, if any.
    pub target: Option<EntityId>,
}

/// Flight state of a projectile. The target is held by entity id and
/// re-resolved every tick, so the projectile pursues a moving enemy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Projectile {
    pub source: EntityId,
    pub target: EntityId,
    pub damage: f64,
    /// Meters per second.
    pub speed: f64,
}
