//! Simulation configuration.
//!
//! Every field has a default from `constants`, so a partial JSON document
//! only overrides what it names.

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::enums::SpawnMode;
use crate::error::ConfigError;

/// Stats of an enemy type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyTypeConfig {
    pub id: String,
    pub base_hp: f64,
    /// Meters per second before `SimConfig::enemy_speed_scale`.
    pub base_speed: f64,
    pub reward: u32,
    pub base_damage: f64,
}

/// Stats of a tower type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TowerTypeConfig {
    pub id: String,
    pub damage: f64,
    /// Meters.
    pub range: f64,
    /// Shots per second.
    pub fire_rate: f64,
    pub cost: u32,
}

/// Where towers may stand, in meters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementRules {
    pub street_clearance: f64,
    pub base_clearance: f64,
    pub tower_spacing: f64,
    pub playable_radius: f64,
}

impl Default for PlacementRules {
    fn default() -> Self {
        Self {
            street_clearance: TOWER_STREET_CLEARANCE,
            base_clearance: TOWER_BASE_CLEARANCE,
            tower_spacing: TOWER_SPACING,
            playable_radius: PLAYABLE_RADIUS,
        }
    }
}

/// Configuration for a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// RNG seed for determinism. Same seed = same simulation.
    pub seed: u64,
    pub base_max_health: f64,
    pub starting_credits: u32,
    /// Largest frame delta integrated in one tick (seconds).
    pub max_frame_dt: f64,
    pub enemy_speed_scale: f64,
    pub projectile_speed: f64,
    pub projectile_hit_epsilon: f64,
    pub audio_budget: usize,
    pub wave_reward_base: u32,
    pub wave_reward_growth: u32,
    pub placement: PlacementRules,
    pub enemy_types: Vec<EnemyTypeConfig>,
    pub tower_types: Vec<TowerTypeConfig>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            base_max_health: BASE_MAX_HEALTH,
            starting_credits: STARTING_CREDITS,
            max_frame_dt: MAX_FRAME_DT,
            enemy_speed_scale: ENEMY_SPEED_SCALE,
            projectile_speed: PROJECTILE_SPEED,
            projectile_hit_epsilon: PROJECTILE_HIT_EPSILON,
            audio_budget: AUDIO_SOUND_BUDGET,
            wave_reward_base: WAVE_REWARD_BASE,
            wave_reward_growth: WAVE_REWARD_GROWTH,
            placement: PlacementRules::default(),
            enemy_types: vec![
                EnemyTypeConfig {
                    id: "scout".into(),
                    base_hp: 60.0,
                    base_speed: 8.0,
                    reward: 5,
                    base_damage: 5.0,
                },
                EnemyTypeConfig {
                    id: "grunt".into(),
                    base_hp: 100.0,
                    base_speed: 5.0,
                    reward: 10,
                    base_damage: 10.0,
                },
                EnemyTypeConfig {
                    id: "tank".into(),
                    base_hp: 400.0,
                    base_speed: 3.0,
                    reward: 30,
                    base_damage: 25.0,
                },
            ],
            tower_types: vec![
                TowerTypeConfig {
                    id: "cannon".into(),
                    damage: 30.0,
                    range: 60.0,
                    fire_rate: 1.0,
                    cost: 50,
                },
                TowerTypeConfig {
                    id: "gatling".into(),
                    damage: 8.0,
                    range: 40.0,
                    fire_rate: 5.0,
                    cost: 80,
                },
            ],
        }
    }
}

impl SimConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_max_health > 0.0) {
            return Err(ConfigError::Invalid("base_max_health must be positive".into()));
        }
        if !(self.max_frame_dt > 0.0) {
            return Err(ConfigError::Invalid("max_frame_dt must be positive".into()));
        }
        if !(self.projectile_speed > 0.0) {
            return Err(ConfigError::Invalid("projectile_speed must be positive".into()));
        }
        if self.projectile_hit_epsilon < 0.0 {
            return Err(ConfigError::Invalid(
                "projectile_hit_epsilon must not be negative".into(),
            ));
        }
        for enemy in &self.enemy_types {
            if !(enemy.base_hp > 0.0) || enemy.base_speed < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "enemy type '{}' needs positive hp and non-negative speed",
                    enemy.id
                )));
            }
        }
        for tower in &self.tower_types {
            if !(tower.fire_rate > 0.0) || tower.range < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "tower type '{}' needs a positive fire rate and non-negative range",
                    tower.id
                )));
            }
        }
        Ok(())
    }

    pub fn enemy_type(&self, id: &str) -> Option<&EnemyTypeConfig> {
        self.enemy_types.iter().find(|e| e.id == id)
    }

    pub fn tower_type(&self, id: &str) -> Option<&TowerTypeConfig> {
        self.tower_types.iter().find(|t| t.id == id)
    }

    /// Credits granted for completing wave number `wave` (1-based).
    pub fn wave_reward(&self, wave: u32) -> u32 {
        self.wave_reward_base + self.wave_reward_growth * wave.saturating_sub(1)
    }
}

/// Parameters of a single wave, supplied by `start_wave`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveConfig {
    pub enemy_type_id: String,
    pub count: u32,
    /// Speed override in m/s; `None` uses the type's scaled base speed.
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub spawn_mode: SpawnMode,
    /// Delay between consecutive spawns.
    #[serde(default)]
    pub spawn_delay_ms: u64,
    /// Hold every enemy at its spawn point until the whole batch exists.
    #[serde(default)]
    pub gathering: bool,
}

impl WaveConfig {
    pub fn new(enemy_type_id: impl Into<String>, count: u32) -> Self {
        Self {
            enemy_type_id: enemy_type_id.into(),
            count,
            speed: None,
            spawn_mode: SpawnMode::Distributed,
            spawn_delay_ms: 0,
            gathering: false,
        }
    }
}
