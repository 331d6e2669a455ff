//! Base health and credits: the global state the UI observes.

use towerline_core::config::SimConfig;

use crate::error::PlacementError;

#[derive(Debug, Clone, PartialEq)]
pub struct GameLedger {
    pub base_health: f64,
    pub max_base_health: f64,
    pub credits: u32,
}

impl GameLedger {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            base_health: config.base_max_health,
            max_base_health: config.base_max_health,
            credits: config.starting_credits,
        }
    }

    /// Apply damage to the base. Returns the remaining health.
    pub fn damage_base(&mut self, amount: f64) -> f64 {
        self.base_health = (self.base_health - amount.max(0.0)).clamp(0.0, self.max_base_health);
        self.base_health
    }

    pub fn base_destroyed(&self) -> bool {
        self.base_health <= 0.0
    }

    pub fn credit(&mut self, amount: u32) {
        self.credits = self.credits.saturating_add(amount);
    }

    pub fn can_afford(&self, cost: u32) -> Result<(), PlacementError> {
        if self.credits < cost {
            return Err(PlacementError::InsufficientCredits {
                cost,
                have: self.credits,
            });
        }
        Ok(())
    }

    pub fn spend(&mut self, cost: u32) -> Result<(), PlacementError> {
        self.can_afford(cost)?;
        self.credits -= cost;
        Ok(())
    }
}
