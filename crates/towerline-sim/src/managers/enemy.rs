//! EnemyManager: spawning, path following, base arrival and kills.

use std::sync::Arc;

use hecs::{Entity, World};
use tracing::warn;

use towerline_core::components::{Enemy, Health, Lifecycle, Movement, Transform};
use towerline_core::config::EnemyTypeConfig;
use towerline_core::events::SimEvent;
use towerline_core::{GeoPosition, Path, SpawnId};

use crate::bus::EventBus;
use crate::entity::{destroy, id_of, is_active};
use crate::error::SimError;
use crate::ledger::GameLedger;
use crate::managers::audio::SpatialAudioManager;
use crate::world_setup;

/// An enemy towers may target this tick.
#[derive(Debug, Clone, Copy)]
pub struct AliveEnemy {
    pub entity: Entity,
    pub position: GeoPosition,
}

#[derive(Debug)]
pub struct EnemyManager {
    speed_scale: f64,
    reached_buffer: Vec<Entity>,
}

impl EnemyManager {
    pub fn new(speed_scale: f64) -> Self {
        Self {
            speed_scale,
            reached_buffer: Vec::new(),
        }
    }

    /// Spawn an enemy on a shared path. `speed_override` replaces the type's
    /// base speed; the global speed scale applies either way.
    #[allow(clippy::too_many_arguments)]
    pub fn spawn(
        &self,
        world: &mut World,
        path: Arc<Path>,
        enemy_type: &EnemyTypeConfig,
        speed_override: Option<f64>,
        paused: bool,
        spawn: SpawnId,
        bus: &mut EventBus,
    ) -> Entity {
        let speed = speed_override.unwrap_or(enemy_type.base_speed) * self.speed_scale;
        let entity = world_setup::spawn_enemy(world, path, enemy_type, speed, paused);
        bus.emit(SimEvent::EnemySpawned {
            entity: id_of(entity),
            spawn,
            type_id: enemy_type.id.clone(),
        });
        entity
    }

    pub fn start_moving(&self, world: &World, entities: &[Entity]) {
        for &entity in entities {
            if let Ok(mut movement) = world.get::<&mut Movement>(entity) {
                if is_active(world, entity) {
                    movement.paused = false;
                }
            }
        }
    }

    /// Advance every moving enemy and resolve arrivals at the base.
    pub fn update(
        &mut self,
        world: &mut World,
        dt: f64,
        ledger: &mut GameLedger,
        audio: &mut SpatialAudioManager,
        bus: &mut EventBus,
    ) {
        self.reached_buffer.clear();
        let mut failed = Vec::new();

        for (entity, (life, movement, transform)) in
            world.query_mut::<(&Lifecycle, &mut Movement, &mut Transform)>()
        {
            if !life.active || movement.paused {
                continue;
            }
            match step(entity, movement, transform, dt) {
                Ok(true) => self.reached_buffer.push(entity),
                Ok(false) => {}
                Err(e) => failed.push((entity, e)),
            }
        }

        for (entity, error) in failed {
            warn!(entity = %id_of(entity), %error, "removing enemy");
            bus.debug_log(format!("removing enemy {}: {error}", id_of(entity)));
            destroy(world, entity, audio, bus);
        }

        for &entity in &self.reached_buffer {
            let damage = world
                .get::<&Enemy>(entity)
                .map(|e| e.base_damage)
                .unwrap_or(0.0);
            if !destroy(world, entity, audio, bus) {
                continue;
            }
            bus.emit(SimEvent::EnemyReachedBase {
                entity: id_of(entity),
                damage,
            });
            let health_remaining = ledger.damage_base(damage);
            bus.emit(SimEvent::BaseDamaged {
                damage,
                health_remaining,
            });
        }
    }

    /// Kill an enemy and pay its reward. Only the first call for a given
    /// enemy has any effect.
    pub fn kill(
        &self,
        world: &World,
        entity: Entity,
        ledger: &mut GameLedger,
        audio: &mut SpatialAudioManager,
        bus: &mut EventBus,
    ) -> bool {
        let Ok(reward) = world.get::<&Enemy>(entity).map(|e| e.reward) else {
            return false;
        };
        if !is_active(world, entity) {
            return false;
        }
        if let Ok(mut health) = world.get::<&mut Health>(entity) {
            health.deplete();
        }
        if !destroy(world, entity, audio, bus) {
            return false;
        }
        ledger.credit(reward);
        bus.emit(SimEvent::EnemyKilled {
            entity: id_of(entity),
            reward,
        });
        true
    }

    /// Kill every active enemy. Returns how many died.
    pub fn kill_all(
        &self,
        world: &World,
        ledger: &mut GameLedger,
        audio: &mut SpatialAudioManager,
        bus: &mut EventBus,
    ) -> usize {
        let targets: Vec<Entity> = world
            .query::<(&Lifecycle, &Enemy)>()
            .iter()
            .filter(|(_, (life, _))| life.active)
            .map(|(entity, _)| entity)
            .collect();
        targets
            .into_iter()
            .filter(|&entity| self.kill(world, entity, ledger, audio, bus))
            .count()
    }

    /// Active enemies with health left, read from the world as it is now.
    pub fn get_alive(&self, world: &World) -> Vec<AliveEnemy> {
        world
            .query::<(&Lifecycle, &Health, &Transform, &Enemy)>()
            .iter()
            .filter(|(_, (life, health, _, _))| life.active && health.alive())
            .map(|(entity, (_, _, transform, _))| AliveEnemy {
                entity,
                position: transform.position,
            })
            .collect()
    }

    /// Enemies still on the field, whether moving, gathering or dying this tick.
    pub fn active_count(&self, world: &World) -> usize {
        world
            .query::<(&Lifecycle, &Enemy)>()
            .iter()
            .filter(|(_, (life, _))| life.active)
            .count()
    }
}

fn step(
    entity: Entity,
    movement: &mut Movement,
    transform: &mut Transform,
    dt: f64,
) -> Result<bool, SimError> {
    let distance = movement.speed * dt;
    if !distance.is_finite() || distance < 0.0 {
        return Err(SimError::InvalidEntity {
            entity: id_of(entity),
            reason: format!("bad movement step {distance}"),
        });
    }

    let reached = advance(movement, distance);
    let (position, heading) =
        position_on_path(&movement.path, movement.current_index, movement.segment_progress);
    transform.position = position;
    transform.heading = heading;
    Ok(reached)
}

/// Move `distance` meters further along the path. Returns `true` once the
/// final waypoint is reached.
pub fn advance(movement: &mut Movement, distance: f64) -> bool {
    let path = &movement.path;
    let last = path.last_index();
    movement.distance_travelled = (movement.distance_travelled + distance.max(0.0)).min(path.length());

    while movement.current_index < last
        && movement.distance_travelled >= path.distance_at(movement.current_index + 1)
    {
        movement.current_index += 1;
    }

    movement.segment_progress = if movement.current_index >= last {
        0.0
    } else {
        let segment = path.segment_length(movement.current_index);
        if segment > 0.0 {
            ((movement.distance_travelled - path.distance_at(movement.current_index)) / segment)
                .clamp(0.0, 1.0)
        } else {
            0.0
        }
    };

    movement.current_index >= last
}

/// Interpolated position and heading at progress `t` within segment `index`.
/// An index at the final waypoint yields the final waypoint.
pub fn position_on_path(path: &Path, index: usize, t: f64) -> (GeoPosition, f64) {
    let waypoints = path.waypoints();
    let last = path.last_index();
    let segment = index.min(last - 1);
    let (a, b) = (&waypoints[segment], &waypoints[segment + 1]);
    let t = if index >= last { 1.0 } else { t };

    let position = if t <= 0.0 {
        *a
    } else if t >= 1.0 {
        *b
    } else {
        a.lerp(b, t)
    };
    (position, a.bearing_to(b))
}
