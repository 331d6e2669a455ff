//! Snapshot system: queries the ECS world and builds a complete GameStateSnapshot.
//!
//! Read-only: never modifies the world.

use hecs::World;

use towerline_core::components::*;
use towerline_core::enums::GamePhase;
use towerline_core::events::SimEvent;
use towerline_core::state::*;
use towerline_core::types::{GeoPosition, SimTime};

use crate::entity::id_of;
use crate::ledger::GameLedger;
use crate::managers::{EnemyManager, WaveManager};

/// Build a complete GameStateSnapshot from the current world state.
#[allow(clippy::too_many_arguments)]
pub fn build_snapshot(
    world: &World,
    time: &SimTime,
    phase: GamePhase,
    waves: &WaveManager,
    enemies: &EnemyManager,
    ledger: &GameLedger,
    base: &GeoPosition,
    events: Vec<SimEvent>,
) -> GameStateSnapshot {
    GameStateSnapshot {
        time: *time,
        phase,
        wave: WaveView {
            number: waves.wave_number(),
            phase: waves.phase(),
            pending_spawns: waves.pending_spawns() as u32,
            enemies_alive: enemies.active_count(world) as u32,
        },
        base: BaseView {
            position: *base,
            health: ledger.base_health,
            max_health: ledger.max_base_health,
        },
        credits: ledger.credits,
        enemies: build_enemies(world),
        towers: build_towers(world),
        projectiles: build_projectiles(world),
        events,
    }
}

fn build_enemies(world: &World) -> Vec<EnemyView> {
    let mut views: Vec<EnemyView> = world
        .query::<(&Lifecycle, &Transform, &Health, &Enemy)>()
        .iter()
        .filter(|(_, (life, ..))| life.active)
        .map(|(entity, (_, transform, health, enemy))| EnemyView {
            id: id_of(entity),
            type_id: enemy.type_id.clone(),
            position: transform.position,
            heading: transform.heading,
            health_percent: health.percent(),
        })
        .collect();

    views.sort_by_key(|v| v.id);
    views
}

fn build_towers(world: &World) -> Vec<TowerView> {
    let mut views: Vec<TowerView> = world
        .query::<(&Lifecycle, &Transform, &Combat, &Tower)>()
        .iter()
        .filter(|(_, (life, ..))| life.active)
        .map(|(entity, (_, transform, combat, tower))| TowerView {
            id: id_of(entity),
            type_id: tower.type_id.clone(),
            position: transform.position,
            heading: transform.heading,
            target: tower.target,
            cooldown: combat.cooldown,
        })
        .collect();

    views.sort_by_key(|v| v.id);
    views
}

fn build_projectiles(world: &World) -> Vec<ProjectileView> {
    let mut views: Vec<ProjectileView> = world
        .query::<(&Lifecycle, &Transform, &Projectile)>()
        .iter()
        .filter(|(_, (life, ..))| life.active)
        .map(|(entity, (_, transform, projectile))| ProjectileView {
            id: id_of(entity),
            position: transform.position,
            target: projectile.target,
        })
        .collect();

    views.sort_by_key(|v| v.id);
    views
}
