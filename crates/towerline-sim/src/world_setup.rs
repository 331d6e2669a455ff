//! Entity spawn factories. Each kind gets a fixed component bundle.

use std::sync::Arc;

use hecs::{Entity, World};

use towerline_core::components::*;
use towerline_core::config::{EnemyTypeConfig, TowerTypeConfig};
use towerline_core::enums::EntityKind;
use towerline_core::{GeoPosition, Path};

/// Spawn an enemy at the start of `path`.
pub fn spawn_enemy(
    world: &mut World,
    path: Arc<Path>,
    enemy_type: &EnemyTypeConfig,
    speed: f64,
    paused: bool,
) -> Entity {
    let waypoints = path.waypoints();
    let transform = Transform {
        position: path.start(),
        heading: waypoints[0].bearing_to(&waypoints[1]),
        scale: 1.0,
    };

    world.spawn((
        Lifecycle::new(EntityKind::Enemy),
        transform,
        Health::new(enemy_type.base_hp),
        Movement::new(path, speed, paused),
        Audio::default(),
        Enemy {
            type_id: enemy_type.id.clone(),
            reward: enemy_type.reward,
            base_damage: enemy_type.base_damage,
        },
    ))
}

pub fn spawn_tower(world: &mut World, tower_type: &TowerTypeConfig, position: GeoPosition) -> Entity {
    world.spawn((
        Lifecycle::new(EntityKind::Tower),
        Transform::at(position),
        Combat::new(tower_type.damage, tower_type.range, tower_type.fire_rate),
        Audio::default(),
        Tower {
            type_id: tower_type.id.clone(),
            target: None,
        },
    ))
}

/// Spawn a projectile at `origin` chasing `target`. Damage is fixed at fire time.
pub fn spawn_projectile(
    world: &mut World,
    source: Entity,
    origin: GeoPosition,
    target: Entity,
    damage: f64,
    speed: f64,
) -> Entity {
    world.spawn((
        Lifecycle::new(EntityKind::Projectile),
        Transform::at(origin),
        Projectile {
            source: crate::entity::id_of(source),
            target: crate::entity::id_of(target),
            damage,
            speed,
        },
    ))
}
