//! TowerManager: placement validation, target acquisition and firing.

use hecs::{Entity, World};

use towerline_core::components::{Combat, Lifecycle, Tower, Transform};
use towerline_core::config::{PlacementRules, TowerTypeConfig};
use towerline_core::events::SimEvent;
use towerline_core::GeoPosition;
use towerline_routes::StreetGraph;

use crate::bus::EventBus;
use crate::entity::id_of;
use crate::error::PlacementError;
use crate::ledger::GameLedger;
use crate::managers::enemy::AliveEnemy;
use crate::managers::projectile::ProjectileManager;
use crate::world_setup;

#[derive(Debug)]
pub struct TowerManager {
    rules: PlacementRules,
}

impl TowerManager {
    pub fn new(rules: PlacementRules) -> Self {
        Self { rules }
    }

    /// Check a candidate site against the playable area, the base, the
    /// street network and existing towers.
    pub fn validate_position(
        &self,
        world: &World,
        graph: &StreetGraph,
        base: &GeoPosition,
        position: &GeoPosition,
    ) -> Result<(), PlacementError> {
        if !position.is_finite() {
            return Err(PlacementError::OutOfBounds);
        }
        let to_base = position.haversine_to(base);
        if to_base > self.rules.playable_radius {
            return Err(PlacementError::OutOfBounds);
        }
        if to_base < self.rules.base_clearance {
            return Err(PlacementError::TooCloseToBase {
                distance: to_base,
                required: self.rules.base_clearance,
            });
        }
        if let Some(distance) = graph.distance_to_streets(position) {
            if distance < self.rules.street_clearance {
                return Err(PlacementError::TooCloseToStreet {
                    distance,
                    required: self.rules.street_clearance,
                });
            }
        }
        let nearest_tower = world
            .query::<(&Lifecycle, &Transform, &Tower)>()
            .iter()
            .filter(|(_, (life, _, _))| life.active)
            .map(|(_, (_, transform, _))| transform.position.haversine_to(position))
            .fold(f64::INFINITY, f64::min);
        if nearest_tower < self.rules.tower_spacing {
            return Err(PlacementError::TooCloseToTower {
                distance: nearest_tower,
                required: self.rules.tower_spacing,
            });
        }
        Ok(())
    }

    /// Validate, charge and spawn. An error leaves the world and ledger untouched.
    #[allow(clippy::too_many_arguments)]
    pub fn place_tower(
        &self,
        world: &mut World,
        graph: &StreetGraph,
        base: &GeoPosition,
        ledger: &mut GameLedger,
        tower_type: &TowerTypeConfig,
        position: GeoPosition,
        bus: &mut EventBus,
    ) -> Result<Entity, PlacementError> {
        self.validate_position(world, graph, base, &position)?;
        ledger.spend(tower_type.cost)?;

        let entity = world_setup::spawn_tower(world, tower_type, position);
        bus.emit(SimEvent::TowerPlaced {
            entity: id_of(entity),
            type_id: tower_type.id.clone(),
            position,
        });
        Ok(entity)
    }

    /// Tick cooldowns, re-acquire targets and fire the towers that are ready.
    pub fn update(
        &self,
        world: &mut World,
        dt: f64,
        enemies: &[AliveEnemy],
        projectiles: &ProjectileManager,
        bus: &mut EventBus,
    ) {
        let mut shots: Vec<(Entity, GeoPosition, Entity, f64)> = Vec::new();

        for (entity, (life, transform, combat, tower)) in
            world.query_mut::<(&Lifecycle, &mut Transform, &mut Combat, &mut Tower)>()
        {
            if !life.active {
                continue;
            }
            combat.tick(dt);

            let target = find_target(&transform.position, combat.range, enemies);
            tower.target = target.map(|t| id_of(t.entity));
            let Some(target) = target else {
                continue;
            };
            transform.heading = transform.position.bearing_to(&target.position);

            if combat.ready() {
                combat.cooldown = combat.interval();
                shots.push((entity, transform.position, target.entity, combat.damage));
            }
        }

        for (tower, origin, target, damage) in shots {
            projectiles.spawn(world, tower, origin, target, damage);
            bus.emit(SimEvent::TowerFired {
                tower: id_of(tower),
                target: id_of(target),
            });
        }
    }
}

/// Nearest enemy within `range` of `from`. The first of equally near enemies wins.
pub fn find_target<'a>(
    from: &GeoPosition,
    range: f64,
    enemies: &'a [AliveEnemy],
) -> Option<&'a AliveEnemy> {
    let mut best: Option<(&AliveEnemy, f64)> = None;
    for enemy in enemies {
        let distance = from.distance_to(&enemy.position);
        if distance > range {
            continue;
        }
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((enemy, distance));
        }
    }
    best.map(|(enemy, _)| enemy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enemy_at(world: &mut World, lat: f64) -> AliveEnemy {
        AliveEnemy {
            entity: world.spawn((lat,)),
            position: GeoPosition::flat(lat, 0.0),
        }
    }

    #[test]
    fn test_nearest_in_range_wins() {
        let mut world = World::new();
        // ~55 m, ~22 m and ~111 m north of the tower.
        let enemies = vec![
            enemy_at(&mut world, 0.0005),
            enemy_at(&mut world, 0.0002),
            enemy_at(&mut world, 0.001),
        ];
        let tower = GeoPosition::flat(0.0, 0.0);

        let target = find_target(&tower, 60.0, &enemies).unwrap();
        assert_eq!(target.entity, enemies[1].entity);
        assert!(find_target(&tower, 10.0, &enemies).is_none());
    }

    #[test]
    fn test_out_of_range_enemies_ignored() {
        let mut world = World::new();
        let enemies = vec![enemy_at(&mut world, 0.001)];
        assert!(find_target(&GeoPosition::flat(0.0, 0.0), 100.0, &enemies).is_none());
    }
}
