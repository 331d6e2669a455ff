//! ProjectileManager: homing flight toward a live target and hit resolution.

use glam::{DVec2, DVec3};
use hecs::{Entity, World};

use towerline_core::components::{Health, Lifecycle, Projectile, Transform};
use towerline_core::enums::DamageOutcome;
use towerline_core::events::SimEvent;
use towerline_core::GeoPosition;
use towerline_routes::GeoProjection;

use crate::bus::EventBus;
use crate::entity::{destroy, entity_of, id_of, is_active};
use crate::ledger::GameLedger;
use crate::managers::audio::SpatialAudioManager;
use crate::managers::enemy::EnemyManager;
use crate::world_setup;

#[derive(Debug)]
pub struct ProjectileManager {
    speed: f64,
    hit_epsilon: f64,
}

enum Flight {
    Discard,
    Hit { target: Entity, damage: f64 },
    InFlight,
}

impl ProjectileManager {
    pub fn new(speed: f64, hit_epsilon: f64) -> Self {
        Self { speed, hit_epsilon }
    }

    pub fn spawn(
        &self,
        world: &mut World,
        tower: Entity,
        origin: GeoPosition,
        target: Entity,
        damage: f64,
    ) -> Entity {
        world_setup::spawn_projectile(world, tower, origin, target, damage, self.speed)
    }

    /// Fly every projectile one step and resolve hits.
    ///
    /// A projectile whose target is no longer active at the start of the
    /// step is discarded without effect. Hits are applied after all
    /// projectiles have moved; a target killed by an earlier hit in the same
    /// step absorbs nothing further.
    pub fn update(
        &self,
        world: &mut World,
        dt: f64,
        enemies: &EnemyManager,
        ledger: &mut GameLedger,
        audio: &mut SpatialAudioManager,
        bus: &mut EventBus,
    ) {
        let in_flight: Vec<(Entity, Projectile)> = world
            .query::<(&Lifecycle, &Projectile)>()
            .iter()
            .filter(|(_, (life, _))| life.active)
            .map(|(entity, (_, projectile))| (entity, *projectile))
            .collect();

        let mut outcomes: Vec<(Entity, Flight)> = Vec::with_capacity(in_flight.len());
        for (entity, projectile) in in_flight {
            let target = match entity_of(projectile.target) {
                Some(target) if is_active(world, target) => target,
                _ => {
                    outcomes.push((entity, Flight::Discard));
                    continue;
                }
            };
            let Ok(target_position) = world.get::<&Transform>(target).map(|t| t.position) else {
                outcomes.push((entity, Flight::Discard));
                continue;
            };
            let Ok(mut transform) = world.get::<&mut Transform>(entity) else {
                continue;
            };

            let step = projectile.speed * dt;
            let flight = if update_towards_target(
                &mut transform.position,
                &target_position,
                step,
                self.hit_epsilon,
            ) {
                Flight::Hit {
                    target,
                    damage: projectile.damage,
                }
            } else {
                Flight::InFlight
            };
            outcomes.push((entity, flight));
        }

        for (projectile, flight) in outcomes {
            match flight {
                Flight::InFlight => {}
                Flight::Discard => {
                    destroy(world, projectile, audio, bus);
                    bus.emit(SimEvent::ProjectileDiscarded {
                        projectile: id_of(projectile),
                    });
                }
                Flight::Hit { target, damage } => {
                    destroy(world, projectile, audio, bus);
                    if !is_active(world, target) {
                        bus.emit(SimEvent::ProjectileDiscarded {
                            projectile: id_of(projectile),
                        });
                        continue;
                    }
                    let (outcome, hp_remaining) = match world.get::<&mut Health>(target) {
                        Ok(mut health) => (health.apply_damage(damage), health.hp),
                        Err(_) => continue,
                    };
                    bus.emit(SimEvent::EnemyHit {
                        entity: id_of(target),
                        damage,
                        hp_remaining,
                    });
                    if outcome == DamageOutcome::Killed {
                        enemies.kill(world, target, ledger, audio, bus);
                    }
                }
            }
        }
    }
}

/// Move `position` up to `step` meters toward `target`.
///
/// Returns `true` when the remaining distance is at or below `epsilon`
/// after the move.
pub fn update_towards_target(
    position: &mut GeoPosition,
    target: &GeoPosition,
    step: f64,
    epsilon: f64,
) -> bool {
    let projection = GeoProjection::centered_on(position);
    let flat = projection.to_local(target);
    let delta = DVec3::new(flat.x, flat.y, target.height - position.height);
    let distance = delta.length();

    if distance <= epsilon {
        return true;
    }
    if step >= distance {
        *position = *target;
        return true;
    }

    let moved = delta * (step.max(0.0) / distance);
    *position = projection.to_geo(DVec2::new(moved.x, moved.y), position.height + moved.z);
    distance - step.max(0.0) <= epsilon
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_reported_on_arrival_tick() {
        let target = GeoPosition::flat(0.001, 0.0); // ~111.2 m
        let mut position = GeoPosition::flat(0.0, 0.0);
        let mut hits = Vec::new();

        for tick in 0..10 {
            if update_towards_target(&mut position, &target, 20.0, 1.0) {
                hits.push(tick);
                break;
            }
        }
        // 5 steps cover 100 m, the sixth closes the remaining ~11 m.
        assert_eq!(hits, vec![5]);
    }

    #[test]
    fn test_within_epsilon_counts_as_hit() {
        let target = GeoPosition::flat(0.001, 0.0);
        let mut position = GeoPosition::flat(0.001 - 0.5 / 111_194.93, 0.0);
        assert!(update_towards_target(&mut position, &target, 0.0, 1.0));
    }

    #[test]
    fn test_partial_step_moves_toward_target() {
        let target = GeoPosition::new(0.001, 0.0, 50.0);
        let start = GeoPosition::flat(0.0, 0.0);
        let mut position = start;
        assert!(!update_towards_target(&mut position, &target, 10.0, 1.0));
        assert!((start.distance_to(&position) - 10.0).abs() < 0.05);
        assert!(position.distance_to(&target) < start.distance_to(&target));
        assert!(position.height > 0.0);
    }
}
