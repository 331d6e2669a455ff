//! Spatial audio budget.
//!
//! At most `budget` per-entity sounds play at once. A request from an
//! entity that already holds a slot replaces its sound in place. When the
//! budget is full, the oldest slot whose priority does not exceed the
//! request is evicted; if there is none, the request is denied.

use hecs::{Entity, World};

use towerline_core::components::{Audio, Transform};
use towerline_core::enums::SoundKind;
use towerline_core::events::{AudioCommand, SimEvent};
use towerline_core::{EntityId, GeoPosition};

use crate::bus::EventBus;
use crate::entity::{id_of, is_active};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Slot {
    entity: EntityId,
    handle: u64,
    kind: SoundKind,
    /// Start order; lower is older.
    started: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    Started { handle: u64 },
    Replaced { handle: u64, previous: u64 },
    Evicted { handle: u64, evicted: EntityId },
    Denied,
}

impl PlayOutcome {
    pub fn handle(&self) -> Option<u64> {
        match *self {
            PlayOutcome::Started { handle }
            | PlayOutcome::Replaced { handle, .. }
            | PlayOutcome::Evicted { handle, .. } => Some(handle),
            PlayOutcome::Denied => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpatialAudioManager {
    budget: usize,
    slots: Vec<Slot>,
    next_handle: u64,
    next_start: u64,
}

impl SpatialAudioManager {
    pub fn new(budget: usize) -> Self {
        Self {
            budget,
            slots: Vec::with_capacity(budget),
            next_handle: 1,
            next_start: 0,
        }
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn active_count(&self) -> usize {
        self.slots.len()
    }

    pub fn handle_of(&self, entity: EntityId) -> Option<u64> {
        self.slots
            .iter()
            .find(|s| s.entity == entity)
            .map(|s| s.handle)
    }

    /// Request a sound for `entity`. Never fails; see [`PlayOutcome`].
    pub fn play(
        &mut self,
        entity: EntityId,
        kind: SoundKind,
        position: GeoPosition,
        bus: &mut EventBus,
    ) -> PlayOutcome {
        let handle = self.next_handle;
        let started = self.next_start;

        let outcome = if let Some(i) = self.slots.iter().position(|s| s.entity == entity) {
            let previous = self.slots[i].handle;
            bus.emit(SimEvent::Audio(AudioCommand::Stop {
                entity,
                handle: previous,
            }));
            self.slots[i] = Slot {
                entity,
                handle,
                kind,
                started,
            };
            PlayOutcome::Replaced { handle, previous }
        } else if self.slots.len() < self.budget {
            self.slots.push(Slot {
                entity,
                handle,
                kind,
                started,
            });
            PlayOutcome::Started { handle }
        } else {
            let victim = self
                .slots
                .iter()
                .enumerate()
                .filter(|(_, s)| s.kind <= kind)
                .min_by_key(|(_, s)| s.started)
                .map(|(i, _)| i);
            let Some(i) = victim else {
                return PlayOutcome::Denied;
            };
            let evicted = self.slots[i];
            bus.emit(SimEvent::Audio(AudioCommand::Stop {
                entity: evicted.entity,
                handle: evicted.handle,
            }));
            self.slots[i] = Slot {
                entity,
                handle,
                kind,
                started,
            };
            PlayOutcome::Evicted {
                handle,
                evicted: evicted.entity,
            }
        };

        self.next_handle += 1;
        self.next_start += 1;
        bus.emit(SimEvent::Audio(AudioCommand::Play {
            entity,
            handle,
            sound: kind,
            position,
        }));
        outcome
    }

    /// Release the slot held by `entity`. Idempotent.
    pub fn stop(&mut self, entity: EntityId, bus: &mut EventBus) -> bool {
        let Some(i) = self.slots.iter().position(|s| s.entity == entity) else {
            return false;
        };
        let slot = self.slots.remove(i);
        bus.emit(SimEvent::Audio(AudioCommand::Stop {
            entity,
            handle: slot.handle,
        }));
        true
    }

    /// A sound ended on its own. Frees the slot only if `handle` is still current.
    pub fn finished(&mut self, entity: EntityId, handle: u64) -> bool {
        let before = self.slots.len();
        self.slots
            .retain(|s| !(s.entity == entity && s.handle == handle));
        self.slots.len() != before
    }

    /// Stop everything.
    pub fn clear(&mut self, bus: &mut EventBus) {
        for slot in self.slots.drain(..) {
            bus.emit(SimEvent::Audio(AudioCommand::Stop {
                entity: slot.entity,
                handle: slot.handle,
            }));
        }
    }

    /// Play a sound at an entity's position and keep its `Audio` component
    /// in sync, including clearing the handle of an evicted entity.
    pub fn play_for(
        &mut self,
        world: &World,
        entity: Entity,
        kind: SoundKind,
        bus: &mut EventBus,
    ) -> PlayOutcome {
        let Ok(position) = world.get::<&Transform>(entity).map(|t| t.position) else {
            return PlayOutcome::Denied;
        };
        let outcome = self.play(id_of(entity), kind, position, bus);

        if let PlayOutcome::Evicted { evicted, .. } = outcome {
            if let Some(victim) = crate::entity::entity_of(evicted) {
                if let Ok(mut sound) = world.get::<&mut Audio>(victim) {
                    sound.handle = None;
                }
            }
        }
        if let (Some(handle), Ok(mut sound)) = (outcome.handle(), world.get::<&mut Audio>(entity)) {
            sound.handle = Some(handle);
        }
        outcome
    }

    /// React to this tick's combat events: movement loops for new enemies,
    /// impacts on hits, and a death sound for each kill.
    pub fn observe(&mut self, world: &World, bus: &mut EventBus) {
        let requests: Vec<(EntityId, SoundKind)> = bus
            .pending()
            .iter()
            .filter_map(|event| match event {
                SimEvent::EnemySpawned { entity, .. } => Some((*entity, SoundKind::Movement)),
                SimEvent::EnemyHit { entity, .. } => Some((*entity, SoundKind::Impact)),
                SimEvent::EnemyKilled { entity, .. } => Some((*entity, SoundKind::Death)),
                _ => None,
            })
            .collect();

        for (id, kind) in requests {
            let Some(entity) = crate::entity::entity_of(id) else {
                continue;
            };
            match kind {
                // Death sounds outlive the entity; its slot is freed by
                // `finished` or eviction.
                SoundKind::Death => {
                    if let Ok(position) = world.get::<&Transform>(entity).map(|t| t.position) {
                        self.play(id, kind, position, bus);
                    }
                }
                _ if is_active(world, entity) => {
                    self.play_for(world, entity, kind, bus);
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at() -> GeoPosition {
        GeoPosition::flat(0.0, 0.0)
    }

    fn plays(bus: &mut EventBus) -> usize {
        bus.dispatch()
            .iter()
            .filter(|e| matches!(e, SimEvent::Audio(AudioCommand::Play { .. })))
            .count()
    }

    #[test]
    fn test_budget_never_exceeded() {
        let mut audio = SpatialAudioManager::new(12);
        let mut bus = EventBus::new();
        for i in 0..40 {
            audio.play(EntityId(i), SoundKind::Movement, at(), &mut bus);
            assert!(audio.active_count() <= 12);
        }
        assert_eq!(audio.active_count(), 12);
    }

    #[test]
    fn test_replay_replaces_slot() {
        let mut audio = SpatialAudioManager::new(12);
        let mut bus = EventBus::new();
        let first = audio.play(EntityId(1), SoundKind::Movement, at(), &mut bus);
        let second = audio.play(EntityId(1), SoundKind::Impact, at(), &mut bus);

        assert_eq!(audio.active_count(), 1);
        assert_eq!(
            second,
            PlayOutcome::Replaced {
                handle: second.handle().unwrap(),
                previous: first.handle().unwrap(),
            }
        );
        assert_eq!(audio.handle_of(EntityId(1)), second.handle());
    }

    #[test]
    fn test_eviction_takes_oldest_of_lower_or_equal_priority() {
        let mut audio = SpatialAudioManager::new(3);
        let mut bus = EventBus::new();
        audio.play(EntityId(1), SoundKind::Death, at(), &mut bus);
        audio.play(EntityId(2), SoundKind::Movement, at(), &mut bus);
        audio.play(EntityId(3), SoundKind::Movement, at(), &mut bus);

        let outcome = audio.play(EntityId(4), SoundKind::Impact, at(), &mut bus);
        assert!(matches!(
            outcome,
            PlayOutcome::Evicted {
                evicted: EntityId(2),
                ..
            }
        ));
        assert!(audio.handle_of(EntityId(1)).is_some());
        assert!(audio.handle_of(EntityId(2)).is_none());
    }

    #[test]
    fn test_denied_when_all_slots_outrank_request() {
        let mut audio = SpatialAudioManager::new(2);
        let mut bus = EventBus::new();
        audio.play(EntityId(1), SoundKind::Death, at(), &mut bus);
        audio.play(EntityId(2), SoundKind::Impact, at(), &mut bus);
        bus.dispatch();

        let outcome = audio.play(EntityId(3), SoundKind::Movement, at(), &mut bus);
        assert_eq!(outcome, PlayOutcome::Denied);
        assert_eq!(plays(&mut bus), 0);
        assert_eq!(audio.active_count(), 2);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut audio = SpatialAudioManager::new(12);
        let mut bus = EventBus::new();
        audio.play(EntityId(5), SoundKind::Movement, at(), &mut bus);
        assert!(audio.stop(EntityId(5), &mut bus));
        assert!(!audio.stop(EntityId(5), &mut bus));
        assert_eq!(audio.active_count(), 0);
    }

    #[test]
    fn test_finished_ignores_stale_handle() {
        let mut audio = SpatialAudioManager::new(12);
        let mut bus = EventBus::new();
        let old = audio.play(EntityId(5), SoundKind::Movement, at(), &mut bus);
        audio.play(EntityId(5), SoundKind::Impact, at(), &mut bus);

        assert!(!audio.finished(EntityId(5), old.handle().unwrap()));
        assert_eq!(audio.active_count(), 1);
    }
}
