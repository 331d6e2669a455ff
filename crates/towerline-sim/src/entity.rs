//! Entity identity and lifecycle on top of the hecs world.
//!
//! An entity's kind fixes its component set (see `world_setup`). Destroying
//! an entity flips `Lifecycle::active` immediately and tears its components
//! down once; the hecs slot itself is only released by the cleanup pass at
//! the end of the tick.

use hecs::{Entity, World};

use towerline_core::components::{Audio, Lifecycle, Movement};
use towerline_core::EntityId;

use crate::bus::EventBus;
use crate::managers::audio::SpatialAudioManager;

pub fn id_of(entity: Entity) -> EntityId {
    EntityId(entity.to_bits().get())
}

pub fn entity_of(id: EntityId) -> Option<Entity> {
    Entity::from_bits(id.0)
}

/// `true` only for a live entity whose lifecycle is still active.
pub fn is_active(world: &World, entity: Entity) -> bool {
    world
        .get::<&Lifecycle>(entity)
        .map(|life| life.active)
        .unwrap_or(false)
}

/// Deactivate `entity` and run component teardown in attachment order.
///
/// Returns `false` if the entity was already inactive or gone, in which
/// case nothing happens.
pub fn destroy(
    world: &World,
    entity: Entity,
    audio: &mut SpatialAudioManager,
    bus: &mut EventBus,
) -> bool {
    match world.get::<&mut Lifecycle>(entity) {
        Ok(mut life) if life.active => life.active = false,
        _ => return false,
    }

    if let Ok(mut movement) = world.get::<&mut Movement>(entity) {
        movement.paused = true;
    }
    if let Ok(mut sound) = world.get::<&mut Audio>(entity) {
        if sound.handle.take().is_some() {
            audio.stop(id_of(entity), bus);
        }
    }
    true
}
