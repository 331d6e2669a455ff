//! Cleanup system: releases entities that were destroyed during the tick.

use hecs::{Entity, World};

use towerline_core::components::Lifecycle;

/// Despawn every inactive entity. Uses a pre-allocated buffer to avoid
/// per-tick allocation. Returns how many were removed.
pub fn run(world: &mut World, despawn_buffer: &mut Vec<Entity>) -> usize {
    despawn_buffer.clear();

    for (entity, life) in world.query_mut::<&Lifecycle>() {
        if !life.active {
            despawn_buffer.push(entity);
        }
    }

    let removed = despawn_buffer.len();
    for entity in despawn_buffer.drain(..) {
        let _ = world.despawn(entity);
    }
    removed
}
