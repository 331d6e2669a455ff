//! End-of-tick passes over the world.

pub mod cleanup;
pub mod snapshot;
