//! Per-spawn route cache with replace-on-completion publishing.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use towerline_core::{GeoPosition, Path, PathError, SpawnId};

/// Handle for one in-flight route build.
///
/// Only the most recently issued ticket for a spawn may publish; a slower
/// build started earlier is dropped when it finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildTicket {
    pub spawn: SpawnId,
    epoch: u64,
}

/// Cached paths keyed by spawn id. Paths are shared read-only with every
/// enemy following them.
#[derive(Debug, Default, Clone)]
pub struct RouteCache {
    paths: HashMap<SpawnId, Arc<Path>>,
    latest: HashMap<SpawnId, u64>,
    next_epoch: u64,
}

impl RouteCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a build for `spawn`, superseding any build still running for it.
    pub fn begin_build(&mut self, spawn: SpawnId) -> BuildTicket {
        self.next_epoch += 1;
        self.latest.insert(spawn, self.next_epoch);
        BuildTicket {
            spawn,
            epoch: self.next_epoch,
        }
    }

    /// Publish a finished build. Returns `false` (and leaves the cache as is)
    /// when the ticket was superseded.
    pub fn publish(&mut self, ticket: BuildTicket, path: Path) -> bool {
        if self.latest.get(&ticket.spawn) != Some(&ticket.epoch) {
            tracing::debug!(spawn = %ticket.spawn, "discarding superseded route build");
            return false;
        }
        self.latest.remove(&ticket.spawn);
        self.paths.insert(ticket.spawn, Arc::new(path));
        true
    }

    /// Swap in a wholly rebuilt map. Outstanding tickets become stale.
    pub fn replace_all(&mut self, paths: HashMap<SpawnId, Path>) {
        self.latest.clear();
        self.paths = paths
            .into_iter()
            .map(|(spawn, path)| (spawn, Arc::new(path)))
            .collect();
    }

    pub fn get(&self, spawn: SpawnId) -> Option<Arc<Path>> {
        self.paths.get(&spawn).cloned()
    }

    pub fn contains(&self, spawn: SpawnId) -> bool {
        self.paths.contains_key(&spawn)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SpawnId, &Arc<Path>)> {
        self.paths.iter().map(|(spawn, path)| (*spawn, path))
    }

    /// Plain waypoint lists in spawn order, for persistence by the caller.
    pub fn to_waypoint_map(&self) -> BTreeMap<SpawnId, Vec<GeoPosition>> {
        self.paths
            .iter()
            .map(|(spawn, path)| (*spawn, path.waypoints().to_vec()))
            .collect()
    }

    pub fn from_waypoint_map(
        map: BTreeMap<SpawnId, Vec<GeoPosition>>,
    ) -> Result<Self, PathError> {
        let mut cache = Self::default();
        for (spawn, waypoints) in map {
            cache.paths.insert(spawn, Arc::new(Path::new(waypoints)?));
        }
        Ok(cache)
    }
}
