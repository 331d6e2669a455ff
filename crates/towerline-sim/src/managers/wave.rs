//! WaveManager: `Setup -> Active -> Complete -> Setup`.
//!
//! Spawns are pulled from a time-ordered queue each tick rather than
//! scheduled as timers. Aborting clears the queue and raises a flag the
//! queue checks before handing out anything, so no spawn can happen after
//! an abort.

use std::collections::VecDeque;

use hecs::{Entity, World};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

use towerline_core::config::{SimConfig, WaveConfig};
use towerline_core::enums::{SpawnMode, WavePhase};
use towerline_core::events::SimEvent;
use towerline_core::SpawnPoint;
use towerline_routes::RouteCache;

use crate::bus::EventBus;
use crate::error::SimError;
use crate::ledger::GameLedger;
use crate::managers::enemy::EnemyManager;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingSpawn {
    /// Simulation time (seconds) at which the spawn is due.
    pub due: f64,
    /// Index into the spawn point list.
    pub spawn_index: usize,
}

/// Time-ordered queue of pending spawns.
#[derive(Debug, Default, Clone)]
pub struct SpawnScheduler {
    queue: VecDeque<PendingSpawn>,
    aborted: bool,
}

impl SpawnScheduler {
    /// Replace the queue. Entries must be sorted by `due`.
    pub fn schedule(&mut self, spawns: impl IntoIterator<Item = PendingSpawn>) {
        self.queue = spawns.into_iter().collect();
        self.aborted = false;
    }

    /// Pop every spawn due at or before `now`. Nothing once aborted.
    pub fn due(&mut self, now: f64) -> Vec<PendingSpawn> {
        let mut out = Vec::new();
        while !self.aborted {
            match self.queue.front() {
                Some(next) if next.due <= now => {
                    if let Some(spawn) = self.queue.pop_front() {
                        out.push(spawn);
                    }
                }
                _ => break,
            }
        }
        out
    }

    pub fn abort(&mut self) {
        self.aborted = true;
        self.queue.clear();
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.aborted = false;
    }
}

/// Spawn point index for each of `count` enemies over `points` spawn points.
///
/// Distributed mode deals round-robin, so every point gets `count / points`
/// or one more. Random mode draws each assignment independently.
pub fn assign_spawn_points(
    count: u32,
    points: usize,
    mode: SpawnMode,
    rng: &mut ChaCha8Rng,
) -> Vec<usize> {
    if points == 0 {
        return Vec::new();
    }
    (0..count as usize)
        .map(|i| match mode {
            SpawnMode::Distributed => i % points,
            SpawnMode::Random => rng.gen_range(0..points),
        })
        .collect()
}

#[derive(Debug, Default)]
pub struct WaveManager {
    phase: WavePhase,
    wave_number: u32,
    config: Option<WaveConfig>,
    scheduler: SpawnScheduler,
    /// Gathering batch waiting to start moving together.
    batch: Vec<Entity>,
    spawned: u32,
    skipped: u32,
}

impl WaveManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> WavePhase {
        self.phase
    }

    pub fn wave_number(&self) -> u32 {
        self.wave_number
    }

    pub fn pending_spawns(&self) -> usize {
        self.scheduler.len()
    }

    pub fn spawned(&self) -> u32 {
        self.spawned
    }

    /// Spawns dropped because their spawn point has no route.
    pub fn skipped(&self) -> u32 {
        self.skipped
    }

    pub fn is_aborted(&self) -> bool {
        self.scheduler.is_aborted()
    }

    /// Queue a new wave starting at `now`. Accepted from `Setup`, and from
    /// `Complete` after an implicit reset.
    pub fn start_wave(
        &mut self,
        config: WaveConfig,
        sim: &SimConfig,
        spawn_points: &[SpawnPoint],
        now: f64,
        rng: &mut ChaCha8Rng,
        bus: &mut EventBus,
    ) -> Result<u32, SimError> {
        match self.phase {
            WavePhase::Active => return Err(SimError::WaveInProgress),
            WavePhase::Complete => self.reset(),
            WavePhase::Setup => {}
        }
        if sim.enemy_type(&config.enemy_type_id).is_none() {
            return Err(SimError::UnknownEnemyType(config.enemy_type_id));
        }
        if spawn_points.is_empty() {
            return Err(SimError::NoSpawnPoints);
        }

        let delay = config.spawn_delay_ms as f64 / 1000.0;
        let assignments = assign_spawn_points(config.count, spawn_points.len(), config.spawn_mode, rng);
        self.scheduler.schedule(
            assignments
                .into_iter()
                .enumerate()
                .map(|(i, spawn_index)| PendingSpawn {
                    due: now + i as f64 * delay,
                    spawn_index,
                }),
        );

        self.wave_number += 1;
        self.phase = WavePhase::Active;
        self.batch.clear();
        self.spawned = 0;
        self.skipped = 0;
        info!(wave = self.wave_number, count = config.count, mode = ?config.spawn_mode, "wave started");
        bus.emit(SimEvent::WaveStarted {
            wave: self.wave_number,
            enemy_count: config.count,
        });
        self.config = Some(config);
        Ok(self.wave_number)
    }

    /// Produce the spawns that are due. Spawns whose point has no cached
    /// route are skipped and reported.
    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &mut self,
        world: &mut World,
        now: f64,
        sim: &SimConfig,
        spawn_points: &[SpawnPoint],
        routes: &RouteCache,
        enemies: &EnemyManager,
        bus: &mut EventBus,
    ) {
        if self.phase != WavePhase::Active {
            return;
        }
        let Some(config) = self.config.as_ref() else {
            return;
        };
        let Some(enemy_type) = sim.enemy_type(&config.enemy_type_id) else {
            return;
        };

        for pending in self.scheduler.due(now) {
            let Some(point) = spawn_points.get(pending.spawn_index) else {
                self.skipped += 1;
                continue;
            };
            let Some(path) = routes.get(point.id) else {
                self.skipped += 1;
                bus.debug_log(format!("{} has no route, spawn skipped", point.id));
                continue;
            };
            let entity = enemies.spawn(
                world,
                path,
                enemy_type,
                config.speed,
                config.gathering,
                point.id,
                bus,
            );
            self.spawned += 1;
            if config.gathering {
                self.batch.push(entity);
            }
        }

        if config.gathering && self.scheduler.is_empty() && !self.batch.is_empty() {
            enemies.start_moving(world, &self.batch);
            self.batch.clear();
        }
    }

    /// `true` when nothing is left to spawn and no enemy is on the field.
    /// Reads live world state on every call.
    pub fn check_wave_complete(&self, world: &World, enemies: &EnemyManager) -> bool {
        self.phase == WavePhase::Active
            && self.scheduler.is_empty()
            && enemies.active_count(world) == 0
    }

    /// `Active -> Complete`, paying the end-of-wave reward.
    pub fn end_wave(&mut self, sim: &SimConfig, ledger: &mut GameLedger, bus: &mut EventBus) {
        if self.phase != WavePhase::Active {
            return;
        }
        self.phase = WavePhase::Complete;
        let reward = sim.wave_reward(self.wave_number);
        ledger.credit(reward);
        info!(wave = self.wave_number, reward, "wave complete");
        bus.emit(SimEvent::WaveCompleted {
            wave: self.wave_number,
            reward,
        });
    }

    /// Stop all pending spawns. The wave ends without a reward. A gathering
    /// batch that was still held at its spawn points starts walking.
    pub fn abort(&mut self, world: &World, enemies: &EnemyManager, bus: &mut EventBus) {
        self.scheduler.abort();
        if !self.batch.is_empty() {
            enemies.start_moving(world, &self.batch);
            self.batch.clear();
        }
        if self.phase == WavePhase::Active {
            self.phase = WavePhase::Complete;
            bus.emit(SimEvent::WaveAborted {
                wave: self.wave_number,
            });
        }
    }

    /// Back to `Setup`. The wave counter is kept.
    pub fn reset(&mut self) {
        self.phase = WavePhase::Setup;
        self.config = None;
        self.scheduler.clear();
        self.batch.clear();
        self.spawned = 0;
        self.skipped = 0;
    }

    /// Full reset including the wave counter.
    pub fn restart(&mut self) {
        self.reset();
        self.wave_number = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_distributed_is_balanced() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let assignments = assign_spawn_points(10, 3, SpawnMode::Distributed, &mut rng);
        let mut counts = [0u32; 3];
        for i in assignments {
            counts[i] += 1;
        }
        counts.sort_unstable();
        assert_eq!(counts, [3, 3, 4]);
    }

    #[test]
    fn test_distributed_bounds_hold_for_many_sizes() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for n in 0..40u32 {
            for k in 1..7usize {
                let mut counts = vec![0u32; k];
                for i in assign_spawn_points(n, k, SpawnMode::Distributed, &mut rng) {
                    counts[i] += 1;
                }
                let floor = n / k as u32;
                let ceil = (n + k as u32 - 1) / k as u32;
                assert!(counts.iter().all(|&c| c == floor || c == ceil), "n={n} k={k} {counts:?}");
                assert_eq!(counts.iter().sum::<u32>(), n);
            }
        }
    }

    #[test]
    fn test_random_assignment_in_range_and_seeded() {
        let mut a = ChaCha8Rng::seed_from_u64(9);
        let mut b = ChaCha8Rng::seed_from_u64(9);
        let first = assign_spawn_points(50, 4, SpawnMode::Random, &mut a);
        let second = assign_spawn_points(50, 4, SpawnMode::Random, &mut b);
        assert_eq!(first, second);
        assert!(first.iter().all(|&i| i < 4));
    }

    #[test]
    fn test_scheduler_releases_by_time() {
        let mut scheduler = SpawnScheduler::default();
        scheduler.schedule((0..4).map(|i| PendingSpawn {
            due: i as f64 * 0.5,
            spawn_index: 0,
        }));

        assert_eq!(scheduler.due(0.0).len(), 1);
        assert_eq!(scheduler.due(0.9).len(), 1);
        assert_eq!(scheduler.due(10.0).len(), 2);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_abort_stops_everything() {
        let mut scheduler = SpawnScheduler::default();
        scheduler.schedule((0..4).map(|i| PendingSpawn {
            due: i as f64,
            spawn_index: 0,
        }));
        scheduler.abort();
        assert!(scheduler.due(100.0).is_empty());
        assert!(scheduler.is_aborted());
    }

    #[test]
    fn test_start_wave_state_transitions() {
        let sim = SimConfig::default();
        let points = vec![SpawnPoint::new(0, towerline_core::GeoPosition::flat(0.0, 0.0))];
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut bus = EventBus::new();
        let mut ledger = GameLedger::new(&sim);
        let mut waves = WaveManager::new();

        assert_eq!(waves.start_wave(WaveConfig::new("grunt", 2), &sim, &points, 0.0, &mut rng, &mut bus), Ok(1));
        assert_eq!(
            waves.start_wave(WaveConfig::new("grunt", 2), &sim, &points, 0.0, &mut rng, &mut bus),
            Err(SimError::WaveInProgress)
        );

        waves.end_wave(&sim, &mut ledger, &mut bus);
        assert_eq!(waves.phase(), WavePhase::Complete);
        assert_eq!(ledger.credits, sim.starting_credits + sim.wave_reward(1));

        assert_eq!(waves.start_wave(WaveConfig::new("grunt", 1), &sim, &points, 0.0, &mut rng, &mut bus), Ok(2));
        assert_eq!(
            waves.start_wave(WaveConfig::new("dragon", 1), &sim, &points, 0.0, &mut rng, &mut bus),
            Err(SimError::WaveInProgress)
        );
    }

    #[test]
    fn test_unknown_enemy_type_rejected() {
        let sim = SimConfig::default();
        let points = vec![SpawnPoint::new(0, towerline_core::GeoPosition::flat(0.0, 0.0))];
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut bus = EventBus::new();
        let mut waves = WaveManager::new();
        assert_eq!(
            waves.start_wave(WaveConfig::new("dragon", 1), &sim, &points, 0.0, &mut rng, &mut bus),
            Err(SimError::UnknownEnemyType("dragon".into()))
        );
        assert_eq!(waves.phase(), WavePhase::Setup);
    }
}
