//! Simulation orchestrator.
//!
//! `GameStateManager` owns the hecs world and every manager, runs them in a
//! fixed order each tick, and produces `GameStateSnapshot`s. Completely
//! headless, enabling deterministic testing.
//!
//! Tick order:
//! 1. async completions
//! 2. enemy movement and base arrivals
//! 3. tower targeting and firing
//! 4. projectile flight and hits
//! 5. wave spawns and the completion check
//! 6. spatial audio
//! 7. cleanup of destroyed entities
//!
//! A kill in step 4 is therefore visible to the completion check in step 5
//! of the same tick.

use hecs::{Entity, World};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use towerline_core::components::{Audio, Movement, Transform};
use towerline_core::config::{SimConfig, WaveConfig};
use towerline_core::enums::{GamePhase, SoundKind, WavePhase};
use towerline_core::events::SimEvent;
use towerline_core::state::GameStateSnapshot;
use towerline_core::{EntityId, GeoPosition, SimTime, SpawnId, SpawnPoint};
use towerline_routes::{PathProcessor, RouteCache, RouteConfig, RouteError, StreetGraph, TerrainSampler};

use crate::bus::{EventBus, Listener, ListenerId};
use crate::completions::{Completion, CompletionQueue, CompletionSender, CompletionTicket};
use crate::entity::{entity_of, id_of, is_active};
use crate::error::{PlacementCheck, PlacementError, SimError};
use crate::ledger::GameLedger;
use crate::managers::{EnemyManager, ProjectileManager, SpatialAudioManager, TowerManager, WaveManager};
use crate::systems;

/// Everything fixed for one loaded location.
#[derive(Debug)]
struct Scene {
    graph: StreetGraph,
    base: GeoPosition,
    spawn_points: Vec<SpawnPoint>,
    routes: RouteCache,
}

/// The simulation context. Owns the ECS world and all sim state.
pub struct GameStateManager {
    config: SimConfig,
    world: World,
    time: SimTime,
    phase: GamePhase,
    rng: ChaCha8Rng,
    /// Bumped on every (re)initialization; stale async work is dropped.
    generation: u64,
    last_time: Option<f64>,
    scene: Option<Scene>,
    ledger: GameLedger,
    enemies: EnemyManager,
    towers: TowerManager,
    projectiles: ProjectileManager,
    waves: WaveManager,
    audio: SpatialAudioManager,
    bus: EventBus,
    completions: CompletionQueue,
    despawn_buffer: Vec<Entity>,
}

impl GameStateManager {
    pub fn new(config: SimConfig) -> Self {
        Self {
            world: World::new(),
            time: SimTime::default(),
            phase: GamePhase::default(),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            generation: 0,
            last_time: None,
            scene: None,
            ledger: GameLedger::new(&config),
            enemies: EnemyManager::new(config.enemy_speed_scale),
            towers: TowerManager::new(config.placement.clone()),
            projectiles: ProjectileManager::new(config.projectile_speed, config.projectile_hit_epsilon),
            waves: WaveManager::new(),
            audio: SpatialAudioManager::new(config.audio_budget),
            bus: EventBus::new(),
            completions: CompletionQueue::default(),
            despawn_buffer: Vec::new(),
            config,
        }
    }

    /// Load a location with prebuilt routes and start running.
    /// Replaces any previous location and clears all entities.
    pub fn initialize(
        &mut self,
        graph: StreetGraph,
        base: GeoPosition,
        spawn_points: Vec<SpawnPoint>,
        routes: RouteCache,
    ) {
        for point in &spawn_points {
            if !routes.contains(point.id) {
                self.bus
                    .debug_log(format!("{} has no route; its enemies will not spawn", point.id));
            }
        }
        self.install(graph, base, spawn_points, routes);
    }

    /// Build routes for every spawn point, then initialize. Spawn points
    /// left without a route are returned (and reported as debug logs).
    pub fn initialize_from_graph(
        &mut self,
        graph: StreetGraph,
        base: GeoPosition,
        spawn_points: Vec<SpawnPoint>,
        sampler: &dyn TerrainSampler,
        route_config: RouteConfig,
    ) -> Vec<(SpawnId, RouteError)> {
        let build = PathProcessor::new(&graph, route_config).build_all(&spawn_points, &base, sampler);
        let mut routes = RouteCache::new();
        build.install(&mut routes);

        for route in &build.routes {
            if route.null_samples > 0 {
                self.bus.debug_log(format!(
                    "{}: {} waypoints without terrain, baseline height used",
                    route.spawn, route.null_samples
                ));
            }
        }
        for (spawn, error) in &build.failures {
            self.bus.debug_log(format!("{spawn}: {error}"));
        }

        self.install(graph, base, spawn_points, routes);
        build.failures
    }

    fn install(
        &mut self,
        graph: StreetGraph,
        base: GeoPosition,
        spawn_points: Vec<SpawnPoint>,
        routes: RouteCache,
    ) {
        info!(
            nodes = graph.node_count(),
            spawns = spawn_points.len(),
            routes = routes.len(),
            "simulation initialized"
        );
        self.scene = Some(Scene {
            graph,
            base,
            spawn_points,
            routes,
        });
        self.restart();
    }

    /// Restart the current location from scratch. Listeners stay subscribed.
    pub fn reset(&mut self) {
        if self.scene.is_none() {
            return;
        }
        self.restart();
        self.bus.debug_log("simulation reset");
    }

    fn restart(&mut self) {
        self.audio.clear(&mut self.bus);
        self.world.clear();
        self.despawn_buffer.clear();
        self.time = SimTime::default();
        self.last_time = None;
        self.rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        self.generation += 1;
        self.ledger = GameLedger::new(&self.config);
        self.waves.restart();
        self.phase = GamePhase::Running;
    }

    /// Advance to `current_time` (seconds, any monotonic clock) and return
    /// the resulting snapshot. The step is clamped to `max_frame_dt`; the
    /// first call after (re)initialization does not advance time.
    pub fn update(&mut self, current_time: f64) -> GameStateSnapshot {
        let dt = self.frame_delta(current_time);

        if self.phase == GamePhase::Running {
            self.run_systems(dt);
            self.time.advance(dt);
        }

        let events = self.bus.dispatch();
        let base = self.scene.as_ref().map(|s| s.base).unwrap_or_default();
        systems::snapshot::build_snapshot(
            &self.world,
            &self.time,
            self.phase,
            &self.waves,
            &self.enemies,
            &self.ledger,
            &base,
            events,
        )
    }

    fn frame_delta(&mut self, current_time: f64) -> f64 {
        if !current_time.is_finite() {
            return 0.0;
        }
        let dt = match self.last_time {
            Some(last) => (current_time - last).clamp(0.0, self.config.max_frame_dt),
            None => 0.0,
        };
        self.last_time = Some(current_time);
        dt
    }

    /// Run all managers in order.
    fn run_systems(&mut self, dt: f64) {
        // 1. Async completions
        self.apply_completions();

        // 2. Enemy movement, base arrivals
        self.enemies
            .update(&mut self.world, dt, &mut self.ledger, &mut self.audio, &mut self.bus);

        if self.ledger.base_destroyed() {
            self.game_over();
        } else {
            // 3. Targeting and firing, against this tick's survivors
            let alive = self.enemies.get_alive(&self.world);
            self.towers
                .update(&mut self.world, dt, &alive, &self.projectiles, &mut self.bus);

            // 4. Projectiles and hits
            self.projectiles.update(
                &mut self.world,
                dt,
                &self.enemies,
                &mut self.ledger,
                &mut self.audio,
                &mut self.bus,
            );

            // 5. Wave spawns and completion
            if let Some(scene) = self.scene.as_ref() {
                self.waves.update(
                    &mut self.world,
                    self.time.elapsed_secs + dt,
                    &self.config,
                    &scene.spawn_points,
                    &scene.routes,
                    &self.enemies,
                    &mut self.bus,
                );
            }
            if self.waves.check_wave_complete(&self.world, &self.enemies) {
                self.waves
                    .end_wave(&self.config, &mut self.ledger, &mut self.bus);
            }
        }

        // 6. Audio
        self.audio.observe(&self.world, &mut self.bus);

        // 7. Cleanup
        systems::cleanup::run(&mut self.world, &mut self.despawn_buffer);
    }

    fn game_over(&mut self) {
        self.phase = GamePhase::GameOver;
        self.waves.abort(&self.world, &self.enemies, &mut self.bus);
        let wave = self.waves.wave_number();
        info!(wave, "base destroyed");
        self.bus.emit(SimEvent::GameOver { wave });
    }

    fn apply_completions(&mut self) {
        for (ticket, completion) in self.completions.drain() {
            if ticket.generation != self.generation {
                debug!(entity = %ticket.entity, generation = ticket.generation, "stale completion dropped");
                continue;
            }
            match completion {
                // The slot belongs to the audio budget, not to the entity,
                // so it is released even after the entity is gone.
                Completion::SoundFinished { handle } => {
                    self.audio.finished(ticket.entity, handle);
                }
                Completion::TerrainHeight { height } => {
                    let live = entity_of(ticket.entity).filter(|&e| is_active(&self.world, e));
                    let Some(entity) = live else {
                        debug!(entity = %ticket.entity, "completion for destroyed entity dropped");
                        continue;
                    };
                    // Path followers take their height from the smoothed path.
                    if self.world.get::<&Movement>(entity).is_ok() {
                        debug!(entity = %ticket.entity, "terrain height ignored for path follower");
                        continue;
                    }
                    if let Ok(mut transform) = self.world.get::<&mut Transform>(entity) {
                        if height.is_finite() {
                            transform.position = transform.position.with_height(height);
                        }
                    }
                }
            }
        }
    }

    /// Check a tower site without placing anything.
    pub fn validate_position(&self, position: &GeoPosition) -> PlacementCheck {
        let Some(scene) = self.scene.as_ref() else {
            return PlacementCheck::from(Err::<(), _>(PlacementError::NotInitialized));
        };
        self.towers
            .validate_position(&self.world, &scene.graph, &scene.base, position)
            .into()
    }

    pub fn place_tower(
        &mut self,
        position: GeoPosition,
        type_id: &str,
    ) -> Result<EntityId, PlacementError> {
        let scene = self.scene.as_ref().ok_or(PlacementError::NotInitialized)?;
        let tower_type = self
            .config
            .tower_type(type_id)
            .ok_or_else(|| PlacementError::UnknownTowerType(type_id.to_string()))?;
        let entity = self.towers.place_tower(
            &mut self.world,
            &scene.graph,
            &scene.base,
            &mut self.ledger,
            tower_type,
            position,
            &mut self.bus,
        )?;
        Ok(id_of(entity))
    }

    pub fn start_wave(&mut self, config: WaveConfig) -> Result<u32, SimError> {
        let scene = self.scene.as_ref().ok_or(SimError::NotInitialized)?;
        if self.phase == GamePhase::GameOver {
            return Err(SimError::GameOver);
        }
        self.waves.start_wave(
            config,
            &self.config,
            &scene.spawn_points,
            self.time.elapsed_secs,
            &mut self.rng,
            &mut self.bus,
        )
    }

    /// Cancel remaining spawns of the current wave. Enemies already on the
    /// field keep walking.
    pub fn abort_wave(&mut self) {
        self.waves.abort(&self.world, &self.enemies, &mut self.bus);
    }

    /// Kill every enemy on the field, paying rewards as usual.
    pub fn kill_all(&mut self) -> usize {
        self.enemies
            .kill_all(&self.world, &mut self.ledger, &mut self.audio, &mut self.bus)
    }

    pub fn pause(&mut self) {
        if self.phase == GamePhase::Running {
            self.phase = GamePhase::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.phase == GamePhase::Paused {
            self.phase = GamePhase::Running;
        }
    }

    pub fn subscribe(&mut self, listener: Listener) -> ListenerId {
        self.bus.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// Sending half for async work that completes outside the tick.
    pub fn completion_sender(&self) -> CompletionSender {
        self.completions.sender()
    }

    /// Ticket for async work on behalf of `entity`, if it is active.
    pub fn ticket(&self, entity: EntityId) -> Option<CompletionTicket> {
        let live = entity_of(entity).is_some_and(|e| is_active(&self.world, e));
        live.then_some(CompletionTicket {
            generation: self.generation,
            entity,
        })
    }

    /// Play a sound for an entity under the audio budget.
    pub fn play_sound(&mut self, entity: EntityId, kind: SoundKind) -> bool {
        let Some(e) = entity_of(entity).filter(|&e| is_active(&self.world, e)) else {
            return false;
        };
        self.audio.play_for(&self.world, e, kind, &mut self.bus).handle().is_some()
    }

    /// Release an entity's sound slot. Idempotent.
    pub fn stop_sound(&mut self, entity: EntityId) -> bool {
        if let Some(e) = entity_of(entity) {
            if let Ok(mut sound) = self.world.get::<&mut Audio>(e) {
                sound.handle = None;
            }
        }
        self.audio.stop(entity, &mut self.bus)
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn time(&self) -> SimTime {
        self.time
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn base_health(&self) -> f64 {
        self.ledger.base_health
    }

    pub fn credits(&self) -> u32 {
        self.ledger.credits
    }

    pub fn wave_phase(&self) -> WavePhase {
        self.waves.phase()
    }

    pub fn wave_number(&self) -> u32 {
        self.waves.wave_number()
    }

    pub fn enemy_count(&self) -> usize {
        self.enemies.active_count(&self.world)
    }

    pub fn active_sounds(&self) -> usize {
        self.audio.active_count()
    }

    pub fn routes(&self) -> Option<&RouteCache> {
        self.scene.as_ref().map(|s| &s.routes)
    }

    /// Get a read-only reference to the ECS world.
    pub fn world(&self) -> &World {
        &self.world
    }
}
