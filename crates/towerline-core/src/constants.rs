//! Simulation constants and tuning parameters.

/// Mean Earth radius used by haversine distances (meters).
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Largest frame delta the simulation will integrate in one tick (seconds).
pub const MAX_FRAME_DT: f64 = 0.1;

// --- Base & economy ---

/// Base (HQ) hit points at mission start.
pub const BASE_MAX_HEALTH: f64 = 100.0;

/// Credits available at mission start.
pub const STARTING_CREDITS: u32 = 200;

/// Credits granted when a wave ends.
pub const WAVE_REWARD_BASE: u32 = 50;

/// Additional end-of-wave credits per completed wave.
pub const WAVE_REWARD_GROWTH: u32 = 10;

// --- Enemies ---

/// Global multiplier applied to every enemy type's base speed.
pub const ENEMY_SPEED_SCALE: f64 = 1.0;

// --- Projectiles ---

/// Projectile flight speed (m/s).
pub const PROJECTILE_SPEED: f64 = 120.0;

/// Distance under which a projectile counts as having hit its target (meters).
pub const PROJECTILE_HIT_EPSILON: f64 = 1.0;

// --- Tower placement ---

/// Minimum distance between a tower and any street centerline (meters).
pub const TOWER_STREET_CLEARANCE: f64 = 8.0;

/// Minimum distance between a tower and the base (meters).
pub const TOWER_BASE_CLEARANCE: f64 = 30.0;

/// Minimum distance between two towers (meters).
pub const TOWER_SPACING: f64 = 15.0;

/// Towers must stand within this distance of the base (meters).
pub const PLAYABLE_RADIUS: f64 = 2_000.0;

// --- Audio ---

/// Maximum number of concurrently playing per-entity sounds.
pub const AUDIO_SOUND_BUDGET: usize = 12;

// --- Routes ---

/// Maximum number of street nodes walked by the turnoff extension per direction.
pub const MAX_EXTENSION_NODES: usize = 20;

/// Height deviation from the neighbor interpolation that marks an anomaly.
pub const HEIGHT_ANOMALY_THRESHOLD: f64 = 10.0;

/// Grade (rise / run) above which a waypoint is steep toward a neighbor.
pub const MAX_GRADE: f64 = 0.5;

/// The projected base point is only inserted when it lies this far past
/// the last retained waypoint (meters).
pub const TERMINAL_TRIM_MIN_GAP: f64 = 1.0;

/// Spawn and base positions must lie within this distance of a graph node (meters).
pub const NODE_MATCH_TOLERANCE: f64 = 100.0;

/// Two waypoints closer than this are treated as the same point (meters).
pub const COINCIDENT_EPSILON: f64 = 0.01;
