//! Fundamental geographic and simulation types.

use serde::{Deserialize, Serialize};

use crate::constants::EARTH_RADIUS_M;

/// Absolute geographic coordinate.
/// `height` is meters above a global datum, never a local render coordinate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPosition {
    pub lat: f64,
    pub lon: f64,
    pub height: f64,
}

impl GeoPosition {
    pub fn new(lat: f64, lon: f64, height: f64) -> Self {
        Self { lat, lon, height }
    }

    /// Position on the datum (height 0).
    pub fn flat(lat: f64, lon: f64) -> Self {
        Self::new(lat, lon, 0.0)
    }

    /// Same coordinate with a different height.
    pub fn with_height(self, height: f64) -> Self {
        Self { height, ..self }
    }

    /// Great-circle (haversine) distance in meters, ignoring height.
    pub fn haversine_to(&self, other: &GeoPosition) -> f64 {
        haversine_m(self.lat, self.lon, other.lat, other.lon)
    }

    /// Straight-line distance in meters including the height difference.
    pub fn distance_to(&self, other: &GeoPosition) -> f64 {
        let ground = self.haversine_to(other);
        let dh = other.height - self.height;
        (ground * ground + dh * dh).sqrt()
    }

    /// Initial bearing toward another position in radians (0 = North, clockwise).
    pub fn bearing_to(&self, other: &GeoPosition) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let dlon = (other.lon - self.lon).to_radians();
        let y = dlon.sin() * lat2.cos();
        let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
        y.atan2(x).rem_euclid(std::f64::consts::TAU)
    }

    /// Linear interpolation of all three coordinates; `t` is clamped to [0, 1].
    pub fn lerp(&self, other: &GeoPosition, t: f64) -> GeoPosition {
        let t = t.clamp(0.0, 1.0);
        GeoPosition {
            lat: self.lat + (other.lat - self.lat) * t,
            lon: self.lon + (other.lon - self.lon) * t,
            height: self.height + (other.height - self.height) * t,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite() && self.height.is_finite()
    }
}

/// Haversine distance between two lat/lon pairs (degrees), in meters.
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Stable entity identifier exposed outside the ECS (packed hecs entity bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "E{:x}", self.0)
    }
}

/// Identifier of a spawn point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpawnId(pub u32);

impl std::fmt::Display for SpawnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "spawn#{}", self.0)
    }
}

/// Fixed origin from which enemies enter the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnPoint {
    pub id: SpawnId,
    pub position: GeoPosition,
}

impl SpawnPoint {
    pub fn new(id: u32, position: GeoPosition) -> Self {
        Self {
            id: SpawnId(id),
            position,
        }
    }
}

/// Simulation time tracking.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SimTime {
    /// Number of ticks that advanced the simulation.
    pub tick: u64,
    /// Elapsed simulation time in seconds.
    pub elapsed_secs: f64,
}

impl SimTime {
    /// Advance by one tick of `dt` seconds.
    pub fn advance(&mut self, dt: f64) {
        self.tick += 1;
        self.elapsed_secs += dt;
    }
}
