//! Ordered waypoint sequence from a spawn point to the base.

use serde::{Deserialize, Serialize};

use crate::error::PathError;
use crate::types::GeoPosition;

/// Smoothed, height-annotated route. Immutable once built; shared by
/// reference between the route cache and every enemy following it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<GeoPosition>", into = "Vec<GeoPosition>")]
pub struct Path {
    waypoints: Vec<GeoPosition>,
    /// Cumulative ground distance (meters) at each waypoint; `cumulative[0] == 0`.
    cumulative: Vec<f64>,
}

impl Path {
    /// Build a path. Fewer than two waypoints is not a route.
    pub fn new(waypoints: Vec<GeoPosition>) -> Result<Self, PathError> {
        if waypoints.len() < 2 {
            return Err(PathError::TooShort {
                len: waypoints.len(),
            });
        }
        if let Some(index) = waypoints.iter().position(|w| !w.is_finite()) {
            return Err(PathError::NonFinite { index });
        }

        let mut cumulative = Vec::with_capacity(waypoints.len());
        let mut total = 0.0;
        cumulative.push(0.0);
        for pair in waypoints.windows(2) {
            total += pair[0].haversine_to(&pair[1]);
            cumulative.push(total);
        }

        Ok(Self {
            waypoints,
            cumulative,
        })
    }

    pub fn waypoints(&self) -> &[GeoPosition] {
        &self.waypoints
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Always false for a constructed path; present for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn start(&self) -> GeoPosition {
        self.waypoints[0]
    }

    pub fn end(&self) -> GeoPosition {
        self.waypoints[self.waypoints.len() - 1]
    }

    /// Total ground length in meters.
    pub fn length(&self) -> f64 {
        self.cumulative[self.cumulative.len() - 1]
    }

    /// Cumulative distance at waypoint `index` (clamped to the last waypoint).
    pub fn distance_at(&self, index: usize) -> f64 {
        self.cumulative[index.min(self.cumulative.len() - 1)]
    }

    /// Length of the segment starting at `index`. Zero past the end.
    pub fn segment_length(&self, index: usize) -> f64 {
        if index + 1 >= self.cumulative.len() {
            return 0.0;
        }
        self.cumulative[index + 1] - self.cumulative[index]
    }

    /// Index of the last waypoint.
    pub fn last_index(&self) -> usize {
        self.waypoints.len() - 1
    }
}

impl TryFrom<Vec<GeoPosition>> for Path {
    type Error = PathError;

    fn try_from(waypoints: Vec<GeoPosition>) -> Result<Self, Self::Error> {
        Path::new(waypoints)
    }
}

impl From<Path> for Vec<GeoPosition> {
    fn from(path: Path) -> Self {
        path.waypoints
    }
}
