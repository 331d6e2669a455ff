//! Local planar projection: converts between lat/lon and meters around a reference point.
//!
//! Uses an equirectangular projection centered on the reference point.
//! Only used transiently for perpendicular-distance math; nothing stores
//! local coordinates.

use glam::DVec2;

use towerline_core::constants::EARTH_RADIUS_M;
use towerline_core::GeoPosition;

/// Meters per degree of latitude, consistent with the haversine radius.
const METERS_PER_DEGREE: f64 = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;

/// Geographic projection anchored at a reference point.
///
/// The reference point maps to the local origin.
/// x = East, y = North, both in meters.
#[derive(Debug, Clone)]
pub struct GeoProjection {
    pub ref_lat: f64,
    pub ref_lon: f64,
    /// Cached cos(ref_lat) for longitude scaling.
    cos_ref_lat: f64,
}

/// Result of projecting a point perpendicularly onto a segment.
#[derive(Debug, Clone, Copy)]
pub struct SegmentProjection {
    /// Closest point on the segment; height interpolated between the ends.
    pub point: GeoPosition,
    /// Parameter along the segment in `[0, 1]`.
    pub t: f64,
    /// Ground distance from the query point to `point` (meters).
    pub distance: f64,
}

impl GeoProjection {
    /// Create a new projection centered at the given lat/lon (degrees).
    pub fn new(ref_lat: f64, ref_lon: f64) -> Self {
        Self {
            ref_lat,
            ref_lon,
            cos_ref_lat: ref_lat.to_radians().cos(),
        }
    }

    pub fn centered_on(pos: &GeoPosition) -> Self {
        Self::new(pos.lat, pos.lon)
    }

    /// Convert a geographic position to local meters.
    pub fn to_local(&self, pos: &GeoPosition) -> DVec2 {
        DVec2::new(
            (pos.lon - self.ref_lon) * self.lon_scale(),
            (pos.lat - self.ref_lat) * METERS_PER_DEGREE,
        )
    }

    /// Convert local meters back to a geographic position with the given height.
    pub fn to_geo(&self, local: DVec2, height: f64) -> GeoPosition {
        GeoPosition::new(
            self.ref_lat + local.y / METERS_PER_DEGREE,
            self.ref_lon + local.x / self.lon_scale(),
            height,
        )
    }

    /// Meters per degree of longitude at the reference latitude.
    pub fn lon_scale(&self) -> f64 {
        METERS_PER_DEGREE * self.cos_ref_lat
    }

    /// Project `p` onto the segment `a -> b`, clamped to the segment.
    pub fn project_onto_segment(
        &self,
        p: &GeoPosition,
        a: &GeoPosition,
        b: &GeoPosition,
    ) -> SegmentProjection {
        let lp = self.to_local(p);
        let la = self.to_local(a);
        let lb = self.to_local(b);
        let ab = lb - la;
        let len_sq = ab.length_squared();

        let t = if len_sq > 0.0 {
            ((lp - la).dot(ab) / len_sq).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let local = la + ab * t;
        let height = a.height + (b.height - a.height) * t;

        SegmentProjection {
            point: self.to_geo(local, height),
            t,
            distance: lp.distance(local),
        }
    }

    /// Perpendicular ground distance from `p` to the segment `a -> b`.
    pub fn distance_to_segment(&self, p: &GeoPosition, a: &GeoPosition, b: &GeoPosition) -> f64 {
        self.project_onto_segment(p, a, b).distance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projection_roundtrip() {
        let proj = GeoProjection::new(48.137, 11.575);
        let pos = GeoPosition::new(48.140, 11.580, 520.0);

        let back = proj.to_geo(proj.to_local(&pos), pos.height);

        assert!((pos.lat - back.lat).abs() < 1e-10, "lat roundtrip: {} vs {}", pos.lat, back.lat);
        assert!((pos.lon - back.lon).abs() < 1e-10, "lon roundtrip: {} vs {}", pos.lon, back.lon);
    }

    #[test]
    fn test_local_distance_matches_haversine() {
        let proj = GeoProjection::new(48.137, 11.575);
        let a = GeoPosition::flat(48.137, 11.575);
        let b = GeoPosition::flat(48.139, 11.578);
        let planar = proj.to_local(&a).distance(proj.to_local(&b));
        let great_circle = a.haversine_to(&b);
        assert!(
            (planar - great_circle).abs() < 0.05,
            "planar {planar} vs haversine {great_circle}"
        );
    }

    #[test]
    fn test_origin_maps_to_zero() {
        let proj = GeoProjection::new(26.5, 56.2);
        let local = proj.to_local(&GeoPosition::flat(26.5, 56.2));
        assert!(local.x.abs() < 1e-6);
        assert!(local.y.abs() < 1e-6);
    }

    #[test]
    fn test_project_onto_segment_interior_and_clamped() {
        let proj = GeoProjection::new(0.0, 0.0);
        let a = GeoPosition::new(0.0, 0.0, 0.0);
        let b = GeoPosition::new(0.0, 0.002, 10.0);

        // A point north of the segment midpoint projects to the midpoint.
        let p = GeoPosition::flat(0.0005, 0.001);
        let hit = proj.project_onto_segment(&p, &a, &b);
        assert!((hit.t - 0.5).abs() < 1e-6, "t = {}", hit.t);
        assert!((hit.point.height - 5.0).abs() < 1e-6);
        assert!((hit.distance - p.haversine_to(&hit.point)).abs() < 0.01);

        // Beyond b the projection clamps to b.
        let beyond = GeoPosition::flat(0.0, 0.004);
        let hit = proj.project_onto_segment(&beyond, &a, &b);
        assert_eq!(hit.t, 1.0);
        assert!(hit.point.haversine_to(&b) < 1e-6);
    }

    #[test]
    fn test_degenerate_segment() {
        let proj = GeoProjection::new(0.0, 0.0);
        let a = GeoPosition::flat(0.001, 0.001);
        let p = GeoPosition::flat(0.0, 0.001);
        let hit = proj.project_onto_segment(&p, &a, &a);
        assert_eq!(hit.t, 0.0);
        assert!((hit.distance - p.haversine_to(&a)).abs() < 0.05);
    }
}
