//! Path processor: raw node path -> cached, height-smoothed route.
//!
//! Pipeline per spawn point:
//! 1. A* from the spawn to the base over the street graph.
//! 2. Turnoff extension: keep walking the street past the last node while
//!    that brings the route closer to the base.
//! 3. Terminal trim: cut at the segment passing closest to the base, insert
//!    the perpendicular foot and finish on the base itself.
//! 4. Sample terrain heights (null samples fall back to a baseline).
//! 5. One smoothing sweep over the heights.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use towerline_core::constants::{
    COINCIDENT_EPSILON, HEIGHT_ANOMALY_THRESHOLD, MAX_EXTENSION_NODES, MAX_GRADE,
    NODE_MATCH_TOLERANCE, TERMINAL_TRIM_MIN_GAP,
};
use towerline_core::{GeoPosition, Path, SpawnId, SpawnPoint};

use crate::astar::find_path_indices;
use crate::cache::RouteCache;
use crate::error::RouteError;
use crate::graph::StreetGraph;
use crate::heights::{smooth_path_heights, SmoothingParams, TerrainSampler};
use crate::projection::GeoProjection;

/// Tuning for route construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteConfig {
    /// Street nodes walked per direction by the turnoff extension.
    pub max_extension_nodes: usize,
    pub anomaly_threshold: f64,
    pub max_grade: f64,
    /// Minimum gap (m) between the last kept node and the inserted projection.
    pub trim_min_gap: f64,
    /// Spawn/base must lie within this distance (m) of a graph node.
    pub node_match_tolerance: f64,
    /// Height used for null terrain samples. Defaults to the base height.
    pub baseline_height: Option<f64>,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            max_extension_nodes: MAX_EXTENSION_NODES,
            anomaly_threshold: HEIGHT_ANOMALY_THRESHOLD,
            max_grade: MAX_GRADE,
            trim_min_gap: TERMINAL_TRIM_MIN_GAP,
            node_match_tolerance: NODE_MATCH_TOLERANCE,
            baseline_height: None,
        }
    }
}

impl RouteConfig {
    fn smoothing(&self) -> SmoothingParams {
        SmoothingParams {
            anomaly_threshold: self.anomaly_threshold,
            max_grade: self.max_grade,
        }
    }
}

/// A finished route and what happened while building it.
#[derive(Debug, Clone)]
pub struct ProcessedRoute {
    pub spawn: SpawnId,
    pub path: Path,
    /// Where the spawn marker belongs: the route's first waypoint.
    pub spawn_marker: GeoPosition,
    /// Street nodes appended by the turnoff extension.
    pub extension_nodes: usize,
    /// Waypoints whose terrain sample was null.
    pub null_samples: usize,
    /// Waypoints rewritten by height smoothing.
    pub anomalies_smoothed: usize,
}

/// Outcome of building routes for a whole spawn set.
#[derive(Debug, Default)]
pub struct RouteBuild {
    pub routes: Vec<ProcessedRoute>,
    /// Spawns left without a path. Non-fatal.
    pub failures: Vec<(SpawnId, RouteError)>,
}

impl RouteBuild {
    pub fn paths(&self) -> HashMap<SpawnId, Path> {
        self.routes
            .iter()
            .map(|route| (route.spawn, route.path.clone()))
            .collect()
    }

    /// Replace the cache contents wholesale with this build.
    pub fn install(&self, cache: &mut RouteCache) {
        cache.replace_all(self.paths());
    }
}

pub struct PathProcessor<'a> {
    graph: &'a StreetGraph,
    config: RouteConfig,
}

impl<'a> PathProcessor<'a> {
    pub fn new(graph: &'a StreetGraph, config: RouteConfig) -> Self {
        Self { graph, config }
    }

    pub fn config(&self) -> &RouteConfig {
        &self.config
    }

    /// Build the route for one spawn point.
    pub fn build_route(
        &self,
        spawn: &SpawnPoint,
        base: &GeoPosition,
        sampler: &dyn TerrainSampler,
    ) -> Result<ProcessedRoute, RouteError> {
        let mut nodes = find_path_indices(
            self.graph,
            spawn.position.lat,
            spawn.position.lon,
            base.lat,
            base.lon,
            self.config.node_match_tolerance,
        );
        if nodes.len() < 2 {
            return Err(RouteError::NoRoute { spawn: spawn.id });
        }

        let extension_nodes = self.extend_turnoff(&mut nodes, base);
        let points: Vec<GeoPosition> = nodes
            .iter()
            .map(|&idx| self.graph.node(idx).position())
            .collect();
        let mut points = trim_terminal(points, base, self.config.trim_min_gap);

        let baseline = self.config.baseline_height.unwrap_or(base.height);
        let mut null_samples = 0;
        for point in &mut points {
            point.height = match sampler.sample_height(point.lat, point.lon) {
                Some(h) if h.is_finite() => h,
                _ => {
                    null_samples += 1;
                    baseline
                }
            };
        }
        if null_samples > 0 {
            warn!(
                spawn = %spawn.id,
                null_samples,
                baseline,
                "terrain height unavailable, using baseline"
            );
        }

        let anomalies_smoothed = smooth_path_heights(&mut points, self.config.smoothing());
        let path = Path::new(points)?;
        info!(
            spawn = %spawn.id,
            waypoints = path.len(),
            length_m = path.length(),
            extension_nodes,
            anomalies_smoothed,
            "route built"
        );

        Ok(ProcessedRoute {
            spawn: spawn.id,
            spawn_marker: path.start(),
            path,
            extension_nodes,
            null_samples,
            anomalies_smoothed,
        })
    }

    /// Build routes for every spawn point. Failures are collected, not fatal.
    pub fn build_all(
        &self,
        spawns: &[SpawnPoint],
        base: &GeoPosition,
        sampler: &dyn TerrainSampler,
    ) -> RouteBuild {
        let mut build = RouteBuild::default();
        for spawn in spawns {
            match self.build_route(spawn, base, sampler) {
                Ok(route) => build.routes.push(route),
                Err(e) => {
                    warn!(spawn = %spawn.id, error = %e, "spawn left without a route");
                    build.failures.push((spawn.id, e));
                }
            }
        }
        build
    }

    /// Rebuild one spawn's route and publish it if no newer build started meanwhile.
    pub fn rebuild_into(
        &self,
        cache: &mut RouteCache,
        spawn: &SpawnPoint,
        base: &GeoPosition,
        sampler: &dyn TerrainSampler,
    ) -> Result<bool, RouteError> {
        let ticket = cache.begin_build(spawn.id);
        let route = self.build_route(spawn, base, sampler)?;
        Ok(cache.publish(ticket, route.path))
    }

    /// Append street nodes past the path end while they bring the route
    /// strictly closer to the base. Returns the number of nodes appended.
    fn extend_turnoff(&self, nodes: &mut Vec<usize>, base: &GeoPosition) -> usize {
        let Some(&last) = nodes.last() else {
            return 0;
        };
        let projection = GeoProjection::centered_on(base);
        let position = |idx: usize| self.graph.node(idx).position();

        let mut best = nodes
            .windows(2)
            .map(|pair| projection.distance_to_segment(base, &position(pair[0]), &position(pair[1])))
            .fold(f64::INFINITY, f64::min);
        let mut best_extension: Vec<usize> = Vec::new();

        for slot in self.graph.streets_through(last) {
            for forward in [true, false] {
                let mut extension = Vec::new();
                let mut closest = best;
                let mut prev = last;

                for step in 1..=self.config.max_extension_nodes {
                    let offset = if forward {
                        slot.offset + step
                    } else if let Some(o) = slot.offset.checked_sub(step) {
                        o
                    } else {
                        break;
                    };
                    let Some(next) = self.graph.street_node(slot.street, offset) else {
                        break;
                    };
                    if nodes.contains(&next) || extension.contains(&next) {
                        break;
                    }
                    let d = projection.distance_to_segment(base, &position(prev), &position(next));
                    if d >= closest {
                        break;
                    }
                    closest = d;
                    extension.push(next);
                    prev = next;
                }

                if closest < best {
                    best = closest;
                    best_extension = extension;
                }
            }
        }

        let added = best_extension.len();
        nodes.extend(best_extension);
        added
    }
}

/// Cut the route at the segment passing closest to `base` and finish on `base`.
///
/// The perpendicular foot on that segment is inserted when it lies more than
/// `min_gap` meters past the last kept point. The first of equally close
/// segments wins.
pub fn trim_terminal(points: Vec<GeoPosition>, base: &GeoPosition, min_gap: f64) -> Vec<GeoPosition> {
    if points.len() < 2 {
        let mut points = points;
        points.push(*base);
        return points;
    }

    let projection = GeoProjection::centered_on(base);
    let mut best_segment = 0;
    let mut best = projection.project_onto_segment(base, &points[0], &points[1]);
    for i in 1..points.len() - 1 {
        let candidate = projection.project_onto_segment(base, &points[i], &points[i + 1]);
        if candidate.distance < best.distance {
            best = candidate;
            best_segment = i;
        }
    }

    let mut trimmed: Vec<GeoPosition> = points[..=best_segment].to_vec();
    if let Some(last) = trimmed.last() {
        if last.haversine_to(&best.point) > min_gap {
            trimmed.push(best.point);
        }
    }
    if trimmed.len() > 1 {
        if let Some(last) = trimmed.last() {
            if last.haversine_to(base) < COINCIDENT_EPSILON {
                trimmed.pop();
            }
        }
    }
    trimmed.push(*base);
    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::tests::{straight_street, STEP};
    use crate::graph::{Node, Street};
    use crate::heights::NoTerrain;

    fn base_at(graph: &StreetGraph, id: i64) -> GeoPosition {
        graph.node(graph.node_index(id).unwrap()).position()
    }

    /// Nodes 1-3 a block apart, then a long block to node 4.
    fn long_block() -> StreetGraph {
        let nodes = vec![
            Node::new(1, 0.0, 0.0),
            Node::new(2, 0.001, 0.0),
            Node::new(3, 0.002, 0.0),
            Node::new(4, 0.006, 0.0),
        ];
        let streets = vec![Street {
            id: 1,
            name: None,
            nodes: vec![1, 2, 3, 4],
        }];
        StreetGraph::new(nodes, streets).unwrap()
    }

    #[test]
    fn test_linear_street_route_ends_on_base() {
        let graph = straight_street(4);
        let processor = PathProcessor::new(&graph, RouteConfig::default());
        let spawn = SpawnPoint::new(0, base_at(&graph, 1));
        let base = base_at(&graph, 4);

        let route = processor.build_route(&spawn, &base, &NoTerrain).unwrap();

        assert_eq!(route.extension_nodes, 0);
        assert_eq!(route.path.len(), 4);
        for (i, wp) in route.path.waypoints().iter().enumerate() {
            assert!((wp.lat - i as f64 * STEP).abs() < 1e-9, "waypoint {i}: {wp:?}");
            assert!(wp.lon.abs() < 1e-9);
        }
        assert_eq!(route.spawn_marker, route.path.start());
    }

    #[test]
    fn test_turnoff_extension_follows_street_toward_base() {
        let graph = long_block();
        let processor = PathProcessor::new(&graph, RouteConfig::default());
        let spawn = SpawnPoint::new(0, GeoPosition::flat(0.0, 0.0));
        // Nearest node is 3, but the block 3->4 passes ~33 m from the base.
        let base = GeoPosition::flat(0.0027, 0.0003);

        let route = processor.build_route(&spawn, &base, &NoTerrain).unwrap();

        assert_eq!(route.extension_nodes, 1);
        let wps = route.path.waypoints();
        assert_eq!(wps.len(), 5);
        assert!((wps[3].lat - 0.0027).abs() < 1e-7, "foot {:?}", wps[3]);
        assert!(wps[3].lon.abs() < 1e-7);
        assert_eq!(wps[4].lat, base.lat);
        assert_eq!(wps[4].lon, base.lon);
    }

    #[test]
    fn test_trim_skips_foot_on_last_kept_point() {
        let points = vec![
            GeoPosition::flat(0.0, 0.0),
            GeoPosition::flat(STEP, 0.0),
            GeoPosition::flat(2.0 * STEP, 0.0),
        ];
        // Base sits abeam the middle node.
        let base = GeoPosition::flat(STEP, 0.0005);
        let trimmed = trim_terminal(points, &base, TERMINAL_TRIM_MIN_GAP);

        assert_eq!(trimmed.len(), 3);
        assert!((trimmed[1].lat - STEP).abs() < 1e-9);
        assert_eq!(trimmed[2], base);
    }

    #[test]
    fn test_trim_cuts_overshooting_path() {
        let points: Vec<GeoPosition> = (0..5)
            .map(|i| GeoPosition::flat(i as f64 * STEP, 0.0))
            .collect();
        let base = GeoPosition::flat(1.5 * STEP, 0.0002);
        let trimmed = trim_terminal(points, &base, TERMINAL_TRIM_MIN_GAP);

        assert_eq!(trimmed.len(), 4);
        assert!((trimmed[2].lat - 1.5 * STEP).abs() < 1e-9);
        assert_eq!(trimmed[3], base);
    }

    #[test]
    fn test_null_samples_use_baseline() {
        let graph = straight_street(3);
        let config = RouteConfig {
            baseline_height: Some(42.0),
            ..RouteConfig::default()
        };
        let processor = PathProcessor::new(&graph, config);
        let spawn = SpawnPoint::new(0, base_at(&graph, 1));
        let base = base_at(&graph, 3);

        let route = processor.build_route(&spawn, &base, &NoTerrain).unwrap();
        assert_eq!(route.null_samples, route.path.len());
        assert!(route.path.waypoints().iter().all(|w| w.height == 42.0));
    }

    #[test]
    fn test_sampled_heights_are_smoothed() {
        let graph = straight_street(5);
        let processor = PathProcessor::new(&graph, RouteConfig::default());
        let spawn = SpawnPoint::new(0, base_at(&graph, 1));
        let base = base_at(&graph, 5);
        // Spike of 60 m at the middle node.
        let sampler = |lat: f64, _lon: f64| {
            if (lat - 2.0 * STEP).abs() < 1e-9 {
                Some(160.0)
            } else {
                Some(100.0)
            }
        };

        let route = processor.build_route(&spawn, &base, &sampler).unwrap();
        assert_eq!(route.null_samples, 0);
        assert!(route.anomalies_smoothed >= 1);
        for wp in route.path.waypoints() {
            assert!((wp.height - 100.0).abs() < 1e-9, "height {}", wp.height);
        }
    }

    #[test]
    fn test_build_all_collects_failures() {
        let graph = straight_street(3);
        let processor = PathProcessor::new(&graph, RouteConfig::default());
        let base = base_at(&graph, 3);
        let spawns = vec![
            SpawnPoint::new(1, base_at(&graph, 1)),
            SpawnPoint::new(2, GeoPosition::flat(5.0, 5.0)),
        ];

        let build = processor.build_all(&spawns, &base, &NoTerrain);
        assert_eq!(build.routes.len(), 1);
        assert_eq!(build.failures.len(), 1);
        assert!(matches!(
            build.failures[0].1,
            RouteError::NoRoute { spawn: SpawnId(2) }
        ));

        let mut cache = RouteCache::new();
        build.install(&mut cache);
        assert!(cache.contains(SpawnId(1)));
        assert!(!cache.contains(SpawnId(2)));
    }

    #[test]
    fn test_rebuild_into_publishes() {
        let graph = straight_street(3);
        let processor = PathProcessor::new(&graph, RouteConfig::default());
        let mut cache = RouteCache::new();
        let spawn = SpawnPoint::new(4, base_at(&graph, 1));

        let published = processor
            .rebuild_into(&mut cache, &spawn, &base_at(&graph, 3), &NoTerrain)
            .unwrap();
        assert!(published);
        assert_eq!(cache.get(SpawnId(4)).unwrap().len(), 3);
    }
}
