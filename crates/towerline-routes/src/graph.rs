//! Street graph: geo-referenced nodes joined by streets.
//!
//! Edges are the consecutive node pairs of each street, weighted by
//! great-circle distance. The graph is immutable once built.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use towerline_core::GeoPosition;

use crate::error::RouteError;
use crate::projection::GeoProjection;

/// External node identifier (e.g. an OSM node id).
pub type NodeId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub lat: f64,
    pub lon: f64,
}

impl Node {
    pub fn new(id: NodeId, lat: f64, lon: f64) -> Self {
        Self { id, lat, lon }
    }

    /// Node position on the datum; nodes carry no elevation.
    pub fn position(&self) -> GeoPosition {
        GeoPosition::flat(self.lat, self.lon)
    }
}

/// Ordered node sequence forming one street.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Street {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub nodes: Vec<NodeId>,
}

/// Directed half of an undirected street edge.
#[derive(Debug, Clone, Copy)]
pub struct Edge {
    /// Index of the neighbor node.
    pub to: usize,
    /// Haversine length in meters.
    pub weight: f64,
}

/// Position of a node within a street.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreetSlot {
    /// Index into `StreetGraph::streets`.
    pub street: usize,
    /// Offset of the node within that street's node list.
    pub offset: usize,
}

/// Serialized form of a street graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreetGraphData {
    pub nodes: Vec<Node>,
    pub streets: Vec<Street>,
}

#[derive(Debug, Clone)]
pub struct StreetGraph {
    nodes: Vec<Node>,
    streets: Vec<Street>,
    index: HashMap<NodeId, usize>,
    adjacency: Vec<Vec<Edge>>,
    /// Streets passing through each node.
    memberships: Vec<Vec<StreetSlot>>,
}

impl StreetGraph {
    /// Build a graph, validating that every street references known nodes.
    /// Consecutive repeats of the same node inside a street are collapsed.
    pub fn new(nodes: Vec<Node>, streets: Vec<Street>) -> Result<Self, RouteError> {
        let mut index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            if index.insert(node.id, i).is_some() {
                return Err(RouteError::DuplicateNode(node.id));
            }
        }

        let mut adjacency = vec![Vec::new(); nodes.len()];
        let mut memberships = vec![Vec::new(); nodes.len()];
        let mut cleaned = Vec::with_capacity(streets.len());

        for mut street in streets {
            street.nodes.dedup();
            if street.nodes.len() < 2 {
                return Err(RouteError::DegenerateStreet(street.id));
            }

            let mut indices = Vec::with_capacity(street.nodes.len());
            for &node_id in &street.nodes {
                let idx = *index.get(&node_id).ok_or(RouteError::UnknownNode {
                    street: street.id,
                    node: node_id,
                })?;
                indices.push(idx);
            }

            let street_idx = cleaned.len();
            for (offset, &idx) in indices.iter().enumerate() {
                memberships[idx].push(StreetSlot {
                    street: street_idx,
                    offset,
                });
            }
            for pair in indices.windows(2) {
                let weight = nodes[pair[0]]
                    .position()
                    .haversine_to(&nodes[pair[1]].position());
                adjacency[pair[0]].push(Edge {
                    to: pair[1],
                    weight,
                });
                adjacency[pair[1]].push(Edge {
                    to: pair[0],
                    weight,
                });
            }
            cleaned.push(street);
        }

        Ok(Self {
            nodes,
            streets: cleaned,
            index,
            adjacency,
            memberships,
        })
    }

    /// Load `{ "nodes": [...], "streets": [...] }`.
    pub fn from_json(json: &str) -> Result<Self, RouteError> {
        let data: StreetGraphData = serde_json::from_str(json)?;
        Self::new(data.nodes, data.streets)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn streets(&self) -> &[Street] {
        &self.streets
    }

    pub fn node(&self, idx: usize) -> &Node {
        &self.nodes[idx]
    }

    pub fn node_index(&self, id: NodeId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn neighbors(&self, idx: usize) -> &[Edge] {
        &self.adjacency[idx]
    }

    pub fn are_adjacent(&self, a: usize, b: usize) -> bool {
        self.adjacency[a].iter().any(|e| e.to == b)
    }

    /// Streets that pass through node `idx`.
    pub fn streets_through(&self, idx: usize) -> &[StreetSlot] {
        &self.memberships[idx]
    }

    /// Node index at `offset` of street `street`, if in range.
    pub fn street_node(&self, street: usize, offset: usize) -> Option<usize> {
        let id = *self.streets.get(street)?.nodes.get(offset)?;
        self.node_index(id)
    }

    /// Nearest node to a lat/lon and its haversine distance in meters.
    pub fn nearest_node(&self, lat: f64, lon: f64) -> Option<(usize, f64)> {
        let target = GeoPosition::flat(lat, lon);
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (i, n.position().haversine_to(&target)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Perpendicular ground distance from `pos` to the closest street segment.
    /// `None` for a graph without streets.
    pub fn distance_to_streets(&self, pos: &GeoPosition) -> Option<f64> {
        let projection = GeoProjection::centered_on(pos);
        self.streets
            .iter()
            .flat_map(|street| street.nodes.windows(2))
            .filter_map(|pair| {
                let a = self.nodes[self.node_index(pair[0])?].position();
                let b = self.nodes[self.node_index(pair[1])?].position();
                Some(projection.distance_to_segment(pos, &a, &b))
            })
            .min_by(|a, b| a.total_cmp(b))
    }
}

impl TryFrom<StreetGraphData> for StreetGraph {
    type Error = RouteError;

    fn try_from(data: StreetGraphData) -> Result<Self, Self::Error> {
        Self::new(data.nodes, data.streets)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Meters per 0.001 degree of latitude, for readable fixtures.
    pub const STEP: f64 = 0.001;

    /// A straight north-south street: ids 1..=n at lat (id-1)*STEP.
    pub fn straight_street(n: i64) -> StreetGraph {
        let nodes = (1..=n)
            .map(|id| Node::new(id, (id - 1) as f64 * STEP, 0.0))
            .collect();
        let streets = vec![Street {
            id: 100,
            name: Some("Main".into()),
            nodes: (1..=n).collect(),
        }];
        StreetGraph::new(nodes, streets).unwrap()
    }

    #[test]
    fn test_edges_are_bidirectional() {
        let graph = straight_street(4);
        let a = graph.node_index(1).unwrap();
        let b = graph.node_index(2).unwrap();
        assert!(graph.are_adjacent(a, b));
        assert!(graph.are_adjacent(b, a));
        assert!(!graph.are_adjacent(a, graph.node_index(3).unwrap()));
        let w = graph.neighbors(a)[0].weight;
        assert!((w - 111.19).abs() < 0.1, "weight {w}");
    }

    #[test]
    fn test_unknown_node_rejected() {
        let nodes = vec![Node::new(1, 0.0, 0.0)];
        let streets = vec![Street {
            id: 7,
            name: None,
            nodes: vec![1, 2],
        }];
        let err = StreetGraph::new(nodes, streets).unwrap_err();
        assert!(matches!(err, RouteError::UnknownNode { street: 7, node: 2 }));
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let nodes = vec![Node::new(1, 0.0, 0.0), Node::new(1, 1.0, 0.0)];
        assert!(matches!(
            StreetGraph::new(nodes, Vec::new()),
            Err(RouteError::DuplicateNode(1))
        ));
    }

    #[test]
    fn test_repeated_nodes_collapse_and_degenerate_street() {
        let nodes = vec![Node::new(1, 0.0, 0.0), Node::new(2, 0.001, 0.0)];
        let streets = vec![Street {
            id: 1,
            name: None,
            nodes: vec![1, 1, 2, 2],
        }];
        let graph = StreetGraph::new(nodes.clone(), streets).unwrap();
        assert_eq!(graph.streets()[0].nodes, vec![1, 2]);

        let streets = vec![Street {
            id: 2,
            name: None,
            nodes: vec![1, 1],
        }];
        assert!(matches!(
            StreetGraph::new(nodes, streets),
            Err(RouteError::DegenerateStreet(2))
        ));
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "nodes": [
                {"id": 10, "lat": 0.0, "lon": 0.0},
                {"id": 11, "lat": 0.001, "lon": 0.0}
            ],
            "streets": [{"id": 1, "name": "Elm", "nodes": [10, 11]}]
        }"#;
        let graph = StreetGraph::from_json(json).unwrap();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.streets_through(graph.node_index(11).unwrap()).len(), 1);
    }

    #[test]
    fn test_nearest_node_and_street_distance() {
        let graph = straight_street(3);
        let (idx, dist) = graph.nearest_node(0.0011, 0.0).unwrap();
        assert_eq!(graph.node(idx).id, 2);
        assert!(dist < 12.0);

        // 0.0001 degrees of longitude east of the street at the equator ~ 11.1 m.
        let d = graph
            .distance_to_streets(&GeoPosition::flat(0.0015, 0.0001))
            .unwrap();
        assert!((d - 11.12).abs() < 0.05, "distance {d}");
    }
}
