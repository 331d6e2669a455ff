//! A* search over the street graph.
//!
//! The heuristic is the haversine distance to the goal. Edge weights are
//! haversine distances too, so the heuristic is admissible and the returned
//! path is optimal. Ties on `f` pop in insertion order, which keeps results
//! deterministic for identical inputs.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::graph::{Node, StreetGraph};

/// Frontier entry ordered as a min-heap on `f`, then FIFO on `seq`.
#[derive(Debug, Clone, Copy)]
struct Frontier {
    f: f64,
    seq: u64,
    node: usize,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: reverse both keys.
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Find the shortest node path between the graph nodes nearest to the two
/// coordinates. Returns fewer than two nodes when there is no route: either
/// endpoint is farther than `tolerance_m` from any node, both snap to the
/// same node, or the graph is disconnected.
pub fn find_path(
    graph: &StreetGraph,
    from_lat: f64,
    from_lon: f64,
    to_lat: f64,
    to_lon: f64,
    tolerance_m: f64,
) -> Vec<Node> {
    find_path_indices(graph, from_lat, from_lon, to_lat, to_lon, tolerance_m)
        .into_iter()
        .map(|idx| *graph.node(idx))
        .collect()
}

/// Same as [`find_path`] but yields node indices.
pub fn find_path_indices(
    graph: &StreetGraph,
    from_lat: f64,
    from_lon: f64,
    to_lat: f64,
    to_lon: f64,
    tolerance_m: f64,
) -> Vec<usize> {
    let start = match graph.nearest_node(from_lat, from_lon) {
        Some((idx, dist)) if dist <= tolerance_m => idx,
        _ => return Vec::new(),
    };
    let goal = match graph.nearest_node(to_lat, to_lon) {
        Some((idx, dist)) if dist <= tolerance_m => idx,
        _ => return Vec::new(),
    };
    search(graph, start, goal)
}

/// A* between two node indices.
pub fn search(graph: &StreetGraph, start: usize, goal: usize) -> Vec<usize> {
    if start == goal {
        return vec![start];
    }

    let goal_pos = graph.node(goal).position();
    let heuristic = |idx: usize| graph.node(idx).position().haversine_to(&goal_pos);

    let n = graph.node_count();
    let mut g_score = vec![f64::INFINITY; n];
    let mut came_from: Vec<Option<usize>> = vec![None; n];
    let mut closed = vec![false; n];
    let mut frontier = BinaryHeap::new();
    let mut seq = 0u64;

    g_score[start] = 0.0;
    frontier.push(Frontier {
        f: heuristic(start),
        seq,
        node: start,
    });

    while let Some(Frontier { node, .. }) = frontier.pop() {
        if node == goal {
            return reconstruct(&came_from, goal);
        }
        if closed[node] {
            continue;
        }
        closed[node] = true;

        for edge in graph.neighbors(node) {
            if closed[edge.to] {
                continue;
            }
            let tentative = g_score[node] + edge.weight;
            if tentative < g_score[edge.to] {
                g_score[edge.to] = tentative;
                came_from[edge.to] = Some(node);
                seq += 1;
                frontier.push(Frontier {
                    f: tentative + heuristic(edge.to),
                    seq,
                    node: edge.to,
                });
            }
        }
    }

    Vec::new()
}

fn reconstruct(came_from: &[Option<usize>], goal: usize) -> Vec<usize> {
    let mut path = vec![goal];
    let mut current = goal;
    while let Some(prev) = came_from[current] {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::tests::{straight_street, STEP};
    use crate::graph::Street;

    fn ids(nodes: &[Node]) -> Vec<i64> {
        nodes.iter().map(|n| n.id).collect()
    }

    #[test]
    fn test_linear_street_returns_every_node() {
        let graph = straight_street(4);
        let path = find_path(&graph, 0.0, 0.0, 3.0 * STEP, 0.0, 10.0);
        assert_eq!(ids(&path), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_consecutive_nodes_are_adjacent() {
        // Grid-ish graph with a shortcut diagonal.
        let nodes = vec![
            Node::new(1, 0.0, 0.0),
            Node::new(2, 0.0, 0.001),
            Node::new(3, 0.001, 0.001),
            Node::new(4, 0.001, 0.0),
            Node::new(5, 0.002, 0.001),
        ];
        let streets = vec![
            Street { id: 1, name: None, nodes: vec![1, 2, 3, 5] },
            Street { id: 2, name: None, nodes: vec![1, 4, 3] },
        ];
        let graph = StreetGraph::new(nodes, streets).unwrap();
        let path = find_path_indices(&graph, 0.0, 0.0, 0.002, 0.001, 10.0);
        assert!(path.len() >= 2);
        for pair in path.windows(2) {
            assert!(graph.are_adjacent(pair[0], pair[1]));
        }
        assert_eq!(graph.node(*path.last().unwrap()).id, 5);
    }

    #[test]
    fn test_prefers_shorter_branch() {
        // 1 -> 2 -> 4 is short; 1 -> 3 -> 4 detours far east.
        let nodes = vec![
            Node::new(1, 0.0, 0.0),
            Node::new(2, 0.001, 0.0),
            Node::new(3, 0.001, 0.01),
            Node::new(4, 0.002, 0.0),
        ];
        let streets = vec![
            Street { id: 1, name: None, nodes: vec![1, 3, 4] },
            Street { id: 2, name: None, nodes: vec![1, 2, 4] },
        ];
        let graph = StreetGraph::new(nodes, streets).unwrap();
        let path = find_path(&graph, 0.0, 0.0, 0.002, 0.0, 10.0);
        assert_eq!(ids(&path), vec![1, 2, 4]);
    }

    #[test]
    fn test_disconnected_graph_has_no_route() {
        let nodes = vec![
            Node::new(1, 0.0, 0.0),
            Node::new(2, 0.001, 0.0),
            Node::new(3, 0.01, 0.0),
            Node::new(4, 0.011, 0.0),
        ];
        let streets = vec![
            Street { id: 1, name: None, nodes: vec![1, 2] },
            Street { id: 2, name: None, nodes: vec![3, 4] },
        ];
        let graph = StreetGraph::new(nodes, streets).unwrap();
        let path = find_path(&graph, 0.0, 0.0, 0.011, 0.0, 10.0);
        assert!(path.len() < 2);
    }

    #[test]
    fn test_endpoint_outside_tolerance_has_no_route() {
        let graph = straight_street(3);
        // 1 degree away from every node.
        let path = find_path(&graph, 1.0, 1.0, 2.0 * STEP, 0.0, 100.0);
        assert!(path.is_empty());
    }

    #[test]
    fn test_same_start_and_goal_is_not_a_route() {
        let graph = straight_street(3);
        let path = find_path(&graph, 0.0, 0.0, 0.0, 0.0, 10.0);
        assert_eq!(path.len(), 1);
    }

    #[test]
    fn test_equal_cost_ties_are_deterministic() {
        // Symmetric diamond: both branches have identical length.
        let nodes = vec![
            Node::new(1, 0.0, 0.0),
            Node::new(2, 0.001, 0.001),
            Node::new(3, 0.001, -0.001),
            Node::new(4, 0.002, 0.0),
        ];
        let streets = vec![
            Street { id: 1, name: None, nodes: vec![1, 2, 4] },
            Street { id: 2, name: None, nodes: vec![1, 3, 4] },
        ];
        let graph = StreetGraph::new(nodes, streets).unwrap();
        let first = find_path(&graph, 0.0, 0.0, 0.002, 0.0, 10.0);
        for _ in 0..10 {
            assert_eq!(find_path(&graph, 0.0, 0.0, 0.002, 0.0, 10.0), first);
        }
        assert_eq!(first.len(), 3);
    }
}
