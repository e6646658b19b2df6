//! Bounded local subgraph observations.

use std::collections::{HashMap, VecDeque};

use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;

use crate::config::ObserverConfig;
use crate::graph::TrackNode;

use super::features::{flag, min_max_scaling, steps};
use super::{EncodingContext, Observation, ObservationEncoder};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Local subgraph around one agent, flattened into fixed-size tensors.
///
/// - `node_features`: `max_nodes × NODE_FEATURE_DIM`, row-major
/// - `edge_features`: `max_nodes × max_nodes × EDGE_FEATURE_DIM`, indexed `[from][to]`
/// - `mask`: `max_nodes`, 1.0 for real nodes and 0.0 for padding
///
/// Padded node and edge slots hold the configured padding value. The mask is
/// the one exception: it stays 0/1 whatever the padding value, so it can be
/// multiplied into attention or pooling directly.
///
/// Node 0 is the agent's own `(cell, heading)` node; the rest follow in BFS order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GraphObservation {
    pub max_nodes: usize,
    /// Track nodes behind the real slots, for rendering. Its length varies,
    /// so it is not part of the tensors and is never serialized.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub nodes: Vec<TrackNode>,
    pub node_features: Vec<f64>,
    pub edge_features: Vec<f64>,
    pub mask: Vec<f64>,
}

impl GraphObservation {
    /// Number of real (unmasked) node slots.
    pub fn node_count(&self) -> usize {
        self.mask.iter().filter(|&&m| m > 0.0).count()
    }

    pub fn node_row(&self, i: usize) -> &[f64] {
        let d = ObserverConfig::NODE_FEATURE_DIM;
        &self.node_features[i * d..(i + 1) * d]
    }

    pub fn edge(&self, from: usize, to: usize) -> &[f64] {
        let d = ObserverConfig::EDGE_FEATURE_DIM;
        let at = (from * self.max_nodes + to) * d;
        &self.edge_features[at..at + d]
    }
}

/// Encodes agents as BFS subgraphs of the track graph.
#[derive(Debug, Clone)]
pub struct GraphEncoder {
    radius: usize,
    max_nodes: usize,
    horizon: u32,
    padding: f64,
}

impl GraphEncoder {
    pub fn new(config: &ObserverConfig) -> Self {
        Self {
            radius: config.radius,
            max_nodes: config.max_nodes,
            horizon: config.horizon,
            padding: config.padding_value,
        }
    }

    /// Nodes reachable from `start` within `radius` moves, capped at `max_nodes`.
    fn collect(&self, ctx: &EncodingContext<'_>, start: NodeIndex) -> Vec<(NodeIndex, usize)> {
        let graph = ctx.graph.graph();
        let mut seen: HashMap<NodeIndex, usize> = HashMap::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::from([(start, 0usize)]);
        seen.insert(start, 0);

        while let Some((node, depth)) = queue.pop_front() {
            order.push((node, depth));
            if order.len() == self.max_nodes {
                break;
            }
            if depth == self.radius {
                continue;
            }
            let mut next: Vec<NodeIndex> = graph.neighbors(node).collect();
            next.sort_by_key(|n| graph[*n]);
            for n in next {
                if !seen.contains_key(&n) {
                    seen.insert(n, depth + 1);
                    queue.push_back((n, depth + 1));
                }
            }
        }
        order
    }

    fn empty(&self) -> GraphObservation {
        GraphObservation {
            max_nodes: self.max_nodes,
            nodes: Vec::new(),
            node_features: vec![self.padding; self.max_nodes * ObserverConfig::NODE_FEATURE_DIM],
            edge_features: vec![
                self.padding;
                self.max_nodes * self.max_nodes * ObserverConfig::EDGE_FEATURE_DIM
            ],
            mask: vec![0.0; self.max_nodes],
        }
    }
}

impl ObservationEncoder for GraphEncoder {
    fn encode(&self, ctx: &EncodingContext<'_>, handle: usize) -> Observation {
        let mut obs = self.empty();
        let Some(agent) = ctx.agent(handle) else {
            return Observation::Graph(obs);
        };
        let Some(start) = ctx.graph.node_index(agent.position, agent.direction) else {
            return Observation::Graph(obs);
        };

        let graph = ctx.graph.graph();
        let selected = self.collect(ctx, start);
        let slot: HashMap<NodeIndex, usize> =
            selected.iter().enumerate().map(|(i, &(n, _))| (n, i)).collect();
        let conflict_cells: Vec<_> = ctx.report.conflicts_of(handle).map(|c| c.location).collect();

        let nd = ObserverConfig::NODE_FEATURE_DIM;
        for (i, &(index, depth)) in selected.iter().enumerate() {
            let node = graph[index];
            let others: Vec<_> = ctx
                .occupants(node.cell)
                .filter(|o| o.handle != handle)
                .collect();
            let earliest_visit = ctx
                .visitors(node.cell)
                .filter(|&h| h != handle)
                .filter_map(|h| ctx.trajectory(h).and_then(|t| t.first_visit(node.cell)))
                .min();

            let row = [
                min_max_scaling(depth as f64, 0.0, self.radius as f64),
                min_max_scaling(
                    ctx.graph
                        .shortest_distance(node.cell, node.heading, agent.target)
                        .as_f64(),
                    0.0,
                    ctx.distance_scale(),
                ),
                flag(node.cell == agent.target),
                flag(ctx.graph.is_junction(node.cell)),
                flag(!others.is_empty()),
                flag(others.iter().any(|o| o.direction == node.heading.opposite())),
                steps(earliest_visit, self.horizon as usize),
                flag(conflict_cells.iter().any(|loc| loc.touches(node.cell))),
            ];
            obs.node_features[i * nd..(i + 1) * nd].copy_from_slice(&row);
            obs.mask[i] = 1.0;
            obs.nodes.push(node);
        }

        let ed = ObserverConfig::EDGE_FEATURE_DIM;
        let n = selected.len();
        for from in 0..n {
            for to in 0..n {
                let at = (from * self.max_nodes + to) * ed;
                obs.edge_features[at..at + ed].copy_from_slice(&[flag(false), flag(false)]);
            }
        }
        for (from, &(index, _)) in selected.iter().enumerate() {
            let heading = graph[index].heading;
            for edge in graph.edges(index) {
                if let Some(&to) = slot.get(&edge.target()) {
                    let at = (from * self.max_nodes + to) * ed;
                    obs.edge_features[at..at + ed]
                        .copy_from_slice(&[flag(true), flag(*edge.weight() != heading)]);
                }
            }
        }

        Observation::Graph(obs)
    }

    fn output_len(&self) -> usize {
        self.max_nodes * ObserverConfig::NODE_FEATURE_DIM
            + self.max_nodes * self.max_nodes * ObserverConfig::EDGE_FEATURE_DIM
            + self.max_nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Representation;
    use crate::graph::Direction::{self, *};
    use crate::observation::features::{LOWER, UPPER};
    use crate::observation::fixtures::line_step;

    fn config(max_nodes: usize, radius: usize) -> ObserverConfig {
        ObserverConfig {
            representation: Representation::Graph,
            max_nodes,
            radius,
            padding_value: -3.0,
            ..Default::default()
        }
    }

    fn encode(config: &ObserverConfig, n: u32, agents: &[(u32, Direction, u32)], handle: usize) -> GraphObservation {
        let (graph, snapshot, trajectories, report) = line_step(n, agents);
        let ctx = EncodingContext::new(&graph, &snapshot, &trajectories, &report, config);
        match GraphEncoder::new(config).encode(&ctx, handle) {
            Observation::Graph(g) => g,
            Observation::Vector(_) => panic!("expected a graph observation"),
        }
    }

    #[test]
    fn subgraph_is_bounded_by_radius() {
        let config = config(16, 2);
        let obs = encode(&config, 10, &[(0, East, 9)], 0);
        assert_eq!(obs.node_count(), 3);
        assert_eq!(obs.mask.iter().filter(|&&m| m == 1.0).count(), 3);
        assert_eq!(obs.node_features.len(), 16 * ObserverConfig::NODE_FEATURE_DIM);
        assert!(obs.node_row(3).iter().all(|&v| v == -3.0));
        // Mask padding stays 0 regardless of the padding value.
        assert!(obs.mask[3..].iter().all(|&m| m == 0.0));
    }

    #[test]
    fn subgraph_is_truncated_to_max_nodes() {
        let config = config(4, 8);
        let obs = encode(&config, 10, &[(0, East, 9)], 0);
        assert_eq!(obs.node_count(), 4);
        assert!(obs.mask.iter().all(|&m| m == 1.0));
        assert_eq!(obs.edge_features.len(), 4 * 4 * ObserverConfig::EDGE_FEATURE_DIM);
    }

    #[test]
    fn edges_follow_track_direction() {
        let config = config(8, 3);
        let obs = encode(&config, 6, &[(0, East, 5)], 0);
        assert_eq!(obs.edge(0, 1), &[UPPER, LOWER]);
        assert_eq!(obs.edge(1, 0), &[LOWER, LOWER]);
        assert!(obs.edge(0, 7).iter().all(|&v| v == -3.0));
    }

    #[test]
    fn oncoming_train_is_flagged_on_its_node() {
        let config = config(8, 4);
        let obs = encode(&config, 6, &[(0, East, 5), (3, West, 0)], 0);
        let i = obs
            .nodes
            .iter()
            .position(|n| n.cell == crate::graph::Cell::new(0, 3))
            .unwrap();
        assert_eq!(obs.node_row(i)[4], UPPER);
        assert_eq!(obs.node_row(i)[5], UPPER);
    }
}
