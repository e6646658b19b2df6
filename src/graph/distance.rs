//! Shortest-path distances toward fixed targets.

use std::collections::VecDeque;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction as EdgeDirection;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of cell transitions to a target, or an explicit "no path" sentinel.
///
/// Unreachable targets are an expected outcome of random layouts, so they are
/// modelled as a value rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Distance {
    Steps(u32),
    Unreachable,
}

impl Distance {
    pub fn steps(&self) -> Option<u32> {
        match self {
            Distance::Steps(s) => Some(*s),
            Distance::Unreachable => None,
        }
    }

    pub fn is_reachable(&self) -> bool {
        matches!(self, Distance::Steps(_))
    }

    /// Distance as a float, with `+inf` for unreachable targets.
    pub fn as_f64(&self) -> f64 {
        match self {
            Distance::Steps(s) => *s as f64,
            Distance::Unreachable => f64::INFINITY,
        }
    }

    /// The smaller of two distances; `Unreachable` is the largest value.
    pub fn min(self, other: Distance) -> Distance {
        match (self.steps(), other.steps()) {
            (Some(a), Some(b)) => Distance::Steps(a.min(b)),
            (Some(_), None) => self,
            _ => other,
        }
    }
}

impl PartialOrd for Distance {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Distance {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match (self.steps(), other.steps()) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        }
    }
}

/// Distances from every graph node to one target cell.
#[derive(Debug, Clone)]
pub(crate) struct DistanceMap {
    dist: Vec<Option<u32>>,
}

impl DistanceMap {
    /// Reverse BFS from all `sources` (the nodes located at the target cell).
    pub(crate) fn compute<N, E>(graph: &DiGraph<N, E>, sources: &[NodeIndex]) -> Self {
        let mut dist = vec![None; graph.node_count()];
        let mut queue = VecDeque::new();
        for &s in sources {
            dist[s.index()] = Some(0);
            queue.push_back(s);
        }
        while let Some(node) = queue.pop_front() {
            let d = dist[node.index()].unwrap_or(0);
            for prev in graph.neighbors_directed(node, EdgeDirection::Incoming) {
                if dist[prev.index()].is_none() {
                    dist[prev.index()] = Some(d + 1);
                    queue.push_back(prev);
                }
            }
        }
        Self { dist }
    }

    pub(crate) fn get(&self, node: NodeIndex) -> Distance {
        self.dist
            .get(node.index())
            .copied()
            .flatten()
            .map(Distance::Steps)
            .unwrap_or(Distance::Unreachable)
    }

    /// Number of nodes that can reach the target.
    pub(crate) fn reachable_count(&self) -> usize {
        self.dist.iter().filter(|d| d.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_sorts_last() {
        let mut v = vec![Distance::Unreachable, Distance::Steps(3), Distance::Steps(1)];
        v.sort();
        assert_eq!(v, vec![Distance::Steps(1), Distance::Steps(3), Distance::Unreachable]);
    }

    #[test]
    fn min_prefers_reachable() {
        assert_eq!(Distance::Unreachable.min(Distance::Steps(4)), Distance::Steps(4));
        assert_eq!(Distance::Steps(2).min(Distance::Steps(4)), Distance::Steps(2));
        assert!(Distance::Unreachable.as_f64().is_infinite());
    }

    #[test]
    fn reverse_bfs_on_chain() {
        let mut g: DiGraph<(), ()> = DiGraph::new();
        let a = g.add_node(());
        let b = g.add_node(());
        let c = g.add_node(());
        g.add_edge(a, b, ());
        g.add_edge(b, c, ());
        let map = DistanceMap::compute(&g, &[c]);
        assert_eq!(map.get(a), Distance::Steps(2));
        assert_eq!(map.get(c), Distance::Steps(0));
        assert_eq!(map.reachable_count(), 3);

        let back = DistanceMap::compute(&g, &[a]);
        assert_eq!(back.get(c), Distance::Unreachable);
    }
}
