use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use petgraph::graph::{DiGraph, NodeIndex};

use super::direction::{Cell, Direction};
use super::distance::{Distance, DistanceMap};
use super::error::GraphError;
use super::layout::RailLayout;
use super::transitions::Transitions;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A node of the track graph: a cell entered with a given heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrackNode {
    pub cell: Cell,
    pub heading: Direction,
}

impl TrackNode {
    pub fn new(cell: Cell, heading: Direction) -> Self {
        Self { cell, heading }
    }
}

/// Static directed graph of valid moves on the rail network.
///
/// # Invariants
///
/// - Every transition leads to an in-grid cell that accepts the arriving
///   heading, or to a terminus; [`TrackGraph::build`] enforces this
/// - The graph is read-only after construction; the only interior state is
///   the distance memo, guarded by a lock, so the graph can be shared across
///   threads within a step
#[derive(Debug)]
pub struct TrackGraph {
    height: u32,
    width: u32,
    graph: DiGraph<TrackNode, Direction>,
    node_by_key: HashMap<TrackNode, NodeIndex>,
    transitions: BTreeMap<Cell, Transitions>,
    termini: Vec<Cell>,
    distances: RwLock<HashMap<Cell, Arc<DistanceMap>>>,
}

impl TrackGraph {
    /// Validates `layout` and builds its directed graph.
    ///
    /// # Errors
    ///
    /// - `EmptyLayout` if no cell carries track
    /// - `DanglingTransition` if a move leaves the grid
    /// - `EmptyTransitions` if a move enters a track-less cell that is not a terminus
    /// - `InconsistentTransition` if a move enters a cell with no move for the arriving heading
    pub fn build(layout: &RailLayout) -> Result<Self, GraphError> {
        let transitions: BTreeMap<Cell, Transitions> = layout.rail_cells().collect();
        if transitions.is_empty() {
            return Err(GraphError::EmptyLayout);
        }

        let mut graph = DiGraph::new();
        let mut node_by_key = HashMap::new();
        let mut ensure = |graph: &mut DiGraph<TrackNode, Direction>, key: TrackNode| {
            *node_by_key
                .entry(key)
                .or_insert_with(|| graph.add_node(key))
        };

        let mut edges = Vec::new();
        for (&cell, t) in &transitions {
            for incoming in t.incoming() {
                let from = ensure(&mut graph, TrackNode::new(cell, incoming));
                for outgoing in t.outgoing(incoming) {
                    let next = cell
                        .neighbor(outgoing)
                        .filter(|n| layout.contains(*n))
                        .ok_or(GraphError::DanglingTransition {
                            cell,
                            incoming,
                            outgoing,
                        })?;
                    let next_t = layout.get(next);
                    if !next_t.accepts(outgoing) && !layout.is_terminus(next) {
                        return Err(if next_t.is_empty() {
                            GraphError::EmptyTransitions {
                                cell: next,
                                from: cell,
                            }
                        } else {
                            GraphError::InconsistentTransition {
                                cell,
                                incoming,
                                outgoing,
                                neighbor: next,
                            }
                        });
                    }
                    let to = ensure(&mut graph, TrackNode::new(next, outgoing));
                    edges.push((from, to, outgoing));
                }
            }
        }
        for (from, to, heading) in edges {
            graph.add_edge(from, to, heading);
        }

        tracing::debug!(
            cells = transitions.len(),
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Track graph built"
        );

        Ok(Self {
            height: layout.height(),
            width: layout.width(),
            graph,
            node_by_key,
            transitions,
            termini: layout.termini().collect(),
            distances: RwLock::new(HashMap::new()),
        })
    }

    /// Valid moves for a train in `cell` heading `incoming`, ordered by heading.
    pub fn neighbors(&self, cell: Cell, incoming: Direction) -> Vec<(Direction, Cell)> {
        self.transitions(cell)
            .outgoing(incoming)
            .into_iter()
            .filter_map(|o| cell.neighbor(o).map(|n| (o, n)))
            .collect()
    }

    /// Minimum number of cell transitions from `(from, heading)` to `to`.
    ///
    /// Memoised per target: the first query toward a target runs one reverse
    /// BFS that covers every node; later queries are lookups.
    pub fn shortest_distance(&self, from: Cell, heading: Direction, to: Cell) -> Distance {
        if from == to {
            return Distance::Steps(0);
        }
        match self.node_index(from, heading) {
            Some(node) => self.distance_map(to).get(node),
            None => Distance::Unreachable,
        }
    }

    /// Best distance from `cell` to `to` over every heading present at `cell`.
    pub fn min_distance(&self, cell: Cell, to: Cell) -> Distance {
        Direction::all()
            .into_iter()
            .map(|h| self.shortest_distance(cell, h, to))
            .fold(Distance::Unreachable, Distance::min)
    }

    fn distance_map(&self, target: Cell) -> Arc<DistanceMap> {
        if let Some(map) = self
            .distances
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&target)
        {
            return Arc::clone(map);
        }

        let sources: Vec<NodeIndex> = Direction::all()
            .into_iter()
            .filter_map(|h| self.node_index(target, h))
            .collect();
        let map = Arc::new(DistanceMap::compute(&self.graph, &sources));
        tracing::trace!(
            %target,
            reachable = map.reachable_count(),
            "Distance map computed"
        );
        let mut cache = self.distances.write().unwrap_or_else(|e| e.into_inner());
        Arc::clone(cache.entry(target).or_insert(map))
    }

    /// Drops memoised distances, e.g. at the start of a new episode.
    pub fn clear_distance_cache(&self) {
        self.distances
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// Number of targets with memoised distances.
    pub fn cached_targets(&self) -> usize {
        self.distances
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn node_index(&self, cell: Cell, heading: Direction) -> Option<NodeIndex> {
        self.node_by_key.get(&TrackNode::new(cell, heading)).copied()
    }

    pub fn node(&self, index: NodeIndex) -> Option<TrackNode> {
        self.graph.node_weight(index).copied()
    }

    /// Transitions of `cell`; empty for cells without track.
    pub fn transitions(&self, cell: Cell) -> Transitions {
        self.transitions.get(&cell).copied().unwrap_or_default()
    }

    /// Whether `cell` carries track or is a terminus.
    pub fn contains(&self, cell: Cell) -> bool {
        self.transitions.contains_key(&cell) || self.termini.contains(&cell)
    }

    /// Headings with a graph node at `cell`.
    pub fn headings_at(&self, cell: Cell) -> Vec<Direction> {
        Direction::all()
            .into_iter()
            .filter(|h| self.node_by_key.contains_key(&TrackNode::new(cell, *h)))
            .collect()
    }

    pub fn is_junction(&self, cell: Cell) -> bool {
        self.transitions(cell).is_switch()
    }

    pub fn is_terminus(&self, cell: Cell) -> bool {
        self.termini.contains(&cell)
    }

    /// Cells carrying track, in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.transitions.keys().copied()
    }

    pub fn cell_count(&self) -> usize {
        self.transitions.len()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    /// Read-only view of the underlying graph, for rendering consumers.
    pub fn graph(&self) -> &DiGraph<TrackNode, Direction> {
        &self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::layout::{straight_line, LayoutBuilder};
    use Direction::*;

    fn line(n: u32) -> TrackGraph {
        TrackGraph::build(&straight_line(n).unwrap()).unwrap()
    }

    #[test]
    fn straight_line_distance_is_index_difference() {
        let n = 7;
        let g = line(n);
        for i in 0..n {
            for j in 0..n {
                let heading = if j >= i { East } else { West };
                let d = g.shortest_distance(Cell::new(0, i), heading, Cell::new(0, j));
                assert_eq!(d, Distance::Steps(i.abs_diff(j)), "from {} to {}", i, j);
            }
        }
    }

    #[test]
    fn wrong_heading_is_unreachable() {
        let g = line(4);
        let d = g.shortest_distance(Cell::new(0, 1), West, Cell::new(0, 3));
        assert_eq!(d, Distance::Unreachable);
        assert_eq!(g.min_distance(Cell::new(0, 1), Cell::new(0, 3)), Distance::Steps(2));
    }

    #[test]
    fn distances_are_memoised_per_target() {
        let g = line(5);
        g.shortest_distance(Cell::new(0, 0), East, Cell::new(0, 4));
        g.shortest_distance(Cell::new(0, 1), East, Cell::new(0, 4));
        assert_eq!(g.cached_targets(), 1);
        g.shortest_distance(Cell::new(0, 4), West, Cell::new(0, 0));
        assert_eq!(g.cached_targets(), 2);
        g.clear_distance_cache();
        assert_eq!(g.cached_targets(), 0);
    }

    #[test]
    fn neighbors_follow_transitions() {
        let g = line(3);
        assert_eq!(g.neighbors(Cell::new(0, 1), East), vec![(East, Cell::new(0, 2))]);
        assert!(g.neighbors(Cell::new(0, 2), East).is_empty());
        assert!(g.neighbors(Cell::new(0, 1), North).is_empty());
    }

    #[test]
    fn terminus_arrival_nodes_exist() {
        let g = line(3);
        assert!(g.node_index(Cell::new(0, 2), East).is_some());
        assert!(g.is_terminus(Cell::new(0, 2)));
        assert_eq!(g.cell_count(), 3);
    }

    #[test]
    fn junction_distance_picks_shorter_branch() {
        let layout = LayoutBuilder::new(3, 4)
            .add_line(&[Cell::new(0, 0), Cell::new(0, 1), Cell::new(0, 2), Cell::new(0, 3)])
            .unwrap()
            .add_line(&[Cell::new(0, 0), Cell::new(0, 1), Cell::new(1, 1), Cell::new(2, 1)])
            .unwrap()
            .build();
        let g = TrackGraph::build(&layout).unwrap();
        assert!(g.is_junction(Cell::new(0, 1)));
        assert_eq!(
            g.shortest_distance(Cell::new(0, 0), East, Cell::new(2, 1)),
            Distance::Steps(3)
        );
        assert_eq!(
            g.neighbors(Cell::new(0, 1), East),
            vec![(East, Cell::new(0, 2)), (South, Cell::new(1, 1))]
        );
    }

    #[test]
    fn dangling_transition_rejected() {
        let mut layout = crate::graph::RailLayout::new(1, 2);
        layout.set(Cell::new(0, 0), Transitions::straight(East)).unwrap();
        layout.set(Cell::new(0, 1), Transitions::straight(East)).unwrap();
        let err = TrackGraph::build(&layout).unwrap_err();
        assert!(matches!(
            err,
            GraphError::DanglingTransition { .. } | GraphError::InconsistentTransition { .. }
        ));
    }

    #[test]
    fn empty_neighbor_rejected() {
        let mut layout = crate::graph::RailLayout::new(1, 3);
        layout
            .set(Cell::new(0, 0), Transitions::from_pairs(&[(East, East)]))
            .unwrap();
        let err = TrackGraph::build(&layout).unwrap_err();
        assert_eq!(
            err,
            GraphError::EmptyTransitions {
                cell: Cell::new(0, 1),
                from: Cell::new(0, 0)
            }
        );
    }

    #[test]
    fn empty_neighbor_allowed_when_terminus() {
        let mut layout = crate::graph::RailLayout::new(1, 3);
        layout
            .set(Cell::new(0, 0), Transitions::from_pairs(&[(East, East)]))
            .unwrap();
        layout.add_terminus(Cell::new(0, 1)).unwrap();
        let g = TrackGraph::build(&layout).unwrap();
        assert_eq!(
            g.shortest_distance(Cell::new(0, 0), East, Cell::new(0, 1)),
            Distance::Steps(1)
        );
    }

    #[test]
    fn empty_layout_rejected() {
        let layout = crate::graph::RailLayout::new(2, 2);
        assert_eq!(TrackGraph::build(&layout).unwrap_err(), GraphError::EmptyLayout);
    }

    #[test]
    fn graph_is_shareable_across_threads() {
        fn assert_sync<T: Send + Sync>() {}
        assert_sync::<TrackGraph>();
    }
}
