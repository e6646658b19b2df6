//! Raw rail layouts: the input from which a [`TrackGraph`](super::TrackGraph) is built.

use std::collections::BTreeSet;

use super::direction::Cell;
use super::error::GraphError;
use super::transitions::Transitions;

/// A `height × width` grid of per-cell transition sets.
///
/// Termini are cells where a train may legitimately arrive without being
/// able to leave again (line ends, stations). Layouts are not validated until
/// they are turned into a graph.
#[derive(Debug, Clone, PartialEq)]
pub struct RailLayout {
    height: u32,
    width: u32,
    cells: Vec<Transitions>,
    termini: BTreeSet<Cell>,
}

impl RailLayout {
    /// Creates an empty layout of the given size.
    pub fn new(height: u32, width: u32) -> Self {
        Self {
            height,
            width,
            cells: vec![Transitions::EMPTY; (height as usize) * (width as usize)],
            termini: BTreeSet::new(),
        }
    }

    /// Builds a layout from row-major flatland transition codes.
    pub fn from_codes(height: u32, width: u32, codes: &[u16]) -> Result<Self, GraphError> {
        let expected = (height as usize) * (width as usize);
        if codes.len() != expected {
            return Err(GraphError::ShapeMismatch {
                expected,
                actual: codes.len(),
            });
        }
        Ok(Self {
            height,
            width,
            cells: codes.iter().map(|&c| Transitions(c)).collect(),
            termini: BTreeSet::new(),
        })
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    /// Whether `cell` lies inside the grid.
    pub fn contains(&self, cell: Cell) -> bool {
        cell.row < self.height && cell.col < self.width
    }

    fn index(&self, cell: Cell) -> Option<usize> {
        self.contains(cell)
            .then(|| cell.row as usize * self.width as usize + cell.col as usize)
    }

    /// Transitions of `cell`; empty for out-of-grid cells.
    pub fn get(&self, cell: Cell) -> Transitions {
        self.index(cell)
            .map(|i| self.cells[i])
            .unwrap_or(Transitions::EMPTY)
    }

    /// Overwrites the transitions of `cell`.
    pub fn set(&mut self, cell: Cell, transitions: Transitions) -> Result<(), GraphError> {
        let i = self.index(cell).ok_or(GraphError::CellOutOfBounds(cell))?;
        self.cells[i] = transitions;
        Ok(())
    }

    /// Declares `cell` a terminus.
    pub fn add_terminus(&mut self, cell: Cell) -> Result<(), GraphError> {
        if !self.contains(cell) {
            return Err(GraphError::CellOutOfBounds(cell));
        }
        self.termini.insert(cell);
        Ok(())
    }

    pub fn is_terminus(&self, cell: Cell) -> bool {
        self.termini.contains(&cell)
    }

    pub fn termini(&self) -> impl Iterator<Item = Cell> + '_ {
        self.termini.iter().copied()
    }

    /// Cells with at least one transition, in row-major order.
    pub fn rail_cells(&self) -> impl Iterator<Item = (Cell, Transitions)> + '_ {
        let width = self.width.max(1);
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.is_empty())
            .map(move |(i, t)| (Cell::new(i as u32 / width, i as u32 % width), *t))
    }
}

/// Incremental builder laying bidirectional track along cell sequences.
///
/// Overlapping lines OR-merge their transitions, so two lines that share a
/// prefix and then diverge form a switch.
///
/// ```ignore
/// let layout = LayoutBuilder::new(1, 4)
///     .add_line(&[Cell::new(0, 0), Cell::new(0, 1), Cell::new(0, 2), Cell::new(0, 3)])?
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct LayoutBuilder {
    layout: RailLayout,
}

impl LayoutBuilder {
    pub fn new(height: u32, width: u32) -> Self {
        Self {
            layout: RailLayout::new(height, width),
        }
    }

    fn allow(
        &mut self,
        cell: Cell,
        incoming: super::Direction,
        outgoing: super::Direction,
    ) -> Result<(), GraphError> {
        let mut t = self.layout.get(cell);
        t.allow(incoming, outgoing);
        self.layout.set(cell, t)
    }

    fn lay(&mut self, path: &[Cell], closed: bool) -> Result<(), GraphError> {
        if path.len() < 2 {
            return Err(GraphError::LineTooShort(path.len()));
        }
        for &cell in path {
            if !self.layout.contains(cell) {
                return Err(GraphError::CellOutOfBounds(cell));
            }
        }
        let n = path.len();
        let steps = if closed { n } else { n - 1 };
        let mut headings = Vec::with_capacity(steps);
        for i in 0..steps {
            let (a, b) = (path[i], path[(i + 1) % n]);
            let heading = a
                .direction_to(&b)
                .ok_or(GraphError::NotAdjacent { from: a, to: b })?;
            headings.push(heading);
        }

        for i in 0..n {
            let forward_out = if closed || i + 1 < n {
                Some(headings[i % steps])
            } else {
                None
            };
            let backward_in = if closed || i > 0 {
                Some(headings[(i + steps - 1) % steps])
            } else {
                None
            };
            match (backward_in, forward_out) {
                (Some(arrive), Some(leave)) => {
                    self.allow(path[i], arrive, leave)?;
                    self.allow(path[i], leave.opposite(), arrive.opposite())?;
                }
                // Line start: departing trains only.
                (None, Some(leave)) => {
                    self.allow(path[i], leave, leave)?;
                    self.layout.add_terminus(path[i])?;
                }
                // Line end: trains heading back out only.
                (Some(arrive), None) => {
                    let back = arrive.opposite();
                    self.allow(path[i], back, back)?;
                    self.layout.add_terminus(path[i])?;
                }
                (None, None) => {}
            }
        }
        Ok(())
    }

    /// Lays open track through consecutive adjacent cells; both ends become termini.
    pub fn add_line(mut self, path: &[Cell]) -> Result<Self, GraphError> {
        self.lay(path, false)?;
        Ok(self)
    }

    /// Lays a closed ring; the last cell connects back to the first.
    pub fn add_loop(mut self, path: &[Cell]) -> Result<Self, GraphError> {
        self.lay(path, true)?;
        Ok(self)
    }

    /// Sets raw transitions on a single cell, merging with existing track.
    pub fn add_transitions(mut self, cell: Cell, transitions: Transitions) -> Result<Self, GraphError> {
        let merged = self.layout.get(cell).merge(transitions);
        self.layout.set(cell, merged)?;
        Ok(self)
    }

    pub fn add_terminus(mut self, cell: Cell) -> Result<Self, GraphError> {
        self.layout.add_terminus(cell)?;
        Ok(self)
    }

    pub fn build(self) -> RailLayout {
        self.layout
    }
}

/// Convenience: a single horizontal line of `n` cells on row 0.
pub fn straight_line(n: u32) -> Result<RailLayout, GraphError> {
    let cells: Vec<Cell> = (0..n).map(|c| Cell::new(0, c)).collect();
    Ok(LayoutBuilder::new(1, n).add_line(&cells)?.build())
}
