//! Per-cell switch topology in the 16-bit flatland encoding.

use super::direction::Direction;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Allowed `(incoming heading → outgoing heading)` moves of one cell.
///
/// The 16 bits are split into four nibbles, one per incoming heading,
/// most significant nibble first (North, East, South, West). Within a
/// nibble, bit `3 - o` allows leaving with outgoing heading `o`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Transitions(pub u16);

impl Transitions {
    /// A cell without track.
    pub const EMPTY: Transitions = Transitions(0);

    fn bit(incoming: Direction, outgoing: Direction) -> u16 {
        1 << ((3 - incoming.index()) * 4 + (3 - outgoing.index()))
    }

    /// Builds a transition set from explicit `(incoming, outgoing)` pairs.
    pub fn from_pairs(pairs: &[(Direction, Direction)]) -> Self {
        let mut t = Self::EMPTY;
        for &(i, o) in pairs {
            t.allow(i, o);
        }
        t
    }

    /// Straight bidirectional track along an axis.
    pub fn straight(axis: Direction) -> Self {
        Self::from_pairs(&[(axis, axis), (axis.opposite(), axis.opposite())])
    }

    /// Whether a train heading `incoming` may leave heading `outgoing`.
    pub fn allows(&self, incoming: Direction, outgoing: Direction) -> bool {
        self.0 & Self::bit(incoming, outgoing) != 0
    }

    /// Adds the `(incoming, outgoing)` move.
    pub fn allow(&mut self, incoming: Direction, outgoing: Direction) {
        self.0 |= Self::bit(incoming, outgoing);
    }

    /// Outgoing headings available to a train heading `incoming`, in index order.
    pub fn outgoing(&self, incoming: Direction) -> Vec<Direction> {
        Direction::all()
            .into_iter()
            .filter(|o| self.allows(incoming, *o))
            .collect()
    }

    /// Whether any move is defined for a train heading `incoming`.
    pub fn accepts(&self, incoming: Direction) -> bool {
        let nibble = (self.0 >> ((3 - incoming.index()) * 4)) & 0xF;
        nibble != 0
    }

    /// Headings for which at least one move is defined.
    pub fn incoming(&self) -> Vec<Direction> {
        Direction::all()
            .into_iter()
            .filter(|i| self.accepts(*i))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// A cell is a switch when some heading offers more than one exit.
    pub fn is_switch(&self) -> bool {
        Direction::all()
            .into_iter()
            .any(|i| self.outgoing(i).len() > 1)
    }

    /// Union of two transition sets.
    pub fn merge(&self, other: Transitions) -> Transitions {
        Transitions(self.0 | other.0)
    }
}
