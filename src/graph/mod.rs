//! Track graph model.
//!
//! A rail network is a grid of cells, each carrying a set of
//! direction-dependent transitions (its switch topology). The
//! [`TrackGraph`] turns a validated [`RailLayout`] into a directed graph
//! over `(cell, heading)` nodes and answers neighbour and shortest-distance
//! queries for the predictor and the encoders.

pub mod direction;
pub mod distance;
pub mod error;
pub mod layout;
pub mod track;
pub mod transitions;

pub use direction::{Cell, Direction};
pub use distance::Distance;
pub use error::GraphError;
pub use layout::{straight_line, LayoutBuilder, RailLayout};
pub use track::{TrackGraph, TrackNode};
pub use transitions::Transitions;
