//! Policy trait and implementations.

pub mod random;
pub mod shortest_path;
pub mod trait_;

pub use random::RandomPolicy;
pub use shortest_path::ShortestPathPolicy;
pub use trait_::Policy;
