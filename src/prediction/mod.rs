//! Bounded-horizon trajectory prediction.

pub mod predictor;
pub mod trajectory;

pub use predictor::TrajectoryPredictor;
pub use trajectory::{PointState, PredictedTrajectory, PredictionOutcome, TrajectoryPoint};
