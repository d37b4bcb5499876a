//! Tool-Head Positioning System
//!
//! Estimates the time-varying 3D position of a moving manufacturing tool
//! head from heterogeneous range/angle measurements: RFID tags ranged via
//! a log-distance path-loss model and radar receivers reporting polar
//! fixes, fused per discrete time step by a weighted multilateration
//! solver inside a convergence-gated tracking loop.

pub mod core;
pub mod algorithms;
pub mod processing;
pub mod tracking;
pub mod validation;
pub mod utils;

// Re-export commonly used types
pub use crate::core::{
    Estimate, Point3D, PolarMeasurement, RangeAnchor, RangeSample, SensorDescriptor, SensorKind,
    SensorReading,
};
pub use algorithms::range_model::RangeModel;
pub use algorithms::solver::{MultilaterationSolver, Solution, SolverError};
pub use algorithms::transform::to_absolute;
pub use processing::kalman::PositionKalmanFilter;
pub use tracking::{DivergenceReason, StepOutcome, TrackHistory, TrackState, TrackingLoop};
pub use utils::config::{ConfigError, TrackerConfig};
pub use validation::{GeometryIssue, PositioningError, PositioningResult, SampleValidator};
