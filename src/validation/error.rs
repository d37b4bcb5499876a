//! Error classification for the positioning pipeline
//!
//! Every failure the tracking loop can surface is one of these kinds;
//! nothing is swallowed on the way to the caller.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for positioning operations
pub type PositioningResult<T> = Result<T, PositioningError>;

/// Errors observable by callers of the positioning pipeline
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum PositioningError {
    /// A polar measurement carried a negative radial distance
    #[error("negative radial distance rho = {rho}")]
    NegativeRange { rho: f64 },

    /// A sample failed boundary validation
    #[error("malformed sample from sensor {sensor_id}: {reason}")]
    MalformedSample { sensor_id: u16, reason: String },

    /// A sample referenced a sensor id absent from the configured table
    #[error("sample references unknown sensor {sensor_id}")]
    UnknownSensor { sensor_id: u16 },

    /// A configuration parameter is outside its valid range
    #[error("invalid configuration for {parameter}: {reason}")]
    InvalidConfiguration { parameter: String, reason: String },

    /// Too few or too degenerate anchors for a determinate 3D solution
    #[error("underdetermined solve: {available} anchors usable, {required} required")]
    Underdetermined { available: usize, required: usize },

    /// The solver exhausted its iteration budget
    #[error("no convergence after {iterations} iterations (residual {residual})")]
    NonConvergent { iterations: usize, residual: f64 },

    /// Too many consecutive divergent steps; the track is dead
    #[error("track lost after {consecutive} consecutive divergent steps")]
    TrackingLost { consecutive: u32 },
}

/// Ways an anchor set can fail to pin down a 3D position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryIssue {
    /// All anchors lie on one line; two axes are unconstrained
    Collinear,
    /// All anchors lie in one plane; the solution is mirror-ambiguous
    Coplanar,
}
