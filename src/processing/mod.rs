//! Temporal processing of accepted estimates

pub mod kalman;

pub use kalman::PositionKalmanFilter;
