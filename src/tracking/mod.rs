//! Discrete-time tracking of a single moving target

pub mod history;
pub mod track_loop;

pub use history::TrackHistory;
pub use track_loop::{DivergenceReason, StepOutcome, TrackState, TrackingLoop};
