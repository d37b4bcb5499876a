//! Discrete-time tracking loop
//!
//! One call to `step` is one external time tick: gather the step's
//! samples, solve, compare against the running estimate, and either
//! accept the fix or count a divergence. The loop owns all of its state
//! (sensor table, history, divergence accounting), so independent tracks
//! are just independent values.

use log::{debug, warn};

use crate::algorithms::solver::{MultilaterationSolver, SolverError};
use crate::core::{Estimate, Point3D, RangeSample};
use crate::processing::kalman::PositionKalmanFilter;
use crate::tracking::history::TrackHistory;
use crate::utils::config::TrackerConfig;
use crate::validation::data::SampleValidator;
use crate::validation::error::{GeometryIssue, PositioningError, PositioningResult};
use serde::{Deserialize, Serialize};

/// Phase of the per-step cycle; every step ends back at `Idle` unless the
/// track is lost
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    /// Waiting for the next time step's measurement batch
    Idle,
    /// Resolving the current batch against the sensor table
    Measuring,
    /// Running the multilateration solve
    Solving,
    /// The step's estimate was accepted
    Converged,
    /// The step's estimate was discarded
    Diverged,
    /// Terminal: too many consecutive divergences
    Lost,
}

/// Why a step's estimate was discarded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DivergenceReason {
    /// Fewer usable samples than the configured minimum
    InsufficientSamples { available: usize, required: usize },
    /// The solver had too few anchors
    Underdetermined { available: usize, required: usize },
    /// The anchor geometry could not pin down a unique position
    DegenerateGeometry { issue: GeometryIssue },
    /// The solver ran out of iterations; the partial estimate is discarded
    NonConvergent { iterations: usize, residual: f64 },
}

/// Per-step output emitted to consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StepOutcome {
    /// A converged estimate, appended to the history
    Accepted(Estimate),
    /// The step was skipped; the last accepted estimate stays current
    Diverged(DivergenceReason),
    /// The divergence limit was exceeded; the track is dead
    TrackingLost { consecutive: u32 },
}

/// Discrete-time position tracker for a single target
pub struct TrackingLoop {
    config: TrackerConfig,
    validator: SampleValidator,
    solver: MultilaterationSolver,
    smoother: Option<PositionKalmanFilter>,
    history: TrackHistory,
    state: TrackState,
    next_step: u64,
    consecutive_divergences: u32,
}

impl TrackingLoop {
    /// Build a loop from a validated configuration
    pub fn new(config: TrackerConfig) -> PositioningResult<Self> {
        config.validate()?;

        let validator = SampleValidator::new(config.sensors.clone(), config.range_model)?;
        let solver = MultilaterationSolver {
            max_iterations: config.max_iterations,
            convergence_tolerance: config.convergence_threshold,
            ..Default::default()
        };
        let smoother = config.enable_smoothing.then(PositionKalmanFilter::new);

        Ok(Self {
            config,
            validator,
            solver,
            smoother,
            history: TrackHistory::new(),
            state: TrackState::Idle,
            next_step: 0,
            consecutive_divergences: 0,
        })
    }

    /// Process one discrete time step's measurement batch.
    ///
    /// Malformed input is returned as an error without consuming the
    /// track; solver-level failures become divergences. After the track
    /// is lost every further call reports `TrackingLost`.
    pub fn step(&mut self, samples: &[RangeSample]) -> PositioningResult<StepOutcome> {
        if self.state == TrackState::Lost {
            return Err(PositioningError::TrackingLost {
                consecutive: self.consecutive_divergences,
            });
        }

        let step = self.next_step;
        self.next_step += 1;

        self.state = TrackState::Measuring;
        let anchors = match self.validator.resolve_batch(samples) {
            Ok(anchors) => anchors,
            Err(error) => {
                self.state = TrackState::Idle;
                return Err(error);
            }
        };

        if anchors.len() < self.config.min_sensors {
            return Ok(self.diverge(
                step,
                DivergenceReason::InsufficientSamples {
                    available: anchors.len(),
                    required: self.config.min_sensors,
                },
            ));
        }

        self.state = TrackState::Solving;
        let warm_start = self.history.latest().map(|estimate| estimate.position);
        let solution = match self.solver.solve(&anchors, warm_start) {
            Ok(solution) if solution.converged => solution,
            Ok(partial) => {
                return Ok(self.diverge(
                    step,
                    DivergenceReason::NonConvergent {
                        iterations: partial.iterations,
                        residual: partial.residual,
                    },
                ));
            }
            Err(SolverError::Underdetermined { available, required }) => {
                return Ok(self.diverge(
                    step,
                    DivergenceReason::Underdetermined { available, required },
                ));
            }
            Err(SolverError::DegenerateGeometry { issue }) => {
                return Ok(self.diverge(step, DivergenceReason::DegenerateGeometry { issue }));
            }
            Err(SolverError::InvalidAnchor { index, reason }) => {
                // Should have been caught at the boundary; report it
                // against the offending sample rather than divergence
                self.state = TrackState::Idle;
                let sensor_id = samples.get(index).map_or(0, |sample| sample.sensor_id);
                return Err(PositioningError::MalformedSample { sensor_id, reason });
            }
        };

        self.state = TrackState::Converged;
        self.consecutive_divergences = 0;

        let position = match &mut self.smoother {
            Some(filter) => Point3D::from_vector(&filter.update(&solution.position.to_vector())),
            None => solution.position,
        };

        let estimate = Estimate { position, step, residual: solution.residual };
        self.history.append(estimate);
        debug!(
            "step {} accepted: ({:.4}, {:.4}, {:.4}) residual {:.6}",
            step, position.x, position.y, position.z, estimate.residual
        );

        self.state = TrackState::Idle;
        Ok(StepOutcome::Accepted(estimate))
    }

    fn diverge(&mut self, step: u64, reason: DivergenceReason) -> StepOutcome {
        self.state = TrackState::Diverged;
        self.consecutive_divergences += 1;
        warn!(
            "step {} diverged ({:?}), {} consecutive",
            step, reason, self.consecutive_divergences
        );

        if self.consecutive_divergences > self.config.max_consecutive_divergences {
            warn!(
                "track lost after {} consecutive divergent steps",
                self.consecutive_divergences
            );
            self.state = TrackState::Lost;
            return StepOutcome::TrackingLost { consecutive: self.consecutive_divergences };
        }

        self.state = TrackState::Idle;
        StepOutcome::Diverged(reason)
    }

    /// Last accepted estimate; retained across divergent steps
    pub fn current_estimate(&self) -> Option<&Estimate> {
        self.history.latest()
    }

    /// Full audit trail of accepted estimates
    pub fn history(&self) -> &TrackHistory {
        &self.history
    }

    pub fn state(&self) -> TrackState {
        self.state
    }

    pub fn is_lost(&self) -> bool {
        self.state == TrackState::Lost
    }

    /// Number of steps processed so far, divergent ones included
    pub fn steps_processed(&self) -> u64 {
        self.next_step
    }
}
