//! Weighted nonlinear least-squares multilateration
//!
//! Fuses range constraints from heterogeneous sensors into one 3D fix by
//! minimizing sum of w_i * (||p - a_i|| - d_i)^2 with Gauss-Newton
//! iteration under Levenberg-Marquardt damping. Inconsistent ranges are
//! absorbed by the least squares; they show up as a large residual rather
//! than a rejection.

use log::debug;
use nalgebra::{Matrix3, Vector3};
use thiserror::Error;

use crate::core::{Point3D, RangeAnchor, DEFAULT_CONVERGENCE_THRESHOLD};
use crate::validation::error::GeometryIssue;

/// Result type for solver operations
pub type SolverResult<T> = Result<T, SolverError>;

/// Failures that prevent the solver from producing any estimate
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    /// Not enough anchors for a 3D fix
    #[error("{available} anchors provided, at least {required} required")]
    Underdetermined { available: usize, required: usize },

    /// The anchor set cannot pin down a unique 3D position
    #[error("degenerate anchor geometry: {issue:?}")]
    DegenerateGeometry { issue: GeometryIssue },

    /// An anchor carried a non-finite or out-of-range field
    #[error("invalid anchor at index {index}: {reason}")]
    InvalidAnchor { index: usize, reason: String },
}

/// Raw solver output; `converged == false` marks a best-so-far estimate
/// that ran out of iteration budget and must not be accepted silently
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Solution {
    /// Fitted position
    pub position: Point3D,
    /// Weighted RMS range error over all anchors
    pub residual: f64,
    /// Iterations actually spent
    pub iterations: usize,
    /// Whether the position delta dropped below the convergence tolerance
    pub converged: bool,
}

/// Gauss-Newton multilateration engine with Levenberg-Marquardt damping
pub struct MultilaterationSolver {
    /// Maximum number of Gauss-Newton iterations
    pub max_iterations: usize,
    /// Step-norm threshold below which the solve counts as converged
    pub convergence_tolerance: f64,
    /// Initial damping factor for the normal equations
    pub damping_lambda: f64,
    /// Minimum number of anchors accepted
    pub min_anchors: usize,
    /// Singular-value ratio below which anchor geometry is degenerate
    pub rank_tolerance: f64,
}

impl Default for MultilaterationSolver {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            convergence_tolerance: DEFAULT_CONVERGENCE_THRESHOLD,
            damping_lambda: 1e-3,
            min_anchors: 3,
            rank_tolerance: 1e-6,
        }
    }
}

impl MultilaterationSolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Solve for the position best fitting all range constraints.
    ///
    /// Seeded from `initial_guess` when given, else from the anchor
    /// centroid. A coplanar anchor set (any 3-anchor set included) is
    /// mirror-ambiguous and solves only with an initial guess to pick the
    /// branch; a collinear set never solves. Identical inputs produce
    /// identical output; there is no randomness anywhere in the solve.
    pub fn solve(
        &self,
        anchors: &[RangeAnchor],
        initial_guess: Option<Point3D>,
    ) -> SolverResult<Solution> {
        if anchors.len() < self.min_anchors {
            return Err(SolverError::Underdetermined {
                available: anchors.len(),
                required: self.min_anchors,
            });
        }
        self.validate_anchors(anchors)?;

        match self.assess_geometry(anchors) {
            Some(GeometryIssue::Collinear) => {
                return Err(SolverError::DegenerateGeometry { issue: GeometryIssue::Collinear });
            }
            Some(GeometryIssue::Coplanar) if initial_guess.is_none() => {
                return Err(SolverError::DegenerateGeometry { issue: GeometryIssue::Coplanar });
            }
            _ => {}
        }

        let anchor_positions: Vec<Point3D> = anchors.iter().map(|a| a.position).collect();
        let mut estimate = match initial_guess {
            Some(guess) => guess.to_vector(),
            None => Point3D::centroid(&anchor_positions).to_vector(),
        };

        let mut lambda = self.damping_lambda;
        let mut converged = false;
        let mut iterations = 0;

        for iteration in 0..self.max_iterations {
            iterations = iteration + 1;
            let (jtj, jtr, cost) = self.normal_equations(anchors, &estimate);

            // Inner damping loop: retry the step with stronger damping
            // until it descends or the damping budget runs out
            let mut accepted = false;
            for _ in 0..10 {
                let mut damped = jtj;
                for i in 0..3 {
                    damped[(i, i)] += lambda;
                }

                if let Some(inverse) = damped.try_inverse() {
                    let delta = -(inverse * jtr);
                    let candidate = estimate + delta;
                    let new_cost = self.cost(anchors, &candidate);

                    if new_cost <= cost {
                        estimate = candidate;
                        lambda = (lambda * 0.1).max(1e-12);
                        if delta.norm() < self.convergence_tolerance {
                            converged = true;
                        }
                        accepted = true;
                        break;
                    }
                }

                lambda *= 10.0;
                if lambda > 1e10 {
                    break;
                }
            }

            if !accepted || converged {
                break;
            }
        }

        let residual = self.weighted_rms(anchors, &estimate);
        debug!(
            "multilateration finished: {} iterations, residual {:.6}, converged {}",
            iterations, residual, converged
        );

        Ok(Solution {
            position: Point3D::from_vector(&estimate),
            residual,
            iterations,
            converged,
        })
    }

    /// Reject anchors with non-finite or out-of-range fields before they
    /// can poison the normal equations
    fn validate_anchors(&self, anchors: &[RangeAnchor]) -> SolverResult<()> {
        for (index, anchor) in anchors.iter().enumerate() {
            let p = anchor.position;
            if !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()) {
                return Err(SolverError::InvalidAnchor {
                    index,
                    reason: "non-finite position".to_string(),
                });
            }
            if !anchor.distance.is_finite() || anchor.distance < 0.0 {
                return Err(SolverError::InvalidAnchor {
                    index,
                    reason: format!("distance must be finite and >= 0, got {}", anchor.distance),
                });
            }
            if !anchor.weight.is_finite() || anchor.weight <= 0.0 {
                return Err(SolverError::InvalidAnchor {
                    index,
                    reason: format!("weight must be finite and > 0, got {}", anchor.weight),
                });
            }
        }
        Ok(())
    }

    /// Classify the anchor set's rank from the spread of its positions.
    ///
    /// The eigenvalues of the centered scatter matrix are the squared
    /// singular values of the anchor cloud; vanishing second or third
    /// values mean the cloud collapsed onto a line or a plane.
    fn assess_geometry(&self, anchors: &[RangeAnchor]) -> Option<GeometryIssue> {
        let positions: Vec<Point3D> = anchors.iter().map(|a| a.position).collect();
        let centroid = Point3D::centroid(&positions).to_vector();

        let mut scatter = Matrix3::zeros();
        for position in &positions {
            let offset = position.to_vector() - centroid;
            scatter += offset * offset.transpose();
        }

        let mut eigenvalues: Vec<f64> = scatter
            .symmetric_eigen()
            .eigenvalues
            .iter()
            .map(|v| v.max(0.0).sqrt())
            .collect();
        eigenvalues.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));

        let largest = eigenvalues[0];
        if largest <= 0.0 || eigenvalues[1] <= self.rank_tolerance * largest {
            Some(GeometryIssue::Collinear)
        } else if eigenvalues[2] <= self.rank_tolerance * largest {
            Some(GeometryIssue::Coplanar)
        } else {
            None
        }
    }

    /// Accumulate the weighted normal equations J^T J and J^T r at the
    /// current estimate, along with the current cost
    fn normal_equations(
        &self,
        anchors: &[RangeAnchor],
        estimate: &Vector3<f64>,
    ) -> (Matrix3<f64>, Vector3<f64>, f64) {
        let mut jtj = Matrix3::zeros();
        let mut jtr = Vector3::zeros();
        let mut cost = 0.0;

        for anchor in anchors {
            let offset = estimate - anchor.position.to_vector();
            let range = offset.norm();
            let error = range - anchor.distance;
            cost += anchor.weight * error * error;

            // The range gradient is undefined exactly at the anchor point
            if range < 1e-12 {
                continue;
            }
            let direction = offset / range;
            jtj += anchor.weight * direction * direction.transpose();
            jtr += anchor.weight * error * direction;
        }

        (jtj, jtr, cost)
    }

    fn cost(&self, anchors: &[RangeAnchor], estimate: &Vector3<f64>) -> f64 {
        anchors.iter().fold(0.0, |acc, anchor| {
            let range = (estimate - anchor.position.to_vector()).norm();
            let error = range - anchor.distance;
            acc + anchor.weight * error * error
        })
    }

    /// Weighted root-mean-square range error at the estimate
    fn weighted_rms(&self, anchors: &[RangeAnchor], estimate: &Vector3<f64>) -> f64 {
        let total_weight: f64 = anchors.iter().map(|a| a.weight).sum();
        if total_weight <= 0.0 {
            return 0.0;
        }
        (self.cost(anchors, estimate) / total_weight).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Anchors at the given positions with exact noise-free distances to
    /// the true target
    fn exact_anchors(target: Point3D, positions: &[Point3D], weight: f64) -> Vec<RangeAnchor> {
        positions
            .iter()
            .map(|p| RangeAnchor {
                position: *p,
                distance: p.distance_to(&target),
                weight,
            })
            .collect()
    }

    fn tetrahedral_positions() -> Vec<Point3D> {
        vec![
            Point3D::new(0.0, 0.0, 0.0),
            Point3D::new(10.0, 0.0, 0.0),
            Point3D::new(0.0, 10.0, 0.0),
            Point3D::new(0.0, 0.0, 10.0),
        ]
    }

    #[test]
    fn test_exact_four_anchor_solve() {
        let target = Point3D::new(2.0, 3.0, 1.0);
        let anchors = exact_anchors(target, &tetrahedral_positions(), 1.0);

        let solver = MultilaterationSolver::new();
        let solution = solver.solve(&anchors, None).unwrap();

        assert!(solution.converged);
        assert!(solution.position.distance_to(&target) < 1e-3);
        assert!(solution.residual < 1e-6);
    }

    #[test]
    fn test_two_anchors_underdetermined() {
        let target = Point3D::new(2.0, 3.0, 1.0);
        let positions = [Point3D::new(0.0, 0.0, 0.0), Point3D::new(10.0, 0.0, 0.0)];
        let anchors = exact_anchors(target, &positions, 1.0);

        let solver = MultilaterationSolver::new();
        let result = solver.solve(&anchors, None);

        assert_eq!(
            result,
            Err(SolverError::Underdetermined { available: 2, required: 3 })
        );
    }

    #[test]
    fn test_collinear_anchors_rejected() {
        let target = Point3D::new(2.0, 3.0, 1.0);
        let positions: Vec<Point3D> =
            (0..4).map(|i| Point3D::new(i as f64 * 5.0, 0.0, 0.0)).collect();
        let anchors = exact_anchors(target, &positions, 1.0);

        let solver = MultilaterationSolver::new();
        let result = solver.solve(&anchors, Some(Point3D::new(1.0, 1.0, 1.0)));

        assert_eq!(
            result,
            Err(SolverError::DegenerateGeometry { issue: GeometryIssue::Collinear })
        );
    }

    #[test]
    fn test_coplanar_cold_start_rejected() {
        let target = Point3D::new(2.0, 3.0, 1.0);
        let positions = [
            Point3D::new(0.0, 0.0, 0.0),
            Point3D::new(10.0, 0.0, 0.0),
            Point3D::new(0.0, 10.0, 0.0),
            Point3D::new(10.0, 10.0, 0.0),
        ];
        let anchors = exact_anchors(target, &positions, 1.0);

        let solver = MultilaterationSolver::new();
        let result = solver.solve(&anchors, None);

        assert_eq!(
            result,
            Err(SolverError::DegenerateGeometry { issue: GeometryIssue::Coplanar })
        );
    }

    #[test]
    fn test_coplanar_with_guess_picks_mirror_branch() {
        // Three anchors are always coplanar; a warm start near the true
        // position selects the correct reflection about their plane
        let target = Point3D::new(2.0, 3.0, 1.0);
        let positions = [
            Point3D::new(0.0, 0.0, 0.0),
            Point3D::new(10.0, 0.0, 0.0),
            Point3D::new(0.0, 10.0, 0.0),
        ];
        let anchors = exact_anchors(target, &positions, 1.0);

        let solver = MultilaterationSolver::new();
        let solution = solver
            .solve(&anchors, Some(Point3D::new(2.1, 2.9, 0.8)))
            .unwrap();

        assert!(solution.converged);
        assert!(solution.position.z > 0.0, "must land on the warm-start side of the plane");
        assert!(solution.position.distance_to(&target) < 1e-3);
    }

    #[test]
    fn test_idempotent_from_converged_estimate() {
        let target = Point3D::new(2.0, 3.0, 1.0);
        let anchors = exact_anchors(target, &tetrahedral_positions(), 1.0);
        let solver = MultilaterationSolver::new();

        let first = solver.solve(&anchors, None).unwrap();
        let second = solver.solve(&anchors, Some(first.position)).unwrap();

        assert!(second.converged);
        assert!(
            first.position.distance_to(&second.position) < solver.convergence_tolerance
        );
    }

    #[test]
    fn test_deterministic_results() {
        let target = Point3D::new(4.0, 4.0, 4.0);
        let anchors = exact_anchors(target, &tetrahedral_positions(), 1.0);
        let solver = MultilaterationSolver::new();

        let a = solver.solve(&anchors, None).unwrap();
        let b = solver.solve(&anchors, None).unwrap();

        assert_eq!(a.position, b.position);
        assert_eq!(a.residual, b.residual);
        assert_eq!(a.iterations, b.iterations);
    }

    #[test]
    fn test_budget_exhaustion_reports_partial() {
        let target = Point3D::new(2.0, 3.0, 1.0);
        let anchors = exact_anchors(target, &tetrahedral_positions(), 1.0);

        let solver = MultilaterationSolver {
            max_iterations: 1,
            ..Default::default()
        };
        let solution = solver
            .solve(&anchors, Some(Point3D::new(100.0, -50.0, 80.0)))
            .unwrap();

        assert!(!solution.converged, "one iteration from a distant seed cannot converge");
        assert_eq!(solution.iterations, 1);
    }

    #[test]
    fn test_inconsistent_range_inflates_residual() {
        let target = Point3D::new(2.0, 3.0, 1.0);
        let mut anchors = exact_anchors(target, &tetrahedral_positions(), 1.0);
        anchors[0].distance += 5.0; // triangle-inequality violation

        let solver = MultilaterationSolver::new();
        let solution = solver.solve(&anchors, None).unwrap();

        assert!(
            solution.residual > 0.5,
            "inconsistency must surface in the residual, got {}",
            solution.residual
        );
    }

    #[test]
    fn test_weighting_suppresses_noisy_anchor() {
        let target = Point3D::new(2.0, 3.0, 1.0);
        let mut anchors = exact_anchors(target, &tetrahedral_positions(), 10.0);
        // One badly corrupted range with near-zero confidence
        anchors.push(RangeAnchor {
            position: Point3D::new(5.0, 5.0, 5.0),
            distance: Point3D::new(5.0, 5.0, 5.0).distance_to(&target) + 8.0,
            weight: 1e-3,
        });

        let solver = MultilaterationSolver::new();
        let solution = solver.solve(&anchors, None).unwrap();

        assert!(solution.converged);
        assert!(
            solution.position.distance_to(&target) < 0.01,
            "down-weighted outlier must not drag the fix, error {}",
            solution.position.distance_to(&target)
        );
    }

    #[test]
    fn test_zero_range_anchor_acts_as_position_hypothesis() {
        // A radar fix enters as a zero-range anchor at the hypothesis
        let target = Point3D::new(2.0, 3.0, 1.0);
        let mut anchors = exact_anchors(
            target,
            &[
                Point3D::new(0.0, 0.0, 0.0),
                Point3D::new(10.0, 0.0, 0.0),
                Point3D::new(0.0, 10.0, 0.0),
            ],
            1.0,
        );
        anchors.push(RangeAnchor { position: target, distance: 0.0, weight: 5.0 });

        let solver = MultilaterationSolver::new();
        let solution = solver.solve(&anchors, None).unwrap();

        assert!(solution.converged);
        assert!(solution.position.distance_to(&target) < 1e-3);
    }

    #[test]
    fn test_invalid_anchor_rejected() {
        let anchors = vec![
            RangeAnchor { position: Point3D::new(0.0, 0.0, 0.0), distance: 1.0, weight: 1.0 },
            RangeAnchor { position: Point3D::new(1.0, 0.0, 0.0), distance: -2.0, weight: 1.0 },
            RangeAnchor { position: Point3D::new(0.0, 1.0, 0.0), distance: 1.0, weight: 1.0 },
        ];

        let solver = MultilaterationSolver::new();
        assert!(matches!(
            solver.solve(&anchors, None),
            Err(SolverError::InvalidAnchor { index: 1, .. })
        ));
    }
}
