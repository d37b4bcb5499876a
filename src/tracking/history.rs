//! Append-only log of accepted estimates
//!
//! Owned exclusively by the tracking loop; entries are immutable once
//! appended so the convergence record stays a faithful audit trail.

use crate::core::Estimate;

/// Ordered sequence of accepted estimates, one per converged step
#[derive(Debug, Clone, Default)]
pub struct TrackHistory {
    estimates: Vec<Estimate>,
}

impl TrackHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an accepted estimate; entries are never rewritten
    pub fn append(&mut self, estimate: Estimate) {
        self.estimates.push(estimate);
    }

    /// Most recently accepted estimate, if any
    pub fn latest(&self) -> Option<&Estimate> {
        self.estimates.last()
    }

    pub fn len(&self) -> usize {
        self.estimates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.estimates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Estimate> {
        self.estimates.iter()
    }

    /// Distance between the two most recent accepted positions
    pub fn last_delta(&self) -> Option<f64> {
        let n = self.estimates.len();
        if n < 2 {
            return None;
        }
        Some(self.estimates[n - 1].position.distance_to(&self.estimates[n - 2].position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Point3D;
    use approx::assert_relative_eq;

    fn estimate_at(step: u64, x: f64) -> Estimate {
        Estimate { position: Point3D::new(x, 0.0, 0.0), step, residual: 0.0 }
    }

    #[test]
    fn test_append_and_latest() {
        let mut history = TrackHistory::new();
        assert!(history.is_empty());
        assert!(history.latest().is_none());

        history.append(estimate_at(0, 1.0));
        history.append(estimate_at(1, 2.0));

        assert_eq!(history.len(), 2);
        assert_eq!(history.latest().unwrap().step, 1);
    }

    #[test]
    fn test_last_delta() {
        let mut history = TrackHistory::new();
        assert!(history.last_delta().is_none());

        history.append(estimate_at(0, 1.0));
        assert!(history.last_delta().is_none());

        history.append(estimate_at(1, 4.0));
        assert_relative_eq!(history.last_delta().unwrap(), 3.0);
    }

    #[test]
    fn test_iteration_order() {
        let mut history = TrackHistory::new();
        for step in 0..5 {
            history.append(estimate_at(step, step as f64));
        }
        let steps: Vec<u64> = history.iter().map(|e| e.step).collect();
        assert_eq!(steps, vec![0, 1, 2, 3, 4]);
    }
}
