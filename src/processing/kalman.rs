//! Kalman filter for temporal smoothing of accepted estimates
//!
//! State vector: [x, y, z, vx, vy, vz] under a constant-velocity model.
//! Time is the tracking loop's discrete step counter (one update per
//! accepted step, dt fixed at one step), so the filter carries no clock
//! of its own.

use nalgebra::{Matrix3, Matrix3x6, Matrix6, Vector3, Vector6};

/// Discrete-step position/velocity smoother
#[derive(Debug, Clone)]
pub struct PositionKalmanFilter {
    /// Current state estimate [position, velocity]
    state: Vector6<f64>,
    /// State covariance matrix
    covariance: Matrix6<f64>,
    /// Process noise covariance matrix
    process_noise: Matrix6<f64>,
    /// Measurement noise covariance matrix
    measurement_noise: Matrix3<f64>,
    /// Whether the filter has seen a measurement yet
    initialized: bool,
}

impl Default for PositionKalmanFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionKalmanFilter {
    /// Create a filter with default noise parameters
    pub fn new() -> Self {
        Self {
            state: Vector6::zeros(),
            covariance: Matrix6::identity() * 100.0,
            process_noise: Self::create_process_noise(0.1, 0.01),
            measurement_noise: Matrix3::identity(),
            initialized: false,
        }
    }

    /// Create a filter with custom noise parameters
    pub fn with_noise_parameters(
        position_process_noise: f64,
        velocity_process_noise: f64,
        measurement_noise: f64,
    ) -> Self {
        let mut filter = Self::new();
        filter.process_noise =
            Self::create_process_noise(position_process_noise, velocity_process_noise);
        filter.measurement_noise = Matrix3::identity() * measurement_noise;
        filter
    }

    /// Seed the filter from the first accepted position
    pub fn initialize(&mut self, position: &Vector3<f64>) {
        self.state = Vector6::zeros();
        self.state[0] = position.x;
        self.state[1] = position.y;
        self.state[2] = position.z;

        self.covariance = Matrix6::identity();
        for i in 3..6 {
            self.covariance[(i, i)] = 0.1;
        }
        self.initialized = true;
    }

    /// Advance the state by one discrete step (constant-velocity model)
    pub fn predict(&mut self) -> Vector3<f64> {
        let f = Self::state_transition();
        self.state = f * self.state;
        self.covariance = f * self.covariance * f.transpose() + self.process_noise;
        self.position()
    }

    /// Fold one accepted position into the state, returning the smoothed
    /// position. The first measurement initializes the filter instead.
    pub fn update(&mut self, measurement: &Vector3<f64>) -> Vector3<f64> {
        if !self.initialized {
            self.initialize(measurement);
            return *measurement;
        }

        self.predict();

        // We observe position directly
        let h = Matrix3x6::new(
            1.0, 0.0, 0.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0, 0.0, 0.0,
        );

        let innovation = measurement - h * self.state;
        let s = h * self.covariance * h.transpose() + self.measurement_noise;

        if let Some(s_inv) = s.try_inverse() {
            let k = self.covariance * h.transpose() * s_inv;
            self.state += k * innovation;

            // Joseph form keeps the covariance symmetric positive-definite
            let i_kh = Matrix6::identity() - k * h;
            self.covariance = i_kh * self.covariance * i_kh.transpose()
                + k * self.measurement_noise * k.transpose();
        }

        self.position()
    }

    /// Current position estimate
    pub fn position(&self) -> Vector3<f64> {
        Vector3::new(self.state[0], self.state[1], self.state[2])
    }

    /// Current velocity estimate (length units per step)
    pub fn velocity(&self) -> Vector3<f64> {
        Vector3::new(self.state[3], self.state[4], self.state[5])
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Discard all state
    pub fn reset(&mut self) {
        self.state = Vector6::zeros();
        self.covariance = Matrix6::identity() * 100.0;
        self.initialized = false;
    }

    fn state_transition() -> Matrix6<f64> {
        Matrix6::new(
            1.0, 0.0, 0.0, 1.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 1.0, 0.0, 0.0, 1.0,
            0.0, 0.0, 0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 0.0, 0.0, 1.0,
        )
    }

    fn create_process_noise(position_noise: f64, velocity_noise: f64) -> Matrix6<f64> {
        let mut q = Matrix6::zeros();
        for i in 0..3 {
            q[(i, i)] = position_noise;
            q[(i + 3, i + 3)] = velocity_noise;
        }
        q
    }
}
