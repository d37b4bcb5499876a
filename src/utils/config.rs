//! Configuration surface for the tracking pipeline
//!
//! Tag positions, RSSI constants, and loop thresholds are explicit values
//! handed to the tracking loop at construction rather than process-wide
//! globals, so independent tracks can carry independent configurations.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::algorithms::range_model::RangeModel;
use crate::core::{SensorDescriptor, DEFAULT_CONVERGENCE_THRESHOLD};
use crate::validation::error::{PositioningError, PositioningResult};

/// Errors around configuration file handling
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file could not be read or written
    #[error("configuration file error: {0}")]
    Io(#[from] std::io::Error),
    /// Configuration file did not parse as valid JSON
    #[error("configuration parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Tracking-loop parameters plus the fixed sensor table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Positional delta below which a solve counts as converged (length units)
    pub convergence_threshold: f64,
    /// Iteration budget for one solve
    pub max_iterations: usize,
    /// Minimum usable samples per step before the step diverges
    pub min_sensors: usize,
    /// Consecutive divergent steps tolerated before the track is lost
    pub max_consecutive_divergences: u32,
    /// RSSI-to-distance model shared by all RFID sensors
    pub range_model: RangeModel,
    /// Smooth accepted estimates through the Kalman filter
    pub enable_smoothing: bool,
    /// Fixed sensor placements, immutable for the lifetime of a track
    pub sensors: Vec<SensorDescriptor>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            convergence_threshold: DEFAULT_CONVERGENCE_THRESHOLD,
            max_iterations: 50,
            min_sensors: 3,
            max_consecutive_divergences: 4,
            range_model: RangeModel::default(),
            enable_smoothing: false,
            sensors: Vec::new(),
        }
    }
}

impl TrackerConfig {
    /// Check every parameter against its valid range
    pub fn validate(&self) -> PositioningResult<()> {
        if !self.convergence_threshold.is_finite() || self.convergence_threshold <= 0.0 {
            return Err(PositioningError::InvalidConfiguration {
                parameter: "convergence_threshold".to_string(),
                reason: format!("must be finite and > 0, got {}", self.convergence_threshold),
            });
        }
        if self.max_iterations == 0 {
            return Err(PositioningError::InvalidConfiguration {
                parameter: "max_iterations".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.min_sensors < 3 {
            return Err(PositioningError::InvalidConfiguration {
                parameter: "min_sensors".to_string(),
                reason: format!("a 3D fix needs at least 3 sensors, got {}", self.min_sensors),
            });
        }
        if self.max_consecutive_divergences == 0 {
            return Err(PositioningError::InvalidConfiguration {
                parameter: "max_consecutive_divergences".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.sensors.is_empty() {
            return Err(PositioningError::InvalidConfiguration {
                parameter: "sensors".to_string(),
                reason: "sensor table is empty".to_string(),
            });
        }
        // Re-run the model's own constructor checks on deserialized values
        RangeModel::new(self.range_model.rssi_ref_dbm, self.range_model.path_loss_exponent)?;
        Ok(())
    }

    /// Load a configuration from a JSON file; validation stays with the
    /// consumer so a bad file is still inspectable
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Write the configuration to a JSON file, pretty-printed
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }
}
