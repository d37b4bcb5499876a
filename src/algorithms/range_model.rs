//! Log-distance path-loss model for RSSI ranging
//!
//! RFID tags do not report distance; the reader reports received signal
//! strength, and the distance is inferred from the drop relative to a
//! calibrated reference power. The output is a noisy estimate, never
//! ground truth, and the solver weights it accordingly.

use serde::{Deserialize, Serialize};

use crate::core::{DEFAULT_PATH_LOSS_EXPONENT, DEFAULT_RSSI_REFERENCE_DBM};
use crate::validation::error::{PositioningError, PositioningResult};

/// Log-distance path-loss model: d = 10^((rssi_ref - rssi) / (10 n))
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeModel {
    /// RSSI at the reference distance (dBm)
    pub rssi_ref_dbm: f64,
    /// Path-loss exponent n (environment dependent, > 0)
    pub path_loss_exponent: f64,
}

impl Default for RangeModel {
    fn default() -> Self {
        Self {
            rssi_ref_dbm: DEFAULT_RSSI_REFERENCE_DBM,
            path_loss_exponent: DEFAULT_PATH_LOSS_EXPONENT,
        }
    }
}

impl RangeModel {
    /// Build a model, rejecting a non-positive or non-finite exponent
    pub fn new(rssi_ref_dbm: f64, path_loss_exponent: f64) -> PositioningResult<Self> {
        if !rssi_ref_dbm.is_finite() {
            return Err(PositioningError::InvalidConfiguration {
                parameter: "rssi_ref_dbm".to_string(),
                reason: format!("must be finite, got {}", rssi_ref_dbm),
            });
        }
        if !path_loss_exponent.is_finite() || path_loss_exponent <= 0.0 {
            return Err(PositioningError::InvalidConfiguration {
                parameter: "path_loss_exponent".to_string(),
                reason: format!("must be > 0, got {}", path_loss_exponent),
            });
        }
        Ok(Self { rssi_ref_dbm, path_loss_exponent })
    }

    /// Estimated distance for a raw RSSI sample; always >= 0 by construction
    pub fn distance_from_rssi(&self, rssi: f64) -> f64 {
        10f64.powf((self.rssi_ref_dbm - rssi) / (10.0 * self.path_loss_exponent))
    }
}
