//! System parameter defaults

/// Default convergence threshold for the solver and tracking loop (length units)
pub const DEFAULT_CONVERGENCE_THRESHOLD: f64 = 0.001;

/// Default RSSI at the reference distance (dBm)
pub const DEFAULT_RSSI_REFERENCE_DBM: f64 = -30.0;

/// Default path-loss exponent for free-space-like propagation
pub const DEFAULT_PATH_LOSS_EXPONENT: f64 = 2.0;

/// Default solver weight for RSSI-ranged RFID tags
pub const DEFAULT_RFID_WEIGHT: f64 = 1.0;

/// Default solver weight for radar polar fixes, which are far less noisy
/// than RSSI ranging
pub const DEFAULT_RADAR_WEIGHT: f64 = 4.0;
