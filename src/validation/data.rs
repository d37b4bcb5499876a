//! Boundary validation of per-step measurement batches
//!
//! Every sample is resolved against the configured sensor table and turned
//! into a solver anchor before any numerics run. Malformed input is an
//! error to the caller, never a silently dropped message: a batch either
//! resolves completely or fails on its first bad sample.

use std::collections::HashMap;
use std::f64::consts::PI;

use crate::algorithms::range_model::RangeModel;
use crate::algorithms::transform;
use crate::core::{
    PolarMeasurement, RangeAnchor, RangeSample, SensorDescriptor, SensorKind, SensorReading,
};
use crate::validation::error::{PositioningError, PositioningResult};

/// Resolves raw samples into solver anchors against an immutable sensor table
pub struct SampleValidator {
    /// Configured sensors indexed by id
    sensors: HashMap<u16, SensorDescriptor>,
    /// RSSI-to-distance model shared by all RFID sensors
    range_model: RangeModel,
}

impl SampleValidator {
    /// Build a validator over the configured sensor set
    pub fn new(
        sensors: Vec<SensorDescriptor>,
        range_model: RangeModel,
    ) -> PositioningResult<Self> {
        let mut table = HashMap::with_capacity(sensors.len());
        for sensor in sensors {
            if !sensor.weight.is_finite() || sensor.weight <= 0.0 {
                return Err(PositioningError::InvalidConfiguration {
                    parameter: format!("sensor {} weight", sensor.id),
                    reason: format!("must be finite and > 0, got {}", sensor.weight),
                });
            }
            let id = sensor.id;
            if table.insert(id, sensor).is_some() {
                return Err(PositioningError::InvalidConfiguration {
                    parameter: "sensors".to_string(),
                    reason: format!("duplicate sensor id {}", id),
                });
            }
        }
        Ok(Self { sensors: table, range_model })
    }

    pub fn sensor_count(&self) -> usize {
        self.sensors.len()
    }

    /// Resolve one sample into a solver anchor.
    ///
    /// RFID readings become a range constraint from the tag position;
    /// radar readings become an absolute-position hypothesis, encoded as a
    /// zero-range anchor so it constrains all three axes in the same
    /// least-squares objective.
    pub fn resolve(&self, sample: &RangeSample) -> PositioningResult<RangeAnchor> {
        let sensor = self
            .sensors
            .get(&sample.sensor_id)
            .ok_or(PositioningError::UnknownSensor { sensor_id: sample.sensor_id })?;

        match (&sensor.kind, &sample.reading) {
            (SensorKind::Rfid, SensorReading::Rssi(rssi)) => {
                if !rssi.is_finite() {
                    return Err(PositioningError::MalformedSample {
                        sensor_id: sensor.id,
                        reason: format!("non-finite RSSI {}", rssi),
                    });
                }
                let distance = self.range_model.distance_from_rssi(*rssi);
                if !distance.is_finite() {
                    return Err(PositioningError::MalformedSample {
                        sensor_id: sensor.id,
                        reason: format!("RSSI {} maps to a non-finite distance", rssi),
                    });
                }
                Ok(RangeAnchor { position: sensor.position, distance, weight: sensor.weight })
            }
            (SensorKind::Radar, SensorReading::Polar(polar)) => {
                self.check_polar(sensor.id, polar)?;
                let hypothesis =
                    transform::to_absolute(sensor.position, polar).map_err(|e| {
                        PositioningError::MalformedSample {
                            sensor_id: sensor.id,
                            reason: e.to_string(),
                        }
                    })?;
                Ok(RangeAnchor { position: hypothesis, distance: 0.0, weight: sensor.weight })
            }
            (SensorKind::Rfid, SensorReading::Polar(_)) => {
                Err(PositioningError::MalformedSample {
                    sensor_id: sensor.id,
                    reason: "polar reading from an RFID sensor".to_string(),
                })
            }
            (SensorKind::Radar, SensorReading::Rssi(_)) => {
                Err(PositioningError::MalformedSample {
                    sensor_id: sensor.id,
                    reason: "RSSI reading from a radar sensor".to_string(),
                })
            }
        }
    }

    /// Resolve a whole batch, failing on the first malformed sample
    pub fn resolve_batch(&self, samples: &[RangeSample]) -> PositioningResult<Vec<RangeAnchor>> {
        samples.iter().map(|sample| self.resolve(sample)).collect()
    }

    fn check_polar(&self, sensor_id: u16, polar: &PolarMeasurement) -> PositioningResult<()> {
        if !polar.rho.is_finite() || polar.rho < 0.0 {
            return Err(PositioningError::MalformedSample {
                sensor_id,
                reason: format!("radial distance must be finite and >= 0, got {}", polar.rho),
            });
        }
        if !polar.theta.is_finite() {
            return Err(PositioningError::MalformedSample {
                sensor_id,
                reason: format!("non-finite azimuth {}", polar.theta),
            });
        }
        if !polar.phi.is_finite() || !(0.0..=PI).contains(&polar.phi) {
            return Err(PositioningError::MalformedSample {
                sensor_id,
                reason: format!("polar angle must lie in [0, pi], got {}", polar.phi),
            });
        }
        Ok(())
    }
}
