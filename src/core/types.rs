//! Core data types for the tool-head positioning system

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// 3D position in the fixed world frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3D {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: &Point3D) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2) + (self.z - other.z).powi(2))
            .sqrt()
    }

    /// Centroid of a set of points; the origin for an empty set
    pub fn centroid(points: &[Point3D]) -> Point3D {
        if points.is_empty() {
            return Point3D::new(0.0, 0.0, 0.0);
        }
        let n = points.len() as f64;
        let sum = points.iter().fold((0.0, 0.0, 0.0), |acc, p| {
            (acc.0 + p.x, acc.1 + p.y, acc.2 + p.z)
        });
        Point3D::new(sum.0 / n, sum.1 / n, sum.2 / n)
    }

    pub fn to_vector(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    pub fn from_vector(v: &Vector3<f64>) -> Self {
        Self { x: v.x, y: v.y, z: v.z }
    }
}

/// Measurement in a sensor's own frame, physics convention:
/// phi is the polar angle from +z, theta the azimuth in the x-y plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolarMeasurement {
    /// Radial distance (length units, >= 0)
    pub rho: f64,
    /// Azimuthal angle (radians)
    pub theta: f64,
    /// Polar angle from the z-axis (radians, in [0, pi])
    pub phi: f64,
}

/// Kind of fixed-position sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorKind {
    /// RFID tag; distance inferred from RSSI via the path-loss model
    Rfid,
    /// Radar-style receiver reporting the target in polar coordinates
    Radar,
}

/// Fixed sensor placement, supplied by configuration and immutable for
/// the lifetime of a track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorDescriptor {
    /// Unique sensor identifier
    pub id: u16,
    /// Sensor position in the world frame
    pub position: Point3D,
    /// Sensor kind, deciding how its samples are interpreted
    pub kind: SensorKind,
    /// Solver contribution weight (RSSI ranging is noisier than radar,
    /// so RFID sensors carry a lower default)
    pub weight: f64,
}

impl SensorDescriptor {
    /// RFID tag at a fixed position with the kind-default weight
    pub fn rfid(id: u16, position: Point3D) -> Self {
        Self { id, position, kind: SensorKind::Rfid, weight: crate::core::DEFAULT_RFID_WEIGHT }
    }

    /// Radar receiver at a fixed position with the kind-default weight
    pub fn radar(id: u16, position: Point3D) -> Self {
        Self { id, position, kind: SensorKind::Radar, weight: crate::core::DEFAULT_RADAR_WEIGHT }
    }
}

/// One raw reading from one sensor at one time step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeSample {
    /// Identifier of the reporting sensor
    pub sensor_id: u16,
    /// The reading itself, shaped by the sensor kind
    pub reading: SensorReading,
}

/// Sensor reading payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SensorReading {
    /// Received signal strength (dBm) from an RFID tag
    Rssi(f64),
    /// Polar fix from a radar receiver
    Polar(PolarMeasurement),
}

/// One solver constraint: the target is `distance` away from `position`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeAnchor {
    /// Anchor position in the world frame
    pub position: Point3D,
    /// Estimated distance from the anchor to the target
    pub distance: f64,
    /// Relative confidence weight (> 0)
    pub weight: f64,
}

/// Accepted position estimate for one discrete time step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    /// Estimated tool-head position
    pub position: Point3D,
    /// Discrete time step the estimate belongs to
    pub step: u64,
    /// Weighted RMS range error across contributing anchors
    pub residual: f64,
}
