//! Spherical-to-cartesian coordinate transform
//!
//! Radar receivers report the target relative to their own frame as
//! (rho, theta, phi); this module lifts such a fix into the world frame
//! given the sensor's known position.

use crate::core::{Point3D, PolarMeasurement};
use crate::validation::error::{PositioningError, PositioningResult};

/// Convert a sensor-relative polar measurement into an absolute position.
///
/// Physics convention: phi is the polar angle measured from the +z axis,
/// theta the azimuth in the x-y plane. A negative rho is rejected as
/// malformed input; angles are taken as given.
pub fn to_absolute(
    reference: Point3D,
    measurement: &PolarMeasurement,
) -> PositioningResult<Point3D> {
    if measurement.rho < 0.0 {
        return Err(PositioningError::NegativeRange { rho: measurement.rho });
    }

    let planar = measurement.rho * measurement.phi.sin();
    Ok(Point3D::new(
        reference.x + planar * measurement.theta.cos(),
        reference.y + planar * measurement.theta.sin(),
        reference.z + measurement.rho * measurement.phi.cos(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

    #[test]
    fn test_zero_rho_returns_reference() {
        let reference = Point3D::new(4.2, -1.0, 9.5);
        let measurement = PolarMeasurement { rho: 0.0, theta: 1.3, phi: 2.2 };

        let absolute = to_absolute(reference, &measurement).unwrap();
        assert_eq!(absolute, reference);
    }

    #[test]
    fn test_measurement_along_z_axis() {
        let reference = Point3D::new(0.0, 0.0, 0.0);
        let measurement = PolarMeasurement { rho: 5.0, theta: 0.0, phi: 0.0 };

        let absolute = to_absolute(reference, &measurement).unwrap();
        assert_relative_eq!(absolute.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(absolute.y, 0.0, epsilon = 1e-12);
        assert_relative_eq!(absolute.z, 5.0);
    }

    #[test]
    fn test_measurement_in_xy_plane() {
        // phi = pi/2 puts the fix in the x-y plane
        let reference = Point3D::new(1.0, 2.0, 3.0);
        let measurement = PolarMeasurement { rho: 2.0, theta: FRAC_PI_4, phi: FRAC_PI_2 };

        let absolute = to_absolute(reference, &measurement).unwrap();
        let expected = 2.0 * FRAC_PI_4.cos();
        assert_relative_eq!(absolute.x, 1.0 + expected, epsilon = 1e-12);
        assert_relative_eq!(absolute.y, 2.0 + expected, epsilon = 1e-12);
        assert_relative_eq!(absolute.z, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_offset_preserves_range() {
        let reference = Point3D::new(-3.0, 7.0, 1.5);
        let measurement = PolarMeasurement { rho: 12.5, theta: 2.1, phi: 0.8 };

        let absolute = to_absolute(reference, &measurement).unwrap();
        assert_relative_eq!(reference.distance_to(&absolute), 12.5, epsilon = 1e-9);
    }

    #[test]
    fn test_negative_rho_rejected() {
        let reference = Point3D::new(0.0, 0.0, 0.0);
        let measurement = PolarMeasurement { rho: -1.0, theta: 0.0, phi: 0.0 };

        let result = to_absolute(reference, &measurement);
        assert_eq!(result, Err(PositioningError::NegativeRange { rho: -1.0 }));
    }
}
