//! Synthetic-scenario driver for the tracking pipeline
//!
//! Runs the tracking loop over a simulated tool path with ideal sensor
//! readings, including a mid-run sensor dropout, and prints the per-step
//! outcomes. Pass a JSON configuration file to run against a real sensor
//! layout instead of the built-in demo layout.

use tooltrack::{
    Point3D, PolarMeasurement, RangeSample, SensorDescriptor, SensorKind, SensorReading,
    StepOutcome, TrackerConfig, TrackingLoop,
};

/// Demo layout: three RFID tags at bench height, one elevated tag for
/// vertical resolution, and one radar receiver
fn demo_config() -> TrackerConfig {
    TrackerConfig {
        sensors: vec![
            SensorDescriptor::rfid(1, Point3D::new(3.0, 4.0, 0.0)),
            SensorDescriptor::rfid(2, Point3D::new(9.0, 1.0, 0.0)),
            SensorDescriptor::rfid(3, Point3D::new(9.0, 7.0, 0.0)),
            SensorDescriptor::rfid(4, Point3D::new(3.0, 7.0, 3.0)),
            SensorDescriptor::radar(5, Point3D::new(0.0, 0.0, 2.0)),
        ],
        ..Default::default()
    }
}

/// Tool path: a straight pass across the work area with a slow plunge
fn tool_position(step: u64) -> Point3D {
    let t = step as f64 * 0.05;
    Point3D::new(4.0 + 2.0 * t, 3.0 + 1.5 * t, 1.0 + 0.2 * t)
}

/// Invert the path-loss model to get the RSSI a tag would report
fn rssi_for_distance(config: &TrackerConfig, distance: f64) -> f64 {
    let model = config.range_model;
    model.rssi_ref_dbm - 10.0 * model.path_loss_exponent * distance.log10()
}

/// Ideal sample batch for the target; `dropout` suppresses all but one
/// sensor to exercise the divergence path
fn synthesize_samples(config: &TrackerConfig, target: Point3D, dropout: bool) -> Vec<RangeSample> {
    let mut samples = Vec::new();
    for sensor in &config.sensors {
        if dropout && sensor.id != 1 {
            continue;
        }
        let reading = match sensor.kind {
            SensorKind::Rfid => {
                let distance = sensor.position.distance_to(&target);
                SensorReading::Rssi(rssi_for_distance(config, distance))
            }
            SensorKind::Radar => {
                let dx = target.x - sensor.position.x;
                let dy = target.y - sensor.position.y;
                let dz = target.z - sensor.position.z;
                let rho = (dx * dx + dy * dy + dz * dz).sqrt();
                SensorReading::Polar(PolarMeasurement {
                    rho,
                    theta: dy.atan2(dx),
                    phi: (dz / rho).acos(),
                })
            }
        };
        samples.push(RangeSample { sensor_id: sensor.id, reading });
    }
    samples
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let config = match args.get(1) {
        Some(path) => TrackerConfig::load_from_file(path)?,
        None => demo_config(),
    };
    config.validate()?;

    let mut tracker = TrackingLoop::new(config.clone())?;
    println!(
        "Tracking with {} sensors, convergence threshold {}",
        config.sensors.len(),
        config.convergence_threshold
    );

    for step in 0..20u64 {
        let target = tool_position(step);
        // Steps 8 and 9 lose all but one sensor
        let dropout = step == 8 || step == 9;
        let samples = synthesize_samples(&config, target, dropout);

        match tracker.step(&samples)? {
            StepOutcome::Accepted(estimate) => {
                println!(
                    "step {:2}: ({:7.4}, {:7.4}, {:7.4})  residual {:.2e}  true ({:.4}, {:.4}, {:.4})",
                    estimate.step,
                    estimate.position.x,
                    estimate.position.y,
                    estimate.position.z,
                    estimate.residual,
                    target.x,
                    target.y,
                    target.z,
                );
            }
            StepOutcome::Diverged(reason) => {
                println!("step {:2}: diverged ({:?})", step, reason);
            }
            StepOutcome::TrackingLost { consecutive } => {
                println!("step {:2}: track lost after {} divergent steps", step, consecutive);
                break;
            }
        }
    }

    if let Some(estimate) = tracker.current_estimate() {
        println!(
            "final accepted position: ({:.4}, {:.4}, {:.4}) after {} accepted steps",
            estimate.position.x,
            estimate.position.y,
            estimate.position.z,
            tracker.history().len()
        );
    }

    Ok(())
}
