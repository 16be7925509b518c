//! Latency compensation
//!
//! The pose and speed measurements describe where the vehicle was, not where
//! it will be when a command issued this cycle takes mechanical effect.
//! Projecting the state through the actuation delay with the last commanded
//! actuators lets the rest of the pipeline plan from the vehicle's actual
//! position at actuation time.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Vehicle state projected to the end of the actuation delay.
#[derive(Debug, Clone, Copy)]
pub struct PredictedState {
    /// Projected position in the global frame.
    ///
    /// Units: meters
    pub position_m: Vector2<f64>,

    /// Projected heading.
    ///
    /// Units: radians
    pub heading_rad: f64,

    /// Projected forward speed.
    ///
    /// Units: meters/second
    pub speed_ms: f64,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Advance the measured state by `latency_s`, assuming the last commanded
/// steering and acceleration stay applied over the whole delay.
///
/// One explicit Euler step of the kinematic bicycle model: speed first, then
/// heading from the updated speed, then position from the updated heading.
pub fn predict_state(
    position_m: &Vector2<f64>,
    heading_rad: f64,
    speed_ms: f64,
    steer_rad: f64,
    accel_mss: f64,
    latency_s: f64,
    wheelbase_m: f64,
) -> PredictedState {
    let speed = speed_ms + latency_s * accel_mss;
    let heading = heading_rad - latency_s * (speed * steer_rad / wheelbase_m);

    PredictedState {
        position_m: Vector2::new(
            position_m[0] + latency_s * speed * heading.cos(),
            position_m[1] + latency_s * speed * heading.sin(),
        ),
        heading_rad: heading,
        speed_ms: speed,
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_zero_latency_is_identity() {
        let predicted = predict_state(&Vector2::new(3.0, -2.0), 0.7, 1.5, 0.2, 0.8, 0.0, 0.325);

        assert_eq!(predicted.position_m, Vector2::new(3.0, -2.0));
        assert_eq!(predicted.heading_rad, 0.7);
        assert_eq!(predicted.speed_ms, 1.5);
    }

    #[test]
    fn test_euler_step() {
        let latency_s = 0.1;
        let wheelbase_m = 0.5;
        let (speed_ms, steer_rad, accel_mss) = (2.0, 0.1, 1.0);
        let heading_rad = 0.3;

        let predicted = predict_state(
            &Vector2::new(1.0, 1.0),
            heading_rad,
            speed_ms,
            steer_rad,
            accel_mss,
            latency_s,
            wheelbase_m,
        );

        let expected_speed = speed_ms + latency_s * accel_mss;
        let expected_heading =
            heading_rad - latency_s * (expected_speed * steer_rad / wheelbase_m);

        assert!((predicted.speed_ms - expected_speed).abs() < 1e-12);
        assert!((predicted.heading_rad - expected_heading).abs() < 1e-12);
        assert!(
            (predicted.position_m[0] - (1.0 + latency_s * expected_speed * expected_heading.cos()))
                .abs()
                < 1e-12
        );
        assert!(
            (predicted.position_m[1] - (1.0 + latency_s * expected_speed * expected_heading.sin()))
                .abs()
                < 1e-12
        );
    }

    #[test]
    fn test_straight_line_projection() {
        // No steering, no acceleration: the vehicle just moves along its
        // heading by v * latency
        let predicted = predict_state(&Vector2::new(0.0, 0.0), 0.0, 2.0, 0.0, 0.0, 0.5, 0.325);

        assert!((predicted.position_m[0] - 1.0).abs() < 1e-12);
        assert!(predicted.position_m[1].abs() < 1e-12);
        assert_eq!(predicted.heading_rad, 0.0);
    }
}
