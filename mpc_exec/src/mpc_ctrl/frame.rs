//! Frame transformation
//!
//! Maps points between the global frame and the vehicle frame. The vehicle
//! frame has its origin at the latency-projected position with the x axis
//! along the projected heading, so a point's x coordinate is its distance
//! ahead of the vehicle and its y coordinate its lateral offset.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;

// Internal
use super::PredictedState;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Transform a global frame point into the vehicle frame.
pub fn global_to_vehicle(point_m: &Vector2<f64>, origin: &PredictedState) -> Vector2<f64> {
    let dx = point_m[0] - origin.position_m[0];
    let dy = point_m[1] - origin.position_m[1];
    let (sin_psi, cos_psi) = origin.heading_rad.sin_cos();

    Vector2::new(dx * cos_psi + dy * sin_psi, -dx * sin_psi + dy * cos_psi)
}

/// Transform a vehicle frame point back into the global frame.
///
/// Exact inverse of [`global_to_vehicle`].
pub fn vehicle_to_global(point_m: &Vector2<f64>, origin: &PredictedState) -> Vector2<f64> {
    let (sin_psi, cos_psi) = origin.heading_rad.sin_cos();
    let x_rot = point_m[0] * cos_psi - point_m[1] * sin_psi;
    let y_rot = point_m[0] * sin_psi + point_m[1] * cos_psi;

    Vector2::new(
        x_rot + origin.position_m[0],
        y_rot + origin.position_m[1],
    )
}

/// Transform a whole window into the vehicle frame, preserving order.
pub fn window_to_vehicle(
    window_m: &[Vector2<f64>],
    origin: &PredictedState,
) -> Vec<Vector2<f64>> {
    window_m
        .iter()
        .map(|point| global_to_vehicle(point, origin))
        .collect()
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    fn origin(x: f64, y: f64, heading_rad: f64) -> PredictedState {
        PredictedState {
            position_m: Vector2::new(x, y),
            heading_rad,
            speed_ms: 0.0,
        }
    }

    #[test]
    fn test_point_ahead_maps_to_positive_x() {
        // Vehicle at (1, 1) pointing along +y, a point further up the y axis
        // is straight ahead of it
        let origin = origin(1.0, 1.0, PI / 2.0);
        let local = global_to_vehicle(&Vector2::new(1.0, 3.0), &origin);

        assert!((local[0] - 2.0).abs() < 1e-12);
        assert!(local[1].abs() < 1e-12);
    }

    #[test]
    fn test_point_left_maps_to_positive_y() {
        // Vehicle pointing along +x, a point above it is to its left
        let origin = origin(0.0, 0.0, 0.0);
        let local = global_to_vehicle(&Vector2::new(0.0, 1.5), &origin);

        assert!(local[0].abs() < 1e-12);
        assert!((local[1] - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_round_trip_is_identity() {
        let origin = origin(-3.2, 7.7, 2.1);
        let points = [
            Vector2::new(0.0, 0.0),
            Vector2::new(10.0, -4.0),
            Vector2::new(-2.5, 0.1),
        ];

        for point in points.iter() {
            let there = global_to_vehicle(point, &origin);
            let back = vehicle_to_global(&there, &origin);

            assert!((back - point).norm() < 1e-12);
        }
    }

    #[test]
    fn test_window_transform_preserves_order() {
        let origin = origin(1.0, 0.0, 0.0);
        let window = vec![Vector2::new(2.0, 0.0), Vector2::new(3.0, 1.0)];

        let local = window_to_vehicle(&window, &origin);

        assert_eq!(local.len(), 2);
        assert!((local[0] - Vector2::new(1.0, 0.0)).norm() < 1e-12);
        assert!((local[1] - Vector2::new(2.0, 1.0)).norm() < 1e-12);
    }
}
