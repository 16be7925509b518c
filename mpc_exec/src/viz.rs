//! # Debug visualization output
//!
//! Computes the global frame polylines a debug renderer consumes: the
//! stabilised local window, the solver's predicted trajectory, and the
//! fitted polynomial sampled at fixed x intervals. All three are produced in
//! the vehicle frame by the pipeline and mapped back through the inverse
//! frame transform here. The rendering itself is an external collaborator,
//! the polylines are written as JSON through the session save thread.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use serde::Serialize;

// Internal
use crate::mpc_ctrl::{vehicle_to_global, OutputData, PredictedState};
use util::session;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Upper end of the polynomial sampling range.
///
/// Units: meters
const POLY_SAMPLE_MAX_X_M: f64 = 2.0;

/// Sampling interval for the fitted polynomial.
///
/// Units: meters
const POLY_SAMPLE_STEP_M: f64 = 0.2;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A named polyline in the global frame.
#[derive(Serialize)]
pub struct VizPolyline {
    pub name: &'static str,
    pub points_m: Vec<[f64; 2]>,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Save this cycle's debug polylines into the session.
pub fn save_cycle(output: &OutputData) {
    session::save(
        "viz/local_window.json",
        polyline("local_window", &output.window_veh_m, &output.predicted),
    );

    session::save(
        "viz/predicted_traj.json",
        polyline("predicted_traj", &output.predicted_traj_m, &output.predicted),
    );

    let mut samples = Vec::new();
    let mut x_m = 0.0;
    while x_m < POLY_SAMPLE_MAX_X_M + 0.5 * POLY_SAMPLE_STEP_M {
        samples.push(Vector2::new(x_m, output.fit.eval(x_m)));
        x_m += POLY_SAMPLE_STEP_M;
    }

    session::save(
        "viz/fitted_poly.json",
        polyline("fitted_poly", &samples, &output.predicted),
    );
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Map a vehicle frame point sequence into a global frame polyline.
fn polyline(
    name: &'static str,
    points_veh_m: &[Vector2<f64>],
    origin: &PredictedState,
) -> VizPolyline {
    VizPolyline {
        name,
        points_m: points_veh_m
            .iter()
            .map(|point| {
                let global = vehicle_to_global(point, origin);
                [global[0], global[1]]
            })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_polyline_maps_back_to_global() {
        let origin = PredictedState {
            position_m: Vector2::new(2.0, 1.0),
            heading_rad: 0.0,
            speed_ms: 0.0,
        };
        let window = vec![Vector2::new(1.0, 0.5), Vector2::new(2.0, -0.5)];

        let line = polyline("test", &window, &origin);

        assert_eq!(line.points_m.len(), 2);
        assert!((line.points_m[0][0] - 3.0).abs() < 1e-12);
        assert!((line.points_m[0][1] - 1.5).abs() < 1e-12);
        assert!((line.points_m[1][0] - 4.0).abs() < 1e-12);
        assert!((line.points_m[1][1] - 0.5).abs() < 1e-12);
    }
}
