//! Parameters structure for MpcCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for MPC control.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    // ---- HORIZON ----
    /// Number of steps in the solver's prediction horizon.
    pub steps_ahead: usize,

    /// Discretisation step of the prediction horizon.
    ///
    /// Units: seconds
    pub dt_s: f64,

    // ---- VEHICLE ----
    /// Delay between a command being issued and the actuation taking
    /// mechanical effect.
    ///
    /// Units: seconds
    pub latency_s: f64,

    /// Effective wheelbase (distance from the centre of gravity to the front
    /// axle) of the bicycle model.
    ///
    /// Units: meters
    pub wheelbase_m: f64,

    /// The forward speed the solver should track.
    ///
    /// Units: meters/second
    pub target_speed_ms: f64,

    // ---- COST WEIGHTS ----
    /// Weight on the cross track error.
    pub cte_coeff: f64,

    /// Weight on the heading error.
    pub epsi_coeff: f64,

    /// Weight on the deviation from the target speed.
    pub speed_coeff: f64,

    /// Weight on the steering magnitude.
    pub steer_coeff: f64,

    /// Weight on the acceleration magnitude.
    pub acc_coeff: f64,

    /// Weight on the steering change between consecutive horizon steps.
    pub consec_steer_coeff: f64,

    /// Weight on the acceleration change between consecutive horizon steps.
    pub consec_acc_coeff: f64,

    // ---- LOCAL WINDOW ----
    /// Number of path points collected for the local fit.
    pub window_len: usize,

    /// Number of points to step back from the closest point when starting
    /// the window.
    pub back_offset: usize,

    /// Stride between collected window points.
    pub stride: usize,

    /// Minimum forward spacing between accepted window points.
    ///
    /// Units: meters
    pub min_x_delta_m: f64,

    /// Degree of the fitted polynomial.
    pub poly_degree: usize,

    // ---- ACTUATORS ----
    /// Centre offset of the steering actuator convention. The emitted
    /// steering demand is this offset minus the solver's steering angle.
    ///
    /// Units: radians
    pub steer_center_rad: f64,

    /// Largest steering magnitude the solver may command.
    ///
    /// Units: radians
    pub max_steer_rad: f64,

    /// Largest acceleration magnitude the solver may command.
    ///
    /// Units: meters/second^2
    pub max_accel_mss: f64,

    // ---- SOLVER ----
    /// Maximum number of solver iterations per cycle.
    pub solver_max_iters: usize,

    /// Initial gradient descent step size.
    pub solver_learning_rate: f64,

    /// Relative cost improvement under which the solve counts as converged.
    pub solver_converge_tol: f64,

    /// Wall clock budget for a single solve.
    ///
    /// Units: seconds
    pub solver_deadline_s: f64,

    /// Number of consecutive recoverable solver failures tolerated before
    /// the safe stop command is emitted.
    pub max_consec_solver_failures: u64,

    /// Acceleration commanded by the safe stop fallback.
    ///
    /// Units: meters/second^2
    pub safe_stop_accel_mss: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A parameter value (or combination) that cannot be run with.
#[derive(Debug, thiserror::Error)]
#[error("Invalid parameters: {0}")]
pub struct InvalidParams(pub String);

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Check that the loaded values make sense together.
    ///
    /// A file that deserialises cleanly can still describe an unusable
    /// configuration, which must be caught before the control loop starts.
    pub fn validate(&self) -> Result<(), InvalidParams> {
        let fail = |msg: &str| Err(InvalidParams(msg.into()));

        if self.steps_ahead == 0 {
            return fail("steps_ahead must be at least 1");
        }
        if self.dt_s <= 0.0 {
            return fail("dt_s must be positive");
        }
        if self.latency_s < 0.0 {
            return fail("latency_s cannot be negative");
        }
        if self.wheelbase_m <= 0.0 {
            return fail("wheelbase_m must be positive");
        }
        if self.poly_degree == 0 {
            return fail("poly_degree must be at least 1");
        }
        if self.stride == 0 {
            return fail("stride must be at least 1");
        }
        if self.window_len < self.poly_degree + 1 {
            return fail("window_len must be at least poly_degree + 1");
        }
        if self.max_steer_rad <= 0.0 || self.max_accel_mss <= 0.0 {
            return fail("actuator limits must be positive");
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
