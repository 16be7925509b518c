//! # MPC solver interface
//!
//! The optimisation routine is an external collaborator: each cycle it is
//! handed a vehicle frame state vector and the local path polynomial, and
//! hands back the next actuator values plus the trajectory it predicts. The
//! trait seam keeps the backend swappable; [`GradientSolver`] is the
//! implementation shipped with the executable.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod gradient;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use gradient::GradientSolver;

use nalgebra::{Vector2, Vector6};
use std::time::Duration;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// State vector handed to the solver: (x, y, psi, v, cte, epsi).
///
/// Position and heading are zero by construction, the frame transform has
/// already re-centred the problem on the vehicle.
pub type SolverState = Vector6<f64>;

/// The output of one solve.
#[derive(Debug, Clone)]
pub struct SolverSolution {
    /// Next commanded steering angle, positive turning the heading down.
    ///
    /// Units: radians
    pub steer_rad: f64,

    /// Next commanded acceleration.
    ///
    /// Units: meters/second^2
    pub accel_mss: f64,

    /// Predicted trajectory in the vehicle frame. Consumed only by the debug
    /// visualization.
    ///
    /// Units: meters
    pub predicted_traj_m: Vec<Vector2<f64>>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during a solve.
#[derive(Debug, thiserror::Error)]
pub enum SolverError {
    /// The iteration budget ran out before the cost settled. The caller may
    /// fall back on the previous command.
    #[error("The solve did not converge within {iters} iterations")]
    NonConverged { iters: usize },

    /// The wall clock deadline was exceeded. The caller may fall back on the
    /// previous command.
    #[error("The solve exceeded its deadline of {deadline_s:.3} s")]
    DeadlineExceeded { deadline_s: f64 },

    /// The cost or state went non-finite. Not recoverable.
    #[error("The solve produced a non-finite value")]
    NonFinite,
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// The optimisation routine invoked once per control cycle.
pub trait Solver {
    /// Solve for the actuator sequence that best tracks the fitted path.
    ///
    /// `coeffs` are the ascending coefficients of the local path polynomial.
    /// Implementations shall give up with [`SolverError::DeadlineExceeded`]
    /// once `deadline` has elapsed rather than stall the control loop.
    fn solve(
        &mut self,
        state: &SolverState,
        coeffs: &[f64],
        deadline: Duration,
    ) -> Result<SolverSolution, SolverError>;
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SolverError {
    /// True for errors a cycle can recover from by holding the last command.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, SolverError::NonFinite)
    }
}
