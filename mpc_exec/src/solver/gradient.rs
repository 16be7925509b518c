//! Reference gradient descent solver
//!
//! Rolls the kinematic bicycle model out over the prediction horizon and
//! minimises the configured cost by numerical gradient descent over the
//! actuator sequence, warm started from the previous cycle's solution. A
//! backtracking step keeps the cost monotonically decreasing, so the solve
//! either settles below the convergence tolerance, runs out of iterations
//! (reported as non-convergence) or runs out of wall clock (reported as a
//! deadline overrun).

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use std::time::{Duration, Instant};

// Internal
use super::{Solver, SolverError, SolverSolution, SolverState};
use crate::mpc_ctrl::Params;
use util::maths::{poly_deriv_val, poly_val, wrap_to_pi};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Perturbation used for the forward difference gradient.
const GRAD_EPS: f64 = 1e-6;

/// Number of step halvings tried before a descent direction is given up on.
const MAX_BACKTRACKS: usize = 8;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Gradient descent MPC solver.
pub struct GradientSolver {
    params: Params,

    /// Previous cycle's actuator sequence, used as the warm start.
    prev_controls: Option<Vec<f64>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl GradientSolver {
    /// Create a new solver from the module parameters.
    pub fn from_params(params: &Params) -> Self {
        Self {
            params: params.clone(),
            prev_controls: None,
        }
    }

    /// Build the initial actuator sequence, shifting the previous solution
    /// one step forward and repeating its final pair.
    fn warm_start(&self) -> Vec<f64> {
        let len = 2 * self.params.steps_ahead;

        match self.prev_controls {
            Some(ref prev) if prev.len() == len => {
                let mut controls = prev[2..].to_vec();
                controls.extend_from_slice(&prev[len - 2..]);
                controls
            }
            _ => vec![0.0; len],
        }
    }

    /// Advance the bicycle model state by one horizon step.
    fn step_state(
        &self,
        state: (f64, f64, f64, f64),
        steer_rad: f64,
        accel_mss: f64,
    ) -> (f64, f64, f64, f64) {
        let (x, y, psi, v) = state;
        let dt = self.params.dt_s;

        (
            x + v * psi.cos() * dt,
            y + v * psi.sin() * dt,
            psi - v * steer_rad / self.params.wheelbase_m * dt,
            v + accel_mss * dt,
        )
    }

    /// Total cost of an actuator sequence over the horizon.
    fn rollout_cost(&self, state: &SolverState, coeffs: &[f64], controls: &[f64]) -> f64 {
        let p = &self.params;
        let mut model = (state[0], state[1], state[2], state[3]);
        let mut cost = 0.0;

        for i in 0..p.steps_ahead {
            let steer = controls[2 * i];
            let accel = controls[2 * i + 1];

            model = self.step_state(model, steer, accel);
            let (x, y, psi, v) = model;

            // Tracking terms against the fitted path
            let cte = poly_val(x, coeffs) - y;
            let epsi = wrap_to_pi(psi - poly_deriv_val(x, coeffs).atan());

            cost += p.cte_coeff * cte * cte;
            cost += p.epsi_coeff * epsi * epsi;
            cost += p.speed_coeff * (v - p.target_speed_ms).powi(2);

            // Actuator magnitude terms
            cost += p.steer_coeff * steer * steer;
            cost += p.acc_coeff * accel * accel;

            // Actuator smoothness terms
            if i > 0 {
                let prev_steer = controls[2 * (i - 1)];
                let prev_accel = controls[2 * (i - 1) + 1];
                cost += p.consec_steer_coeff * (steer - prev_steer).powi(2);
                cost += p.consec_acc_coeff * (accel - prev_accel).powi(2);
            }
        }

        cost
    }

    /// Positions visited by an actuator sequence, in the vehicle frame.
    fn rollout_trajectory(&self, state: &SolverState, controls: &[f64]) -> Vec<Vector2<f64>> {
        let mut model = (state[0], state[1], state[2], state[3]);
        let mut trajectory = Vec::with_capacity(self.params.steps_ahead);

        for i in 0..self.params.steps_ahead {
            model = self.step_state(model, controls[2 * i], controls[2 * i + 1]);
            trajectory.push(Vector2::new(model.0, model.1));
        }

        trajectory
    }

    /// Take a gradient step of the given size, saturating each actuator.
    fn stepped(&self, controls: &[f64], gradient: &[f64], step: f64) -> Vec<f64> {
        controls
            .iter()
            .zip(gradient.iter())
            .enumerate()
            .map(|(i, (control, grad))| {
                let limit = if i % 2 == 0 {
                    self.params.max_steer_rad
                } else {
                    self.params.max_accel_mss
                };

                (control - step * grad).clamp(-limit, limit)
            })
            .collect()
    }
}

impl Solver for GradientSolver {
    fn solve(
        &mut self,
        state: &SolverState,
        coeffs: &[f64],
        deadline: Duration,
    ) -> Result<SolverSolution, SolverError> {
        let start = Instant::now();
        let num_vars = 2 * self.params.steps_ahead;

        let mut controls = self.warm_start();
        let mut cost = self.rollout_cost(state, coeffs, &controls);

        if !cost.is_finite() {
            return Err(SolverError::NonFinite);
        }

        let mut converged = false;

        for _ in 0..self.params.solver_max_iters {
            if start.elapsed() >= deadline {
                return Err(SolverError::DeadlineExceeded {
                    deadline_s: deadline.as_secs_f64(),
                });
            }

            // Forward difference gradient
            let mut gradient = vec![0.0; num_vars];
            for i in 0..num_vars {
                let mut perturbed = controls.clone();
                perturbed[i] += GRAD_EPS;
                gradient[i] = (self.rollout_cost(state, coeffs, &perturbed) - cost) / GRAD_EPS;
            }

            // Backtracking descent step
            let mut step = self.params.solver_learning_rate;
            let mut improved = false;

            for _ in 0..MAX_BACKTRACKS {
                let candidate = self.stepped(&controls, &gradient, step);
                let candidate_cost = self.rollout_cost(state, coeffs, &candidate);

                if !candidate_cost.is_finite() {
                    return Err(SolverError::NonFinite);
                }

                if candidate_cost < cost {
                    let improvement = cost - candidate_cost;
                    controls = candidate;
                    cost = candidate_cost;
                    improved = true;

                    if improvement < self.params.solver_converge_tol * cost.abs().max(1.0) {
                        converged = true;
                    }

                    break;
                }

                step *= 0.5;
            }

            if !improved {
                // No descent step improves the cost, this is a local minimum
                converged = true;
            }

            if converged {
                break;
            }
        }

        if !converged {
            return Err(SolverError::NonConverged {
                iters: self.params.solver_max_iters,
            });
        }

        let trajectory = self.rollout_trajectory(state, &controls);
        let solution = SolverSolution {
            steer_rad: controls[0],
            accel_mss: controls[1],
            predicted_traj_m: trajectory,
        };

        self.prev_controls = Some(controls);

        Ok(solution)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
