//! Implementations for the MpcCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, warn};
use nalgebra::{Vector2, Vector6};
use serde::Serialize;
use std::time::Duration;

// Internal
use super::{
    fit, frame, predict, MpcCtrlError, MpcCtrlInitError, Params, PolynomialFit, PredictedState,
};
use crate::solver::{GradientSolver, Solver, SolverState};
use crate::state_holder::StateSnapshot;
use comms_if::act::ActDems;
use util::{
    archive::{ArchiveError, Archived, Archiver},
    module::State,
    params,
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// MPC control module state.
pub struct MpcCtrl {
    params: Params,

    /// The optimisation backend invoked every cycle.
    solver: Box<dyn Solver>,

    /// Fit carried over from the previous cycle, the fallback when the
    /// stability guard leaves too few points behind.
    last_fit: Option<PolynomialFit>,

    /// Last commanded steering in the solver's convention, fed back into the
    /// latency projection.
    last_steer_rad: f64,

    /// Last commanded acceleration, fed back into the latency projection.
    last_accel_mss: f64,

    /// Count of consecutive recoverable solver failures.
    consec_solver_failures: u64,

    report: StatusReport,
    arch_report: Archiver,
}

/// Input data for one MpcCtrl cycle.
pub struct InputData {
    /// The consistent state snapshot taken at the start of the cycle.
    pub snapshot: StateSnapshot,
}

/// Output of one MpcCtrl cycle.
#[derive(Clone, Debug)]
pub struct OutputData {
    /// Actuator demands to emit.
    pub dems: ActDems,

    /// The latency-projected state the cycle planned from.
    pub predicted: PredictedState,

    /// The fitted local path polynomial.
    pub fit: PolynomialFit,

    /// The stabilised local window, in the vehicle frame.
    pub window_veh_m: Vec<Vector2<f64>>,

    /// The solver's predicted trajectory, in the vehicle frame. Empty when a
    /// fallback command was emitted.
    pub predicted_traj_m: Vec<Vector2<f64>>,
}

/// Status report for MpcCtrl processing.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct StatusReport {
    /// Index of the closest path point to the projected position.
    pub closest_idx: usize,

    /// Number of window points accepted by the stability guard.
    pub accepted_points: usize,

    /// True if the stability guard truncated the window.
    pub window_truncated: bool,

    /// True if the previous cycle's fit was reused.
    pub fit_reused: bool,

    /// Cross track error of this cycle. Units: meters
    pub cte_m: f64,

    /// Heading error of this cycle. Units: radians
    pub epsi_rad: f64,

    /// True if the solver failed recoverably and the last command was held.
    pub solver_fallback: bool,

    /// True if the safe stop command was emitted.
    pub safe_stop: bool,

    /// Emitted steering demand (actuator convention). Units: radians
    pub steer_rad: f64,

    /// Emitted acceleration demand. Units: meters/second^2
    pub accel_mss: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for MpcCtrl {
    type InitData = String;
    type InitError = MpcCtrlInitError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = MpcCtrlError;

    /// Initialise the MpcCtrl module.
    ///
    /// Expected init data is the path to the parameter file. The solver
    /// backend is the gradient descent implementation; tests inject their own
    /// through [`MpcCtrl::with_solver`].
    fn init(init_data: Self::InitData, session: &Session) -> Result<Self, Self::InitError> {
        let params: Params = params::load(&init_data)?;
        let solver = Box::new(GradientSolver::from_params(&params));

        let mut state = Self::with_solver(params, solver)?;
        state.arch_report = Archiver::from_path(session, "mpc_ctrl/status_report.csv")?;

        Ok(state)
    }

    /// Perform cyclic processing of MPC control.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        // Clear the status report
        self.report = StatusReport::default();

        let snapshot = &input_data.snapshot;

        // ---- LATENCY PROJECTION ----

        let predicted = predict::predict_state(
            &snapshot.position_m,
            snapshot.heading_rad,
            snapshot.speed_ms,
            self.last_steer_rad,
            self.last_accel_mss,
            self.params.latency_s,
            self.params.wheelbase_m,
        );

        // ---- PATH LOCALISATION ----

        let closest_idx = snapshot.path.find_closest(&predicted.position_m);
        self.report.closest_idx = closest_idx;

        let window_glob = snapshot.path.extract_window(
            closest_idx,
            self.params.back_offset,
            self.params.window_len,
            self.params.stride,
        );

        // ---- FRAME TRANSFORM AND STABILITY GUARD ----

        let window_veh = frame::window_to_vehicle(&window_glob, &predicted);
        let accepted =
            fit::stabilize_window(&window_veh, self.params.poly_degree, self.params.min_x_delta_m);

        self.report.accepted_points = accepted.len();
        self.report.window_truncated = accepted.len() < window_veh.len();

        // ---- LOCAL FIT ----

        let fit = match fit::fit_polynomial(&accepted, self.params.poly_degree) {
            Ok(f) => f,
            Err(e) => match self.last_fit {
                // The previous cycle's fit is still a usable local
                // approximation at cycle rate
                Some(ref f) => {
                    warn!("Local fit failed ({}), reusing the previous fit", e);
                    self.report.fit_reused = true;
                    f.clone()
                }
                None => {
                    return Err(MpcCtrlError::DegenerateWindow {
                        accepted: accepted.len(),
                    })
                }
            },
        };
        self.last_fit = Some(fit.clone());

        let tracking = fit.tracking_error();
        self.report.cte_m = tracking.cte_m;
        self.report.epsi_rad = tracking.epsi_rad;

        debug!(
            "coeffs: {:?}, cte: {:.3} m, epsi: {:.3} rad",
            fit.coeffs(),
            tracking.cte_m,
            tracking.epsi_rad
        );

        // ---- SOLVE ----

        // Position and heading are zero, the window is already vehicle
        // relative
        let state: SolverState = Vector6::new(
            0.0,
            0.0,
            0.0,
            predicted.speed_ms,
            tracking.cte_m,
            tracking.epsi_rad,
        );
        let deadline = Duration::from_secs_f64(self.params.solver_deadline_s);

        let (dems, predicted_traj_m) = match self.solver.solve(&state, fit.coeffs(), deadline) {
            Ok(solution) => {
                self.consec_solver_failures = 0;
                self.last_steer_rad = solution.steer_rad;
                self.last_accel_mss = solution.accel_mss;

                debug!(
                    "steer: {:.3} rad, accel: {:.3} m/s^2",
                    solution.steer_rad, solution.accel_mss
                );

                (
                    self.map_to_actuators(solution.steer_rad, solution.accel_mss),
                    solution.predicted_traj_m,
                )
            }
            Err(e) if e.is_recoverable() => {
                self.consec_solver_failures += 1;
                self.report.solver_fallback = true;

                if self.consec_solver_failures > self.params.max_consec_solver_failures {
                    warn!(
                        "Solver failed {} cycles in a row ({}), commanding safe stop",
                        self.consec_solver_failures, e
                    );
                    self.report.safe_stop = true;
                    self.last_steer_rad = 0.0;
                    self.last_accel_mss = self.params.safe_stop_accel_mss;
                } else {
                    warn!("Solver failed recoverably ({}), holding last command", e);
                }

                (
                    self.map_to_actuators(self.last_steer_rad, self.last_accel_mss),
                    Vec::new(),
                )
            }
            Err(e) => return Err(MpcCtrlError::SolverFault(e)),
        };

        self.report.steer_rad = dems.steer_rad;
        self.report.accel_mss = dems.accel_mss;

        let output = OutputData {
            dems,
            predicted,
            fit,
            window_veh_m: accepted,
            predicted_traj_m,
        };

        Ok((output, self.report))
    }
}

impl Archived for MpcCtrl {
    fn write(&mut self) -> Result<(), ArchiveError> {
        self.arch_report.serialise(self.report)
    }
}

impl MpcCtrl {
    /// Build the module from already loaded parameters and a solver backend.
    pub fn with_solver(
        params: Params,
        solver: Box<dyn Solver>,
    ) -> Result<Self, MpcCtrlInitError> {
        params.validate()?;

        Ok(Self {
            params,
            solver,
            last_fit: None,
            last_steer_rad: 0.0,
            last_accel_mss: 0.0,
            consec_solver_failures: 0,
            report: StatusReport::default(),
            arch_report: Archiver::default(),
        })
    }

    /// The module's loaded parameters.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Map a solver solution into the steering actuator's convention.
    fn map_to_actuators(&self, steer_rad: f64, accel_mss: f64) -> ActDems {
        ActDems {
            steer_rad: self.params.steer_center_rad - steer_rad,
            accel_mss,
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::path::RefPath;
    use crate::solver::{SolverError, SolverSolution};
    use std::sync::Arc;

    fn test_params() -> Params {
        Params {
            steps_ahead: 8,
            dt_s: 0.1,
            latency_s: 0.0,
            wheelbase_m: 0.325,
            target_speed_ms: 2.0,
            cte_coeff: 100.0,
            epsi_coeff: 100.0,
            speed_coeff: 0.5,
            steer_coeff: 1.0,
            acc_coeff: 1.0,
            consec_steer_coeff: 5.0,
            consec_acc_coeff: 1.0,
            window_len: 12,
            back_offset: 3,
            stride: 1,
            min_x_delta_m: 0.05,
            poly_degree: 3,
            steer_center_rad: 0.3,
            max_steer_rad: 0.4363,
            max_accel_mss: 2.0,
            solver_max_iters: 200,
            solver_learning_rate: 0.05,
            solver_converge_tol: 1e-3,
            solver_deadline_s: 10.0,
            max_consec_solver_failures: 2,
            safe_stop_accel_mss: -1.5,
        }
    }

    /// A straight path along the +x axis through the origin.
    fn straight_path() -> Arc<RefPath> {
        Arc::new(
            RefPath::from_points(
                (0..60)
                    .map(|i| Vector2::new(i as f64 * 0.5 - 10.0, 0.0))
                    .collect(),
            )
            .unwrap(),
        )
    }

    fn snapshot_at(x: f64, y: f64, speed_ms: f64) -> InputData {
        InputData {
            snapshot: StateSnapshot {
                position_m: Vector2::new(x, y),
                heading_rad: 0.0,
                speed_ms,
                path: straight_path(),
            },
        }
    }

    /// Solver stub returning a fixed solution.
    struct FixedSolver {
        steer_rad: f64,
        accel_mss: f64,
    }

    impl Solver for FixedSolver {
        fn solve(
            &mut self,
            _state: &SolverState,
            _coeffs: &[f64],
            _deadline: Duration,
        ) -> Result<SolverSolution, SolverError> {
            Ok(SolverSolution {
                steer_rad: self.steer_rad,
                accel_mss: self.accel_mss,
                predicted_traj_m: Vec::new(),
            })
        }
    }

    /// Solver stub that always fails recoverably.
    struct FailingSolver;

    impl Solver for FailingSolver {
        fn solve(
            &mut self,
            _state: &SolverState,
            _coeffs: &[f64],
            _deadline: Duration,
        ) -> Result<SolverSolution, SolverError> {
            Err(SolverError::NonConverged { iters: 1 })
        }
    }

    #[test]
    fn test_on_path_cycle_is_quiet() {
        let params = test_params();
        let steer_center = params.steer_center_rad;
        let solver = Box::new(GradientSolver::from_params(&params));
        let mut mpc_ctrl = MpcCtrl::with_solver(params, solver).unwrap();

        // Vehicle exactly on the path, at speed, pointing along it
        let (output, report) = mpc_ctrl.proc(&snapshot_at(0.0, 0.0, 2.0)).unwrap();

        assert!(report.cte_m.abs() < 1e-6);
        assert!(report.epsi_rad.abs() < 1e-6);
        assert!((output.dems.steer_rad - steer_center).abs() < 1e-3);
        assert!(!report.window_truncated);
        assert!(!report.fit_reused);

        // Repeated cycles stay quiet
        for _ in 0..5 {
            let (output, report) = mpc_ctrl.proc(&snapshot_at(0.0, 0.0, 2.0)).unwrap();
            assert!(report.cte_m.abs() < 1e-6);
            assert!((output.dems.steer_rad - steer_center).abs() < 1e-3);
        }
    }

    #[test]
    fn test_lateral_offset_produces_cte_and_corrective_steering() {
        let params = test_params();
        let steer_center = params.steer_center_rad;
        let solver = Box::new(GradientSolver::from_params(&params));
        let mut mpc_ctrl = MpcCtrl::with_solver(params, solver).unwrap();

        // Vehicle one meter to the right of the path, so the path sits at
        // +1 m in the vehicle frame
        let offset_m = 1.0;
        let (output, report) = mpc_ctrl.proc(&snapshot_at(0.0, -offset_m, 2.0)).unwrap();

        assert!((report.cte_m - offset_m).abs() < 1e-6);

        // A corrective (negative) solver angle maps above the center offset
        assert!(output.dems.steer_rad > steer_center + 1e-3);
    }

    #[test]
    fn test_steering_remap_uses_center_offset() {
        let params = test_params();
        let solver = Box::new(FixedSolver {
            steer_rad: 0.1,
            accel_mss: 0.7,
        });
        let mut mpc_ctrl = MpcCtrl::with_solver(params, solver).unwrap();

        let (output, _) = mpc_ctrl.proc(&snapshot_at(0.0, 0.0, 2.0)).unwrap();

        assert!((output.dems.steer_rad - (0.3 - 0.1)).abs() < 1e-12);
        assert!((output.dems.accel_mss - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_window_without_history_skips() {
        // A single-point path collapses the window onto one spot, leaving
        // the guard with fewer than degree + 1 points
        let params = test_params();
        let solver = Box::new(FixedSolver {
            steer_rad: 0.0,
            accel_mss: 0.0,
        });
        let mut mpc_ctrl = MpcCtrl::with_solver(params, solver).unwrap();

        let input = InputData {
            snapshot: StateSnapshot {
                position_m: Vector2::new(0.0, 0.0),
                heading_rad: 0.0,
                speed_ms: 1.0,
                path: Arc::new(RefPath::from_points(vec![Vector2::new(1.0, 0.0)]).unwrap()),
            },
        };

        let result = mpc_ctrl.proc(&input);
        assert!(matches!(
            result,
            Err(MpcCtrlError::DegenerateWindow { .. })
        ));
    }

    #[test]
    fn test_degenerate_window_reuses_previous_fit() {
        let params = test_params();
        let solver = Box::new(FixedSolver {
            steer_rad: 0.0,
            accel_mss: 0.0,
        });
        let mut mpc_ctrl = MpcCtrl::with_solver(params, solver).unwrap();

        // A good cycle first, to seed the fit history
        let (_, report) = mpc_ctrl.proc(&snapshot_at(0.0, 0.0, 2.0)).unwrap();
        assert!(!report.fit_reused);

        // Then a degenerate path: the fallback fit must carry the cycle
        let input = InputData {
            snapshot: StateSnapshot {
                position_m: Vector2::new(0.0, 0.0),
                heading_rad: 0.0,
                speed_ms: 1.0,
                path: Arc::new(RefPath::from_points(vec![Vector2::new(1.0, 0.0)]).unwrap()),
            },
        };

        let (_, report) = mpc_ctrl.proc(&input).unwrap();
        assert!(report.fit_reused);
        assert!(report.cte_m.abs() < 1e-6);
    }

    #[test]
    fn test_solver_failures_hold_then_safe_stop() {
        let params = test_params();
        let safe_stop_accel = params.safe_stop_accel_mss;
        let steer_center = params.steer_center_rad;
        let mut mpc_ctrl = MpcCtrl::with_solver(params, Box::new(FailingSolver)).unwrap();

        // First failures hold the last (initial, zero) command
        let (output, report) = mpc_ctrl.proc(&snapshot_at(0.0, 0.0, 2.0)).unwrap();
        assert!(report.solver_fallback);
        assert!(!report.safe_stop);
        assert!((output.dems.steer_rad - steer_center).abs() < 1e-12);
        assert_eq!(output.dems.accel_mss, 0.0);

        let (_, report) = mpc_ctrl.proc(&snapshot_at(0.0, 0.0, 2.0)).unwrap();
        assert!(!report.safe_stop);

        // The limit (2) is now exceeded, safe stop engages
        let (output, report) = mpc_ctrl.proc(&snapshot_at(0.0, 0.0, 2.0)).unwrap();
        assert!(report.safe_stop);
        assert!((output.dems.steer_rad - steer_center).abs() < 1e-12);
        assert_eq!(output.dems.accel_mss, safe_stop_accel);
    }

    #[test]
    fn test_invalid_params_rejected() {
        let mut params = test_params();
        params.window_len = 2;

        let result = MpcCtrl::with_solver(
            params,
            Box::new(FixedSolver {
                steer_rad: 0.0,
                accel_mss: 0.0,
            }),
        );

        assert!(matches!(result, Err(MpcCtrlInitError::InvalidParams(_))));
    }
}
