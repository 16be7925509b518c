//! Main MPC controller executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the session, logging and modules
//!     - Main loop:
//!         - Run one control cycle (readiness gating, pipeline, solve,
//!           command emission)
//!         - Write archives and debug visualization data
//!         - Sleep out the remainder of the cycle period
//!
//! All configuration is loaded from parameter files before the loop starts;
//! a missing or malformed value aborts the process with a diagnostic and a
//! non-zero exit status.

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use mpc_lib::{
    cycle::run_cycle, data_store::DataStore, mpc_ctrl::MpcCtrl,
    state_holder::VehicleStateHolder, viz,
};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, info, warn};
use serde::Deserialize;
use std::env;
use std::thread;
use std::time::{Duration, Instant};

// Internal
use util::{
    archive::Archived,
    logger::{logger_init, LevelFilter},
    module::State,
    params,
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Largest actuation latency that passes the sanity check.
///
/// Units: seconds
const MAX_SANE_LATENCY_S: f64 = 1.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Executable-level parameters.
#[derive(Debug, Deserialize)]
struct ExecParams {
    /// Target period of one control cycle. The actual period stretches when
    /// the solve runs long, see the cycle overrun accounting in the loop.
    ///
    /// Units: seconds
    cycle_period_s: f64,

    /// Enables saving of debug visualization data each cycle.
    debug_viz: bool,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("mpc_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Lynx MPC Controller Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    // Zero arguments runs with the default parameter files, two arguments
    // override both of them.
    let args: Vec<String> = env::args().collect();
    debug!("CLI arguments: {:?}", args);

    let (exec_params_path, mpc_ctrl_params_path) = match args.len() {
        1 => (String::from("exec.toml"), String::from("mpc_ctrl.toml")),
        3 => (args[1].clone(), args[2].clone()),
        n => {
            return Err(eyre!(
                "Expected either zero or two arguments (exec and mpc_ctrl parameter files), \
                 found {}",
                n - 1
            ))
        }
    };

    let exec_params: ExecParams =
        params::load(&exec_params_path).wrap_err("Could not load exec params")?;

    if exec_params.cycle_period_s <= 0.0 {
        return Err(eyre!("cycle_period_s must be positive"));
    }

    info!("Exec parameters loaded");

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut ds = DataStore::default();

    let mut mpc_ctrl = MpcCtrl::init(mpc_ctrl_params_path, &session)
        .wrap_err("Failed to initialise MpcCtrl")?;
    info!("MpcCtrl init complete");
    info!("MpcCtrl parameters:\n{:#?}\n", mpc_ctrl.params());

    if mpc_ctrl.params().latency_s > MAX_SANE_LATENCY_S {
        warn!(
            "Actuation latency is {} s, expected less than {} s. Is the value in seconds?",
            mpc_ctrl.params().latency_s,
            MAX_SANE_LATENCY_S
        );
    }

    // ---- INITIALISE FEEDS ----

    // The state holder is shared with the feeds, which update it from their
    // own threads. Without the sim feature the transport stack owns the
    // setters instead.
    let holder = VehicleStateHolder::new();

    #[cfg(feature = "sim")]
    let dems_link = {
        let link = mpc_lib::sim::DemsLink::default();
        mpc_lib::sim::spawn(
            holder.clone(),
            link.clone(),
            mpc_lib::sim::PlantConfig {
                wheelbase_m: mpc_ctrl.params().wheelbase_m,
                steer_center_rad: mpc_ctrl.params().steer_center_rad,
            },
        );
        info!("Simulated feed spawned");
        link
    };

    // ---- MAIN LOOP ----

    info!("Beginning main loop\n");

    let cycle_frequency_hz = 1.0 / exec_params.cycle_period_s;
    let mut last_cycle_start: Option<Instant> = None;

    loop {
        // Get cycle start time
        let cycle_start = Instant::now();

        if let Some(previous) = last_cycle_start {
            ds.last_cycle_period_s = (cycle_start - previous).as_secs_f64();
        }
        last_cycle_start = Some(cycle_start);

        // Clear items that need wiping at the start of the cycle
        ds.cycle_start(cycle_frequency_hz);

        // ---- CONTROL ALGORITHM PROCESSING ----

        match run_cycle(&mut ds, &mut mpc_ctrl, &holder) {
            Ok(Some(output)) => {
                // ---- COMMAND EMISSION ----

                #[cfg(feature = "sim")]
                dems_link.publish(output.dems);

                debug!(
                    "Emitted demands: steer {:.3} rad, accel {:.3} m/s^2",
                    output.dems.steer_rad, output.dems.accel_mss
                );

                if exec_params.debug_viz {
                    viz::save_cycle(&output);
                }

                // ---- WRITE ARCHIVES ----

                if let Err(e) = mpc_ctrl.write() {
                    warn!("Could not write MpcCtrl archives: {}", e);
                }
            }
            Ok(None) => (),
            Err(e) => {
                return Err(Report::new(e).wrap_err("Fatal error during MpcCtrl processing"))
            }
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start;
        ds.last_cycle_proc_s = cycle_dur.as_secs_f64();

        debug!(
            "cycle_proc: {:.4} s, cycle_period: {:.4} s",
            ds.last_cycle_proc_s, ds.last_cycle_period_s
        );

        // Get sleep duration
        match Duration::from_secs_f64(exec_params.cycle_period_s).checked_sub(cycle_dur) {
            Some(d) => {
                ds.num_consec_cycle_overruns = 0;
                thread::sleep(d);
            }
            None => {
                warn!(
                    "Cycle overran by {:.6} s",
                    ds.last_cycle_proc_s - exec_params.cycle_period_s
                );
                ds.num_consec_cycle_overruns += 1;
            }
        }

        // Increment cycle counter
        ds.num_cycles += 1;
    }
}
