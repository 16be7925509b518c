//! # Lynx MPC controller library
//!
//! Turns asynchronous pose, speed and path updates into steering and
//! acceleration demands at a fixed cadence. The pipeline run once per cycle:
//!
//!     - Snapshot the vehicle state (state_holder)
//!     - Project it through the actuation delay (mpc_ctrl::predict)
//!     - Localise the vehicle on the reference path and extract a local
//!       window (path)
//!     - Transform the window into the vehicle frame (mpc_ctrl::frame)
//!     - Guard it against degenerate spacing and fit a polynomial
//!       (mpc_ctrl::fit)
//!     - Solve for the actuator sequence (solver) and emit the first step
//!
//! The timed loop itself lives in the `mpc_exec` binary, with the per-cycle
//! logic in [`cycle::run_cycle`].

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod cycle;
pub mod data_store;
pub mod mpc_ctrl;
pub mod path;
#[cfg(feature = "sim")]
pub mod sim;
pub mod solver;
pub mod state_holder;
pub mod viz;
