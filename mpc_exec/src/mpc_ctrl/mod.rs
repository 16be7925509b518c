//! # MPC control module
//!
//! MpcCtrl turns the latest vehicle state into actuator demands once per
//! control cycle. The cycle projects the state through the actuation delay,
//! localises the vehicle on the reference path, extracts a local window of
//! path points, transforms it into the vehicle frame, guards it against
//! degenerate longitudinal spacing, fits a polynomial to it, derives the
//! cross track and heading errors, and hands state and polynomial to the
//! solver. The solver's steering and acceleration are remapped into the
//! actuator convention and emitted, and recorded for the next cycle's delay
//! projection.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod fit;
mod frame;
mod params;
mod predict;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use fit::*;
pub use frame::*;
pub use params::*;
pub use predict::*;
pub use state::*;

use crate::solver::SolverError;
use util::{archive::ArchiveError, params::LoadError};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during MpcCtrl initialisation.
#[derive(Debug, thiserror::Error)]
pub enum MpcCtrlInitError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(#[from] LoadError),

    #[error("{0}")]
    InvalidParams(#[from] InvalidParams),

    #[error("Could not initialise archiving: {0}")]
    ArchiveInitError(#[from] ArchiveError),
}

/// Possible errors that can occur during MpcCtrl processing.
#[derive(Debug, thiserror::Error)]
pub enum MpcCtrlError {
    /// Too few window points survived the stability guard and there is no
    /// previous fit to fall back on. Recoverable by skipping the cycle.
    #[error(
        "Only {accepted} window points survived the stability guard and no \
         previous fit is available"
    )]
    DegenerateWindow { accepted: usize },

    /// The solver failed in a way no fallback can recover from.
    #[error("Solver fault: {0}")]
    SolverFault(SolverError),
}
