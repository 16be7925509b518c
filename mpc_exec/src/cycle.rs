//! # Control loop cycle
//!
//! One cycle of the control loop driver: gate on input readiness, snapshot
//! the vehicle state, run the MpcCtrl pipeline and hand back the demands to
//! emit. Kept separate from the timed loop in `main` so the gating behaviour
//! can be exercised directly.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, warn};

// Internal
use crate::data_store::{DataStore, LoopState};
use crate::mpc_ctrl::{InputData, MpcCtrl, MpcCtrlError, OutputData};
use crate::state_holder::VehicleStateHolder;
use util::module::State;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Run one control cycle.
///
/// Returns the module output when the pipeline ran, or `None` while the loop
/// is awaiting inputs or a recoverable per-cycle error forced a skip. Fatal
/// errors propagate to the caller.
pub fn run_cycle(
    ds: &mut DataStore,
    mpc_ctrl: &mut MpcCtrl,
    holder: &VehicleStateHolder,
) -> Result<Option<OutputData>, MpcCtrlError> {
    // ---- READINESS GATING ----

    if let LoopState::AwaitingInputs = ds.loop_state {
        if holder.ready() {
            info!("All inputs present, control loop is ready");
            ds.loop_state = LoopState::Ready;
        } else {
            // A normal transient while the feeds spin up, not an error
            if ds.is_1_hz_cycle {
                warn!(
                    "Awaiting inputs, no command emitted (missing: {:?})",
                    holder.missing_inputs()
                );
            }
            return Ok(None);
        }
    }

    // ---- PIPELINE ----

    let snapshot = match holder.snapshot() {
        Some(s) => s,
        None => return Ok(None),
    };

    match mpc_ctrl.proc(&InputData { snapshot }) {
        Ok((output, report)) => {
            ds.mpc_ctrl_status_rpt = report;
            ds.last_dems = Some(output.dems);
            Ok(Some(output))
        }
        Err(e @ MpcCtrlError::DegenerateWindow { .. }) => {
            warn!("Skipping cycle: {}", e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
