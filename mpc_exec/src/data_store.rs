//! # Data Store

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::mpc_ctrl;
use comms_if::act::ActDems;

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// Readiness state of the control loop.
///
/// The loop starts awaiting its inputs and becomes ready once every feed has
/// delivered at least one update. Readiness never regresses, source
/// disconnection and re-initialisation are not handled by this design.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    AwaitingInputs,
    Ready,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u128,

    /// True if this cycle falls on a 1Hz boundary
    pub is_1_hz_cycle: bool,

    /// Control loop readiness state machine
    pub loop_state: LoopState,

    // MpcCtrl
    pub mpc_ctrl_status_rpt: mpc_ctrl::StatusReport,

    /// The demands emitted on the last completed cycle, if any
    pub last_dems: Option<ActDems>,

    // Monitoring counters
    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,

    /// Processing duration of the last cycle.
    ///
    /// Units: seconds
    pub last_cycle_proc_s: f64,

    /// Time between the starts of the last two cycles. Tracks the actual
    /// loop rate, which stretches with solver latency.
    ///
    /// Units: seconds
    pub last_cycle_period_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl Default for DataStore {
    fn default() -> Self {
        Self {
            num_cycles: 0,
            is_1_hz_cycle: false,
            loop_state: LoopState::AwaitingInputs,
            mpc_ctrl_status_rpt: mpc_ctrl::StatusReport::default(),
            last_dems: None,
            num_consec_cycle_overruns: 0,
            last_cycle_proc_s: 0.0,
            last_cycle_period_s: 0.0,
        }
    }
}

impl DataStore {
    /// Perform actions required at the start of a cycle.
    ///
    /// Clears the per-cycle report and sets the 1Hz cycle flag.
    pub fn cycle_start(&mut self, cycle_frequency_hz: f64) {
        let cycles_per_second = (cycle_frequency_hz as u128).max(1);
        self.is_1_hz_cycle = self.num_cycles % cycles_per_second == 0;

        self.mpc_ctrl_status_rpt = mpc_ctrl::StatusReport::default();
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_one_hz_flag() {
        let mut ds = DataStore::default();

        ds.cycle_start(10.0);
        assert!(ds.is_1_hz_cycle);

        ds.num_cycles = 5;
        ds.cycle_start(10.0);
        assert!(!ds.is_1_hz_cycle);

        ds.num_cycles = 20;
        ds.cycle_start(10.0);
        assert!(ds.is_1_hz_cycle);
    }
}
