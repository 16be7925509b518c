//! # Actuator demands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Demands sent to the actuation stack at the end of a control cycle.
#[derive(Clone, Copy, Serialize, Deserialize, Debug)]
pub struct ActDems {
    /// Steering demand in the actuator's own convention, i.e. after the
    /// controller has applied the configured center offset and sign.
    ///
    /// Units: radians
    pub steer_rad: f64,

    /// Acceleration demand.
    ///
    /// Units: meters/second^2
    pub accel_mss: f64,
}
