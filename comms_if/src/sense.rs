//! # Sensing feed messages

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A whole-path update from the path feed.
///
/// The path replaces any previously delivered one in full. Points are ordered
/// and the consumer treats the sequence as circular.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct PathMsg {
    /// Path points in the global frame.
    ///
    /// Units: meters
    pub points_m: Vec<[f64; 2]>,

    /// Time at which the path was generated.
    pub timestamp: DateTime<Utc>,
}

/// A pose update from the localisation feed.
#[derive(Clone, Copy, Serialize, Deserialize, Debug)]
pub struct PoseMsg {
    /// Position in the global frame.
    ///
    /// Units: meters
    pub position_m: [f64; 2],

    /// Orientation quaternion in (w, x, y, z) order.
    pub orientation_q: [f64; 4],

    /// Time at which the pose was estimated.
    pub timestamp: DateTime<Utc>,
}

/// A forward speed update from the odometry feed.
#[derive(Clone, Copy, Serialize, Deserialize, Debug)]
pub struct SpeedMsg {
    /// Forward speed.
    ///
    /// Units: meters/second
    pub speed_ms: f64,

    /// Time at which the speed was measured.
    pub timestamp: DateTime<Utc>,
}
