//! # Vehicle state holder
//!
//! Fuses the asynchronous pose, speed and path feeds into a single vehicle
//! state. The feeds write through the setters from their own threads, while
//! the control loop reads the state exactly once per cycle through
//! [`VehicleStateHolder::snapshot`], which copies every field under one lock
//! so no cycle can observe a mix of old and new data.
//!
//! Each feed has its own readiness flag which is raised on the first update
//! and never lowered. Source disconnection and re-initialisation are not
//! handled by this design.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::warn;
use nalgebra::Vector2;
use std::sync::{Arc, Mutex, MutexGuard};

// Internal
use crate::path::RefPath;
use comms_if::sense::{PathMsg, PoseMsg, SpeedMsg};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Shared holder for the latest vehicle state.
///
/// Cloning the holder produces another handle onto the same state, so one
/// instance can be handed to each feed and to the control loop.
#[derive(Clone)]
pub struct VehicleStateHolder {
    inner: Arc<Mutex<Inner>>,
}

/// A consistent copy of the vehicle state taken at one instant.
#[derive(Clone)]
pub struct StateSnapshot {
    /// Position in the global frame.
    ///
    /// Units: meters
    pub position_m: Vector2<f64>,

    /// Heading (angle to the positive global x axis).
    ///
    /// Units: radians
    pub heading_rad: f64,

    /// Forward speed.
    ///
    /// Units: meters/second
    pub speed_ms: f64,

    /// The reference path. Held behind an `Arc` so snapshots share the same
    /// immutable buffer until the next whole-path update swaps it out.
    pub path: Arc<RefPath>,
}

#[derive(Default)]
struct Inner {
    position_m: Vector2<f64>,
    heading_rad: f64,
    speed_ms: f64,
    path: Option<Arc<RefPath>>,

    position_ok: bool,
    heading_ok: bool,
    speed_ok: bool,
    path_ok: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VehicleStateHolder {
    /// Create a new holder with no inputs received yet.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// Replace the reference path with the one in the given message.
    ///
    /// An empty path is rejected, the downstream consumers require at least
    /// one point.
    pub fn set_path(&self, msg: &PathMsg) {
        let path = match RefPath::from_msg(msg) {
            Some(p) => p,
            None => {
                warn!("Rejected an empty path update");
                return;
            }
        };

        let mut inner = self.lock();
        inner.path = Some(Arc::new(path));
        inner.path_ok = true;
    }

    /// Update the position and heading from a pose message.
    pub fn set_pose(&self, msg: &PoseMsg) {
        let heading_rad = heading_from_quat(&msg.orientation_q);

        let mut inner = self.lock();
        inner.position_m = Vector2::new(msg.position_m[0], msg.position_m[1]);
        inner.heading_rad = heading_rad;
        inner.position_ok = true;
        inner.heading_ok = true;
    }

    /// Update the forward speed from a speed message.
    pub fn set_speed(&self, msg: &SpeedMsg) {
        let mut inner = self.lock();
        inner.speed_ms = msg.speed_ms;
        inner.speed_ok = true;
    }

    /// True once every feed has delivered at least one update.
    pub fn ready(&self) -> bool {
        let inner = self.lock();
        inner.position_ok && inner.heading_ok && inner.speed_ok && inner.path_ok
    }

    /// List the prerequisites that have not yet been delivered.
    pub fn missing_inputs(&self) -> Vec<&'static str> {
        let inner = self.lock();
        let mut missing = Vec::new();

        if !inner.path_ok {
            missing.push("path");
        }
        if !inner.position_ok {
            missing.push("position");
        }
        if !inner.heading_ok {
            missing.push("heading");
        }
        if !inner.speed_ok {
            missing.push("speed");
        }

        missing
    }

    /// Take a consistent snapshot of the state, or `None` while any feed has
    /// yet to deliver.
    pub fn snapshot(&self) -> Option<StateSnapshot> {
        let inner = self.lock();

        if !(inner.position_ok && inner.heading_ok && inner.speed_ok && inner.path_ok) {
            return None;
        }

        let path = match inner.path {
            Some(ref p) => p.clone(),
            None => return None,
        };

        Some(StateSnapshot {
            position_m: inner.position_m,
            heading_rad: inner.heading_rad,
            speed_ms: inner.speed_ms,
            path,
        })
    }

    /// Lock the inner state, recovering from a poisoned lock.
    fn lock(&self) -> MutexGuard<Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for VehicleStateHolder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Derive the heading Euler angle from an orientation quaternion in
/// (w, x, y, z) order.
pub fn heading_from_quat(q: &[f64; 4]) -> f64 {
    let siny_cosp = 2.0 * (q[0] * q[3] + q[1] * q[2]);
    let cosy_cosp = 1.0 - 2.0 * (q[2] * q[2] + q[3] * q[3]);

    siny_cosp.atan2(cosy_cosp)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
