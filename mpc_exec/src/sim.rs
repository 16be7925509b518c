//! # Simulated sensing feed
//!
//! Stands in for the transport collaborator during bench testing: a
//! background thread integrates a simple bicycle plant around a circular
//! track and publishes pose, speed and path updates into the vehicle state
//! holder, closing the loop on the demands the controller last emitted. The
//! holder is written from this thread and read from the control loop thread,
//! exactly as with a live transport stack.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use chrono::Utc;
use log::info;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

// Internal
use crate::state_holder::VehicleStateHolder;
use comms_if::{
    act::ActDems,
    sense::{PathMsg, PoseMsg, SpeedMsg},
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Update period of the simulated feeds.
///
/// Units: seconds
const FEED_PERIOD_S: f64 = 0.02;

/// Radius of the simulated circular track.
///
/// Units: meters
const TRACK_RADIUS_M: f64 = 20.0;

/// Number of points on the simulated track.
const TRACK_NUM_POINTS: usize = 512;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Shared handle the control loop uses to pass emitted demands to the plant.
#[derive(Clone, Default)]
pub struct DemsLink {
    inner: Arc<Mutex<Option<ActDems>>>,
}

/// Plant configuration mirrored from the controller's parameters.
pub struct PlantConfig {
    /// Wheelbase of the simulated vehicle. Units: meters
    pub wheelbase_m: f64,

    /// Steering centre offset, undone when applying demands. Units: radians
    pub steer_center_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DemsLink {
    /// Publish the demands emitted this cycle.
    pub fn publish(&self, dems: ActDems) {
        if let Ok(mut inner) = self.inner.lock() {
            *inner = Some(dems);
        }
    }

    /// The most recently published demands, if any.
    fn latest(&self) -> Option<ActDems> {
        match self.inner.lock() {
            Ok(inner) => *inner,
            Err(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Spawn the simulated feed thread.
pub fn spawn(
    holder: VehicleStateHolder,
    dems_link: DemsLink,
    config: PlantConfig,
) -> thread::JoinHandle<()> {
    thread::spawn(move || feed_thread(holder, dems_link, config))
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn feed_thread(holder: VehicleStateHolder, dems_link: DemsLink, config: PlantConfig) {
    // Publish the track once, it never changes
    let points_m = (0..TRACK_NUM_POINTS)
        .map(|i| {
            let angle = std::f64::consts::TAU * i as f64 / TRACK_NUM_POINTS as f64;
            [TRACK_RADIUS_M * angle.cos(), TRACK_RADIUS_M * angle.sin()]
        })
        .collect();

    holder.set_path(&PathMsg {
        points_m,
        timestamp: Utc::now(),
    });

    // Start on the track pointing along it
    let mut x_m = TRACK_RADIUS_M;
    let mut y_m = 0.0;
    let mut psi_rad = std::f64::consts::FRAC_PI_2;
    let mut speed_ms: f64 = 0.0;

    info!("Simulated feed running");

    loop {
        // Apply the last demands, undoing the steering actuator convention
        let (steer_rad, accel_mss) = match dems_link.latest() {
            Some(dems) => (config.steer_center_rad - dems.steer_rad, dems.accel_mss),
            None => (0.0, 0.0),
        };

        speed_ms = (speed_ms + accel_mss * FEED_PERIOD_S).max(0.0);
        psi_rad -= speed_ms * steer_rad / config.wheelbase_m * FEED_PERIOD_S;
        x_m += speed_ms * psi_rad.cos() * FEED_PERIOD_S;
        y_m += speed_ms * psi_rad.sin() * FEED_PERIOD_S;

        holder.set_pose(&PoseMsg {
            position_m: [x_m, y_m],
            orientation_q: quat_from_heading(psi_rad),
            timestamp: Utc::now(),
        });
        holder.set_speed(&SpeedMsg {
            speed_ms,
            timestamp: Utc::now(),
        });

        thread::sleep(Duration::from_secs_f64(FEED_PERIOD_S));
    }
}

/// Orientation quaternion in (w, x, y, z) order for a pure heading rotation.
fn quat_from_heading(psi_rad: f64) -> [f64; 4] {
    let half = psi_rad / 2.0;
    [half.cos(), 0.0, 0.0, half.sin()]
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::state_holder::heading_from_quat;

    #[test]
    fn test_quat_heading_round_trip() {
        for psi in [-2.0, -0.5, 0.0, 0.9, 3.0].iter() {
            let q = quat_from_heading(*psi);
            assert!((heading_from_quat(&q) - psi).abs() < 1e-12);
        }
    }

    #[test]
    fn test_dems_link_latest_wins() {
        let link = DemsLink::default();
        assert!(link.latest().is_none());

        link.publish(ActDems {
            steer_rad: 0.1,
            accel_mss: 0.2,
        });
        link.publish(ActDems {
            steer_rad: 0.3,
            accel_mss: 0.4,
        });

        let dems = link.latest().unwrap();
        assert_eq!(dems.steer_rad, 0.3);
        assert_eq!(dems.accel_mss, 0.4);
    }
}
