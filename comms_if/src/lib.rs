//! # Communications interface crate.
//!
//! Provides the common interface types exchanged with the external
//! collaborators: the sensing feeds that deliver path, pose and speed
//! updates, and the actuator demands emitted by the controller. The transport
//! carrying these types is owned by the collaborators, only the payloads are
//! defined here.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Actuator demand definitions
pub mod act;

/// Sensing feed message definitions
pub mod sense;
