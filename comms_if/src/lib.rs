//! # Communications interface crate.
//!
//! Provides the interfaces used to talk to the simulator bridge.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Network module
pub mod net;

/// Telemetry and command messages exchanged with the simulator
pub mod sim;
