//! # Speed control module
//!
//! Closed-loop regulation of the rover's ground speed. The decision step sets the desired speed
//! and feeds the measured speed through [`PidController::update`] to obtain a throttle demand.
//!
//! The controller does not saturate its output, the caller must clamp the result to the range of
//! the actuator being driven.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod controllers;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use controllers::*;
