//! # Output composition
//!
//! Builds the two inset images shown by the simulator from the rover state.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod jpeg;

pub use jpeg::*;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::sim::FrameError;

use crate::rover_state::RoverState;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Base64 encoded images ready to be sent to the simulator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputImages {
    pub image1: String,
    pub image2: String,
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

pub trait OutputComposer {
    fn compose(&mut self, rover: &RoverState) -> Result<OutputImages, FrameError>;
}
