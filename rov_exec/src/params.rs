//! # Rover Executable Parameters
//!
//! This module provide parameters for the rover executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Serialize, Deserialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RovExecParams {

    /// Network endpoint the simulator bridge connects to
    pub sim_endpoint: String,

    /// Path to the black and white ground truth map, relative to the software root
    pub map_path: String,

    /// Time to wait for a message from the simulator before checking for new connections.
    ///
    /// Units: milliseconds
    pub recv_timeout_ms: i32,
}
