//! # Rover state module
//!
//! [`RoverState`] is the single record of everything the rover knows: its pose and speed from
//! telemetry, what perception saw in the latest camera frame, the navigation mode chosen by the
//! decision step, the actuation demands to be sent, and the path-planning data.
//!
//! Every field belongs to exactly one writer category:
//!
//! - telemetry ingestion - pose, speed, sample flags, camera image, timing,
//! - perception - navigable/sample angles and distances, vision image, world map, frame skipping,
//! - decision - mode, actuation, turn direction, pickup request, speed controller,
//! - planning (through the decision step) - policy grid and goal list.
//!
//! Fields are private and only written through the method for their category, with collaborators
//! handed a context exposing exactly what they may change.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod calib;
mod params;
mod state;
mod world_map;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use calib::*;
pub use params::*;
pub use state::*;
pub use world_map::*;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Serialize;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Coarse navigation mode of the rover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NavMode {
    /// Driving forward along navigable terrain.
    Forward,

    /// Braking to a halt, or turning on the spot looking for a way forward.
    Stop,
}

/// Direction of an on the spot rotation.
///
/// Once a direction is committed it is kept until the rotation finishes, so the rover does not
/// oscillate between turning left and right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TurnDir {
    None,
    Left,
    Right,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for NavMode {
    fn default() -> Self {
        NavMode::Forward
    }
}

impl Default for TurnDir {
    fn default() -> Self {
        TurnDir::None
    }
}
