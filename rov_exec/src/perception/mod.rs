//! # Perception
//!
//! Perception turns the camera image into the navigable terrain and sample observations used by
//! the decision step, and marks what it sees on the world map.
//!
//! Perception is given a [`PerceptionCtx`] exposing only what it may read and write. It cannot
//! change the navigation mode, actuation or planning data.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod thresh;

pub use thresh::ThreshPerception;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use image::RgbImage;

use crate::rover_state::{Calibration, Perceived, Pose, RoverParams, WorldMap};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// What perception may see and change.
pub struct PerceptionCtx<'a> {
    /// Latest camera frame
    pub image: &'a RgbImage,

    pub pose: &'a Pose,
    pub calib: &'a Calibration,
    pub params: &'a RoverParams,

    /// True if this frame should be skipped
    pub skip_next: bool,

    pub worldmap: &'a mut WorldMap,
}

/// Result of perceiving a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PerceptionOutput {
    /// The new observations, or `None` if the frame was skipped and the previous observations
    /// still stand.
    pub frame: Option<PerceivedFrame>,

    /// Whether the next frame should be skipped
    pub skip_next: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PerceivedFrame {
    pub perceived: Perceived,

    /// Debug image shown in the simulator
    pub vision_image: RgbImage,
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

pub trait Perception {
    /// Process one camera frame. Called once per valid telemetry frame.
    fn perceive(&mut self, ctx: PerceptionCtx) -> PerceptionOutput;
}
