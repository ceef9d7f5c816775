//! # Decision
//!
//! The decision step chooses the navigation mode and the actuation demands from what perception
//! saw. It owns the speed controller and drives the path planner.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod reactive;

pub use reactive::ReactiveDecision;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use crate::{
    planner::PolicyStore,
    rover_state::{Actuation, NavMode, Perceived, Pose, RoverParams, TurnDir},
    speed_ctrl::PidController
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// What the decision step may see and change.
pub struct DecisionCtx<'a> {
    pub mode: NavMode,
    pub turn_dir: TurnDir,

    /// A pickup request is already pending
    pub send_pickup: bool,

    pub pose: &'a Pose,
    pub vel: f64,
    pub near_sample: bool,
    pub picking_up: bool,
    pub perceived: &'a Perceived,
    pub params: &'a RoverParams,

    pub pid: &'a mut PidController,
    pub planner: &'a mut PolicyStore,
}

/// Result of the decision step, which replaces the rover's decision fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionOutput {
    pub mode: NavMode,
    pub turn_dir: TurnDir,
    pub send_pickup: bool,
    pub actuation: Actuation,
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

pub trait Decision {
    fn decide(&mut self, ctx: DecisionCtx) -> DecisionOutput;
}
