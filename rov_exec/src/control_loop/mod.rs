//! # Control loop
//!
//! Turns each telemetry event into exactly one command for the simulator.
//!
//! For every event the loop:
//!
//! 1. counts the frame for the FPS figure,
//! 2. relinquishes control to the manual driver if there is no telemetry payload,
//! 3. ingests the payload into the [`RoverState`],
//! 4. emits a zeroed command if the telemetry is invalid (the `Fault` state),
//! 5. otherwise runs perception, decision and output composition and emits either a pickup or a
//!    control command, never both.
//!
//! The loop holds no reference to the transport, see [`crate::driver`] for how it is driven.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod fps;

pub use fps::FpsCounter;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::time::Instant;

use chrono::{DateTime, Utc};
use comms_if::sim::{ControlCmd, SimCmd, SimTelemetry};
use log::{debug, info, trace, warn};

use crate::{
    decision::Decision,
    output::{OutputComposer, OutputImages},
    perception::Perception,
    rover_state::RoverState,
    telemetry
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The telemetry to command loop.
pub struct ControlLoop<P, D, O> {
    perception: P,
    decision: D,
    composer: O,

    fps: FpsCounter,
    state: LoopState,
}

/// Result of one step of the loop.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutput {
    /// The command to send in response to the telemetry
    pub cmd: SimCmd,

    /// True if a camera frame was ingested this step
    pub ingested: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// The last telemetry was valid
    Processing,

    /// The last telemetry was invalid and a zeroed command was sent
    Fault,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<P, D, O> ControlLoop<P, D, O>
where
    P: Perception,
    D: Decision,
    O: OutputComposer
{
    pub fn new(perception: P, decision: D, composer: O) -> Self {
        Self {
            perception,
            decision,
            composer,
            fps: FpsCounter::new(Instant::now()),
            state: LoopState::Processing
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Frames per second over the last full second.
    pub fn fps(&self) -> Option<u32> {
        self.fps.fps()
    }

    /// Process one telemetry event.
    ///
    /// `None` means the simulator sent an empty payload, i.e. it is being driven manually.
    pub fn step(&mut self, rover: &mut RoverState, telem: Option<&SimTelemetry>) -> StepOutput {
        self.step_at(rover, telem, Instant::now(), Utc::now())
    }

    /// As [`ControlLoop::step`] with explicit clock readings.
    pub fn step_at(
        &mut self,
        rover: &mut RoverState,
        telem: Option<&SimTelemetry>,
        now: Instant,
        utc_now: DateTime<Utc>
    ) -> StepOutput {
        if let Some(fps) = self.fps.tick(now) {
            debug!("Current FPS: {}", fps);
        }

        let telem = match telem {
            Some(t) => t,
            None => {
                trace!("No telemetry, handing over to the manual driver");
                return StepOutput {
                    cmd: SimCmd::Manual {},
                    ingested: false
                }
            }
        };

        if let Err(e) = telemetry::update_rover_at(rover, telem, utc_now) {
            warn!("Malformed telemetry: {}", e);
            return self.fault(false)
        }

        if !rover.has_valid_velocity() {
            warn!("Invalid velocity in telemetry ({})", rover.vel());
            return self.fault(true)
        }

        if self.state == LoopState::Fault {
            info!("Valid telemetry recieved, resuming processing");
        }
        self.state = LoopState::Processing;

        rover.run_perception(&mut self.perception);
        rover.run_decision(&mut self.decision);

        let images = match self.composer.compose(rover) {
            Ok(i) => i,
            Err(e) => {
                warn!("Could not compose the output images: {}", e);
                OutputImages::default()
            }
        };

        let act = rover.actuation();

        if !act.is_finite() {
            warn!("Decision produced a non-finite actuation demand: {:?}", act);
            return self.fault(true)
        }

        let cmd = if rover.take_pickup_request() {
            info!("Picking up");
            SimCmd::Pickup {}
        }
        else {
            SimCmd::Control(ControlCmd::new(
                act.throttle,
                act.brake,
                act.steer_deg,
                images.image1,
                images.image2
            ))
        };

        StepOutput {
            cmd,
            ingested: true
        }
    }

    /// Respond to a telemetry event whose payload could not be read at all.
    pub fn reject(&mut self, reason: &str) -> StepOutput {
        self.fps.tick(Instant::now());
        warn!("Malformed telemetry: {}", reason);

        self.fault(false)
    }

    fn fault(&mut self, ingested: bool) -> StepOutput {
        self.state = LoopState::Fault;

        StepOutput {
            cmd: SimCmd::Control(ControlCmd::zero()),
            ingested
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
