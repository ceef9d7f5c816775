//! # Driver
//!
//! Runs the control loop against a [`SimLink`], sending exactly one command for every telemetry
//! event in the order the events arrive.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{thread, time::Duration};

use chrono::Utc;
use comms_if::sim::{ControlCmd, SimCmd};
use log::{info, warn};

use crate::{
    control_loop::ControlLoop,
    decision::Decision,
    output::OutputComposer,
    perception::Perception,
    recorder::FrameRecorder,
    rover_state::RoverState,
    sim_client::{SimClientError, SimEvent, SimLink}
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Once this many link errors have happened in a row only every this many'th one is logged.
const LINK_ERROR_LOG_INTERVAL: u64 = 50;

/// Pause after a link error so a broken link does not spin the loop.
const LINK_ERROR_BACKOFF: Duration = Duration::from_millis(5);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct Driver<L, P, D, O> {
    link: L,
    ctrl: ControlLoop<P, D, O>,
    recorder: Option<FrameRecorder>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Whether the driver should keep running after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<L, P, D, O> Driver<L, P, D, O>
where
    L: SimLink,
    P: Perception,
    D: Decision,
    O: OutputComposer
{
    /// Create a new driver. If a recorder is given every ingested camera frame is saved.
    pub fn new(link: L, ctrl: ControlLoop<P, D, O>, recorder: Option<FrameRecorder>) -> Self {
        Self {
            link,
            ctrl,
            recorder
        }
    }

    pub fn control_loop(&self) -> &ControlLoop<P, D, O> {
        &self.ctrl
    }

    /// Run until the link is closed.
    ///
    /// Link errors are logged and the driver carries on.
    pub fn run(&mut self, rover: &mut RoverState) {
        let mut num_consec_errors = 0u64;

        loop {
            match self.poll(rover) {
                Ok(Flow::Continue) => {
                    if num_consec_errors >= LINK_ERROR_LOG_INTERVAL {
                        info!("Simulator link recovered after {} errors", num_consec_errors);
                    }
                    num_consec_errors = 0;
                },
                Ok(Flow::Stop) => {
                    match self.ctrl.fps() {
                        Some(fps) => info!("Simulator link closed at {} FPS, stopping", fps),
                        None => info!("Simulator link closed, stopping")
                    }
                    return
                },
                Err(e) => {
                    num_consec_errors += 1;

                    if num_consec_errors < LINK_ERROR_LOG_INTERVAL {
                        warn!("Simulator link error: {}", e);
                    }
                    else if num_consec_errors % LINK_ERROR_LOG_INTERVAL == 0 {
                        warn!("{} simulator link errors in a row, latest: {}", num_consec_errors, e);
                    }

                    thread::sleep(LINK_ERROR_BACKOFF);
                }
            }
        }
    }

    /// Handle the next event from the link.
    pub fn poll(&mut self, rover: &mut RoverState) -> Result<Flow, SimClientError> {
        match self.link.recv_event()? {
            SimEvent::Connected => {
                info!("Simulator connected, parking the rover and requesting the samples");

                self.send(&SimCmd::Control(ControlCmd::zero()))?;
                self.send(&SimCmd::GetSamples {})?;
            },
            SimEvent::Telemetry(telem) => {
                let out = self.ctrl.step(rover, telem.as_ref());
                let sent = self.send(&out.cmd);

                if out.ingested {
                    self.record(rover);
                }

                sent?;
            },
            SimEvent::MalformedTelemetry(reason) => {
                let out = self.ctrl.reject(&reason);
                self.send(&out.cmd)?;
            },
            SimEvent::Idle => (),
            SimEvent::Closed => return Ok(Flow::Stop)
        }

        Ok(Flow::Continue)
    }

    /// Send a command then give the transport a chance to flush it.
    fn send(&mut self, cmd: &SimCmd) -> Result<(), SimClientError> {
        let res = self.link.send(cmd);
        thread::yield_now();

        res
    }

    fn record(&mut self, rover: &RoverState) {
        let (recorder, image) = match (self.recorder.as_mut(), rover.camera_image()) {
            (Some(r), Some(i)) => (r, i),
            _ => return
        };

        if let Err(e) = recorder.record(image, Utc::now()) {
            warn!("Could not record the camera frame: {}", e);
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::VecDeque;

    use comms_if::sim::SimValue;

    use crate::{
        control_loop::LoopState,
        decision::ReactiveDecision,
        output::JpegComposer,
        perception::ThreshPerception,
        planner::NavGrid,
        rover_state::RoverParams,
        sim_client::parse_event,
        telemetry::test::sim_telem
    };

    /// A link which fails `failures` times, then replays a list of events, then closes.
    #[derive(Default)]
    struct MockLink {
        events: VecDeque<SimEvent>,
        sent: Vec<SimCmd>,
        failures: usize,
    }

    impl SimLink for MockLink {
        fn recv_event(&mut self) -> Result<SimEvent, SimClientError> {
            if self.failures > 0 {
                self.failures -= 1;
                return Err(SimClientError::NonUtf8)
            }

            Ok(self.events.pop_front().unwrap_or(SimEvent::Closed))
        }

        fn send(&mut self, cmd: &SimCmd) -> Result<(), SimClientError> {
            self.sent.push(cmd.clone());
            Ok(())
        }
    }

    type TestDriver = Driver<MockLink, ThreshPerception, ReactiveDecision, JpegComposer>;

    fn driver(link: MockLink, recorder: Option<FrameRecorder>) -> (TestDriver, RoverState) {
        let grid = NavGrid::open(200, 200);
        let rover = RoverState::new(RoverParams::default(), grid.clone()).unwrap();
        let ctrl = ControlLoop::new(ThreshPerception, ReactiveDecision, JpegComposer::new(grid));

        (Driver::new(link, ctrl, recorder), rover)
    }

    #[test]
    fn test_run() {
        let dir = std::env::temp_dir().join(format!("rov_exec_driver_{}", std::process::id()));
        let recorder = FrameRecorder::init(&dir).unwrap();

        let link = MockLink {
            events: vec![
                SimEvent::Connected,
                SimEvent::Idle,
                SimEvent::Telemetry(None),
                SimEvent::Telemetry(Some(sim_telem(SimValue::Number(1.2)))),
                SimEvent::Telemetry(Some(sim_telem(SimValue::Number(f64::NAN)))),
                SimEvent::MalformedTelemetry("bad".into()),
            ].into(),
            ..Default::default()
        };

        let (mut driver, mut rover) = driver(link, Some(recorder));

        driver.run(&mut rover);

        let sent = &driver.link.sent;
        assert_eq!(sent.len(), 6);
        assert_eq!(sent[0], SimCmd::Control(ControlCmd::zero()));
        assert_eq!(sent[1], SimCmd::GetSamples {});
        assert_eq!(sent[2], SimCmd::Manual {});
        assert!(matches!(sent[3], SimCmd::Control(ref c) if !c.inset_image1.is_empty()));
        assert_eq!(sent[4], SimCmd::Control(ControlCmd::zero()));
        assert_eq!(sent[5], SimCmd::Control(ControlCmd::zero()));
        assert_eq!(driver.control_loop().state(), LoopState::Fault);

        // Both ingested frames were recorded, the manual and malformed events were not
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 2);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_keeps_running_after_link_errors() {
        let link = MockLink {
            events: vec![SimEvent::Telemetry(None)].into(),
            failures: 3 * LINK_ERROR_LOG_INTERVAL as usize,
            ..Default::default()
        };
        let (mut driver, mut rover) = driver(link, None);

        driver.run(&mut rover);

        assert_eq!(driver.link.failures, 0);
        assert_eq!(driver.link.sent, vec![SimCmd::Manual {}]);
    }

    #[test]
    fn test_nan_speed_literal_gets_zero_command() {
        let msg = r#"{"event": "telemetry", "data": {"speed": NaN, "throttle": 0.0}}"#;
        let link = MockLink {
            events: vec![parse_event(msg)].into(),
            ..Default::default()
        };
        let (mut driver, mut rover) = driver(link, None);

        driver.run(&mut rover);

        assert_eq!(driver.link.sent, vec![SimCmd::Control(ControlCmd::zero())]);
        assert_eq!(driver.control_loop().state(), LoopState::Fault);
    }

    #[test]
    fn test_recording_failure_is_skipped() {
        let dir = std::env::temp_dir()
            .join(format!("rov_exec_driver_unwritable_{}", std::process::id()));
        let recorder = FrameRecorder::init(&dir).unwrap();

        // The directory disappears under the recorder, so every write fails
        std::fs::remove_dir_all(&dir).unwrap();

        let link = MockLink {
            events: vec![
                SimEvent::Telemetry(Some(sim_telem(SimValue::Number(1.2)))),
                SimEvent::Telemetry(Some(sim_telem(SimValue::Number(1.2)))),
            ].into(),
            ..Default::default()
        };
        let (mut driver, mut rover) = driver(link, Some(recorder));

        driver.run(&mut rover);

        let sent = &driver.link.sent;
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|c| matches!(c, SimCmd::Control(c) if !c.inset_image1.is_empty())));
        assert_eq!(driver.control_loop().state(), LoopState::Processing);
        assert!(!dir.exists());
    }
}
