//! Rover state record and its writer methods

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use image::RgbImage;

use super::{Calibration, CalibrationError, NavMode, RoverParams, TurnDir, WorldMap};
use crate::{
    decision::{Decision, DecisionCtx},
    perception::{Perception, PerceptionCtx},
    planner::{NavGrid, PolicyStore},
    speed_ctrl::PidController,
    telemetry::Telemetry
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Position and attitude of the rover as reported by the simulator.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Pose {
    /// Position in the world, `[x, y]`.
    ///
    /// Units: meters
    pub pos: [f64; 2],

    pub yaw_deg: f64,
    pub pitch_deg: f64,
    pub roll_deg: f64,
}

/// Output of perception for the latest processed frame.
///
/// Angles are in radians in the rover frame, positive to the left of straight ahead. Distances
/// are in pixels of the warped (top-down) view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Perceived {
    pub nav_angles: Vec<f64>,
    pub nav_dists: Vec<f64>,
    pub sample_angles: Vec<f64>,
    pub sample_dists: Vec<f64>,
    pub sample_detected: bool,
}

/// Actuation demands to be sent to the simulator.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Actuation {
    pub throttle: f64,
    pub brake: f64,
    pub steer_deg: f64,
}

/// The rover's state.
///
/// See the module documentation for which method writes which fields.
#[derive(Debug, Clone, PartialEq)]
pub struct RoverState {

    // ---- BOOKKEEPING ----

    /// Time the first telemetry frame was recieved
    start_time: Option<DateTime<Utc>>,

    /// Time since `start_time`.
    ///
    /// Units: seconds
    total_time_s: f64,

    /// If true perception skips the next frame
    skip_next: bool,

    // ---- TELEMETRY ----

    pose: Pose,

    /// Units: meters/second
    vel: f64,

    near_sample: bool,
    picking_up: bool,
    camera_image: Option<RgbImage>,

    /// Actual positions of the samples in the world, as reported when the run started
    samples_pos: Vec<[f64; 2]>,
    samples_to_find: usize,
    samples_collected: usize,

    // ---- ACTUATION ----

    actuation: Actuation,

    // ---- PERCEPTION ----

    perceived: Perceived,
    vision_image: RgbImage,
    worldmap: WorldMap,

    // ---- DECISION ----

    mode: NavMode,
    turn_dir: TurnDir,
    send_pickup: bool,

    // ---- OWNED ----

    params: RoverParams,
    calib: Calibration,
    pid: PidController,
    planner: PolicyStore,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Actuation {
    pub fn is_finite(&self) -> bool {
        self.throttle.is_finite() && self.brake.is_finite() && self.steer_deg.is_finite()
    }
}

impl RoverState {
    /// Create the state for a new run over the given navigation grid.
    pub fn new(params: RoverParams, grid: NavGrid) -> Result<Self, CalibrationError> {
        let calib = Calibration::new(grid.width(), grid.height())?;
        let pid = PidController::new(params.pid_k_p, params.pid_k_i, params.pid_k_d);
        let planner = PolicyStore::new(grid, &params.goal_cells());

        Ok(Self {
            start_time: None,
            total_time_s: 0.0,
            skip_next: false,
            pose: Pose::default(),
            vel: 0.0,
            near_sample: false,
            picking_up: false,
            camera_image: None,
            samples_pos: Vec::new(),
            samples_to_find: 0,
            samples_collected: 0,
            actuation: Actuation::default(),
            perceived: Perceived::default(),
            vision_image: RgbImage::new(calib.image_width, calib.image_height),
            worldmap: WorldMap::new(calib.world_width, calib.world_height),
            mode: NavMode::default(),
            turn_dir: TurnDir::default(),
            send_pickup: false,
            params,
            calib,
            pid,
            planner,
        })
    }

    // ---- TELEMETRY WRITER ----

    /// Overwrite the telemetry mirror with a new reading.
    ///
    /// The first reading also fixes the start time and the sample inventory.
    pub fn ingest(&mut self, telem: Telemetry, now: DateTime<Utc>) {
        match self.start_time {
            None => {
                self.start_time = Some(now);
                self.samples_pos = telem.samples_pos;
                self.samples_to_find = telem.sample_count.unwrap_or(0);
            },
            Some(t) => {
                self.total_time_s = util::time::duration_to_seconds(now - t)
                    .unwrap_or(self.total_time_s);
            }
        }

        if let Some(remaining) = telem.sample_count {
            self.samples_collected = self.samples_to_find.saturating_sub(remaining);
        }

        self.pose = telem.pose;
        self.vel = telem.vel;
        self.near_sample = telem.near_sample;
        self.picking_up = telem.picking_up;
        self.camera_image = Some(telem.image);
    }

    // ---- PERCEPTION WRITER ----

    /// Run perception on the current camera image.
    ///
    /// Does nothing if no image has been recieved yet.
    pub fn run_perception<P: Perception + ?Sized>(&mut self, perception: &mut P) {
        let image = match self.camera_image {
            Some(ref i) => i,
            None => return
        };

        let out = perception.perceive(PerceptionCtx {
            image,
            pose: &self.pose,
            calib: &self.calib,
            params: &self.params,
            skip_next: self.skip_next,
            worldmap: &mut self.worldmap
        });

        self.skip_next = out.skip_next;

        if let Some(frame) = out.frame {
            self.perceived = frame.perceived;
            self.vision_image = frame.vision_image;
        }
    }

    // ---- DECISION WRITER ----

    /// Run the decision step, which also drives the speed controller and the planner.
    pub fn run_decision<D: Decision + ?Sized>(&mut self, decision: &mut D) {
        let out = decision.decide(DecisionCtx {
            mode: self.mode,
            turn_dir: self.turn_dir,
            send_pickup: self.send_pickup,
            pose: &self.pose,
            vel: self.vel,
            near_sample: self.near_sample,
            picking_up: self.picking_up,
            perceived: &self.perceived,
            params: &self.params,
            pid: &mut self.pid,
            planner: &mut self.planner
        });

        self.mode = out.mode;
        self.turn_dir = out.turn_dir;
        self.send_pickup = out.send_pickup;
        self.actuation = out.actuation;
    }

    /// Consume a pending pickup request.
    ///
    /// Returns `true` if a pickup should be sent now. The request is left pending while a pickup
    /// is already in progress.
    pub fn take_pickup_request(&mut self) -> bool {
        if self.send_pickup && !self.picking_up {
            self.send_pickup = false;
            true
        }
        else {
            false
        }
    }

    // ---- GETTERS ----

    /// A non-finite velocity marks a corrupt telemetry frame.
    pub fn has_valid_velocity(&self) -> bool {
        self.vel.is_finite()
    }

    pub fn actuation(&self) -> Actuation {
        self.actuation
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    pub fn total_time_s(&self) -> f64 {
        self.total_time_s
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    pub fn vel(&self) -> f64 {
        self.vel
    }

    pub fn near_sample(&self) -> bool {
        self.near_sample
    }

    pub fn picking_up(&self) -> bool {
        self.picking_up
    }

    pub fn camera_image(&self) -> Option<&RgbImage> {
        self.camera_image.as_ref()
    }

    pub fn samples_pos(&self) -> &[[f64; 2]] {
        &self.samples_pos
    }

    pub fn samples_to_find(&self) -> usize {
        self.samples_to_find
    }

    pub fn samples_collected(&self) -> usize {
        self.samples_collected
    }

    pub fn perceived(&self) -> &Perceived {
        &self.perceived
    }

    pub fn vision_image(&self) -> &RgbImage {
        &self.vision_image
    }

    pub fn worldmap(&self) -> &WorldMap {
        &self.worldmap
    }

    pub fn mode(&self) -> NavMode {
        self.mode
    }

    pub fn turn_dir(&self) -> TurnDir {
        self.turn_dir
    }

    pub fn send_pickup(&self) -> bool {
        self.send_pickup
    }

    pub fn params(&self) -> &RoverParams {
        &self.params
    }

    pub fn planner(&self) -> &PolicyStore {
        &self.planner
    }
}
