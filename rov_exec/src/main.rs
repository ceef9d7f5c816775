//! Main rover-side executable entry point.
//!
//! # Architecture
//!
//! The executable waits for the simulator bridge to connect, then for every telemetry event:
//!
//!     - Telemetry ingestion into the rover state
//!     - Perception of the camera image
//!     - Decision of mode and actuation, including speed control and path planning
//!     - Output image composition
//!     - Emission of one command back to the simulator
//!     - Recording of the camera frame, if enabled
//!
//! # Usage
//!
//!     rov_exec [RECORDING_DIR]
//!
//! If a recording directory is given it is cleared (or created) and every camera frame of the run
//! is saved into it.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info};
use std::env;
use color_eyre::{Report, eyre::{WrapErr, eyre}};

// Internal
use rov_lib::{
    control_loop::ControlLoop,
    decision::ReactiveDecision,
    driver::Driver,
    output::JpegComposer,
    params::RovExecParams,
    perception::ThreshPerception,
    planner::NavGrid,
    recorder::FrameRecorder,
    rover_state::{RoverParams, RoverState},
    sim_client::SimClient
};
use util::{
    host,
    logger::{logger_init, LevelFilter},
    session::Session
};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {

    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new(
        "rov_exec",
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Rover Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let exec_params: RovExecParams = util::params::load(
        "rov_exec.toml"
    ).wrap_err("Could not load exec params")?;

    let rover_params: RoverParams = util::params::load(
        "rover.toml"
    ).wrap_err("Could not load rover params")?;

    info!("Parameters loaded");

    // ---- RECORDING ----

    // Collect all arguments
    let args: Vec<String> = env::args().collect();

    debug!("CLI arguments: {:?}", args);

    let recorder = match args.len() {
        1 => {
            info!("NOT recording this run");
            None
        },
        2 => {
            let r = FrameRecorder::init(&args[1])
                .wrap_err("Failed to initialise the frame recorder")?;
            info!("Recording this run to {:?}", r.dir());
            Some(r)
        },
        n => return Err(eyre!(
            "Expected either zero or one argument, found {}", n - 1
        ))
    };

    // ---- INITIALISE ROVER STATE ----

    let map_path = host::get_sw_root()
        .wrap_err("Could not get the software root")?
        .join(&exec_params.map_path);

    let grid = NavGrid::load(&map_path)
        .wrap_err_with(|| format!("Failed to load the map from {:?}", map_path))?;

    info!(
        "Loaded {}x{} map with {} traversable cells",
        grid.width(), grid.height(), grid.num_traversable()
    );

    let mut rover = RoverState::new(rover_params, grid.clone())
        .wrap_err("Failed to initialise the rover state")?;

    let ctrl = ControlLoop::new(
        ThreshPerception,
        ReactiveDecision,
        JpegComposer::new(grid)
    );

    // ---- INITIALISE NETWORK ----

    info!("Initialising network");

    let zmq_ctx = comms_if::net::zmq::Context::new();

    let sim_client = SimClient::new(&zmq_ctx, &exec_params)
        .wrap_err("Failed to initialise SimClient")?;
    info!("SimClient initialised");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    Driver::new(sim_client, ctrl, recorder).run(&mut rover);

    info!("End of execution");

    Ok(())
}
