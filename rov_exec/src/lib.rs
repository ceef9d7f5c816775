//! # Rover library.
//!
//! The autonomous control core of the rover. This library allows the executable, benchmarks and
//! other crates in the workspace to access items defined inside the rover crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Control loop - turns each telemetry event into one command for the simulator
pub mod control_loop;

/// Decision - chooses the navigation mode and actuation demands
pub mod decision;

/// Driver - runs the control loop against the simulator link
pub mod driver;

/// Output composition - builds the inset images shown by the simulator
pub mod output;

/// Parameters for the rover executable
pub mod params;

/// Perception - finds navigable terrain and samples in the camera image
pub mod perception;

/// Path planning - navigation grid, policy grid and goal list
pub mod planner;

/// Frame recorder - saves the camera frames of a run
pub mod recorder;

/// Rover state - the single record of everything the rover knows
pub mod rover_state;

/// Simulation client - exchanges messages with the simulator bridge
pub mod sim_client;

/// Speed control - PID controller regulating the rover's speed
pub mod speed_ctrl;

/// Telemetry ingestion - parses telemetry into the rover state
pub mod telemetry;
