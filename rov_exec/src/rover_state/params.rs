//! Parameters for the rover state and the reference decision step

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::planner::GridCell;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Thresholds, limits and gains governing the rover's behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoverParams {

    // ---- ACTUATION ----

    /// Maximum throttle demand when accelerating
    pub throttle_set: f64,

    /// Brake demand when braking
    pub brake_set: f64,

    /// Maximum absolute steering demand.
    ///
    /// Units: degrees
    pub max_steer_deg: f64,

    /// Target speed when driving forward.
    ///
    /// Units: meters/second
    pub max_vel: f64,

    // ---- MODE TRANSITIONS ----

    /// Minimum number of navigable pixels to keep driving forward, below this the rover stops
    pub stop_forward: usize,

    /// Minimum number of navigable pixels needed to drive forward again after stopping
    pub go_forward: usize,

    /// Maximum absolute mean navigable angle at which the rover may drive forward again.
    ///
    /// Units: degrees
    pub angle_forward_deg: f64,

    /// Mean navigable distance below which the rover treats the terrain ahead as a wall.
    ///
    /// Units: pixels in the warped view
    pub min_wall_distance: f64,

    /// Pitch or roll beyond which the camera view is too tilted to be mapped.
    ///
    /// Units: degrees
    pub pitch_cutoff_deg: f64,

    /// Minimum number of sample pixels for a sample to count as detected
    pub sample_stop_forward: usize,

    // ---- SPEED CONTROL ----

    pub pid_k_p: f64,
    pub pid_k_i: f64,
    pub pid_k_d: f64,

    // ---- PLANNING ----

    /// Unexplored cells to visit, in order, as `[x, y]`
    pub goals: Vec<[usize; 2]>,

    /// Distance at which a goal counts as reached.
    ///
    /// Units: grid cells
    pub goal_reached_cells: usize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RoverParams {
    /// The goal list as grid cells.
    pub fn goal_cells(&self) -> Vec<GridCell> {
        self.goals.iter().map(|g| GridCell::new(g[0], g[1])).collect()
    }
}

impl Default for RoverParams {
    fn default() -> Self {
        Self {
            throttle_set: 1.25,
            brake_set: 0.5,
            max_steer_deg: 15.0,
            max_vel: 5.0,
            stop_forward: 20,
            go_forward: 50,
            angle_forward_deg: 20.0,
            min_wall_distance: 25.0,
            pitch_cutoff_deg: 2.5,
            sample_stop_forward: 5,
            pid_k_p: 2.0,
            pid_k_i: 0.005,
            pid_k_d: 0.5,
            goals: vec![
                [78, 75], [60, 101], [16, 98], [114, 11], [118, 50], [145, 95], [145, 95],
                [145, 40], [103, 189]
            ],
            goal_reached_cells: 3,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_params_file_matches_default() -> Result<(), util::params::LoadError> {
        let p: RoverParams = util::params::from_str(
            include_str!("../../../params/rover.toml")
        )?;

        assert_eq!(p, RoverParams::default());
        assert_eq!(p.goal_cells()[0], GridCell::new(78, 75));

        Ok(())
    }
}
