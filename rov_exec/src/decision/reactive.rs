//! Reactive forward/stop decision step
//!
//! The rover drives forward while there is enough open terrain ahead, steering along the mean
//! navigable angle. When the way ahead closes up it brakes to a halt and turns on the spot until
//! it finds enough open terrain to drive forward again. While goals remain, the steering is
//! biased towards the heading given by the policy grid.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, info, warn};
use util::maths::{clamp, get_ang_dist_2pi, mean};

use super::{Decision, DecisionCtx, DecisionOutput};
use crate::{
    planner::{compute_policy, GridCell, PolicyStore},
    rover_state::{Actuation, NavMode, Perceived, Pose, RoverParams, TurnDir}
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Speed below which the rover is considered stationary.
///
/// Units: meters/second
const STOPPED_VEL: f64 = 0.2;

/// Fraction of the heading error to the goal added to the vision steering
const GOAL_STEER_GAIN: f64 = 0.5;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Reactive decision step with goal biased steering.
#[derive(Debug, Default)]
pub struct ReactiveDecision;

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Decision for ReactiveDecision {
    fn decide(&mut self, ctx: DecisionCtx) -> DecisionOutput {
        let params = ctx.params;
        let perceived = ctx.perceived;

        let mut out = DecisionOutput {
            mode: ctx.mode,
            turn_dir: ctx.turn_dir,
            send_pickup: ctx.send_pickup,
            actuation: Actuation::default()
        };

        let goal_heading = plan(ctx.planner, ctx.pose, params);

        // Hold still next to a sample and ask for it to be picked up
        if ctx.near_sample || ctx.picking_up {
            out.actuation.brake = params.brake_set;

            let stationary = ctx.vel.abs() < STOPPED_VEL;

            if ctx.near_sample && !ctx.picking_up && stationary && !ctx.send_pickup {
                info!("Stopped next to a sample, requesting pickup");
                out.send_pickup = true;
            }

            return out
        }

        let nav_angle_deg = mean(&perceived.nav_angles).map(f64::to_degrees);

        match ctx.mode {
            NavMode::Forward => {
                let wall_ahead = mean(&perceived.nav_dists)
                    .map(|d| d < params.min_wall_distance)
                    .unwrap_or(true);

                if perceived.nav_angles.len() >= params.stop_forward && !wall_ahead {
                    let target_vel = if perceived.sample_detected {
                        params.max_vel / 2.0
                    }
                    else {
                        params.max_vel
                    };

                    ctx.pid.set_desired(target_vel);
                    let demand = ctx.pid.update(ctx.vel);

                    out.actuation.throttle = clamp(&demand, &0.0, &params.throttle_set);
                    out.actuation.steer_deg = forward_steer(
                        perceived, nav_angle_deg, goal_heading, ctx.pose, params
                    );
                }
                else {
                    debug!(
                        "Way ahead closed ({} navigable pixels, wall ahead: {}), stopping",
                        perceived.nav_angles.len(), wall_ahead
                    );

                    out.mode = NavMode::Stop;
                    out.actuation.brake = params.brake_set;
                    ctx.pid.reset();
                }
            },
            NavMode::Stop => {
                if ctx.vel.abs() > STOPPED_VEL {
                    out.actuation.brake = params.brake_set;
                }
                else {
                    let can_go = perceived.nav_angles.len() >= params.go_forward
                        && nav_angle_deg
                            .map(|a| a.abs() <= params.angle_forward_deg)
                            .unwrap_or(false);

                    if can_go {
                        debug!("Way ahead open, driving forward");

                        out.mode = NavMode::Forward;
                        out.turn_dir = TurnDir::None;
                        ctx.pid.reset();

                        out.actuation.throttle = params.throttle_set;
                        out.actuation.steer_deg = clamp(
                            &nav_angle_deg.unwrap_or(0.0),
                            &-params.max_steer_deg,
                            &params.max_steer_deg
                        );
                    }
                    else {
                        if out.turn_dir == TurnDir::None {
                            out.turn_dir = choose_turn(nav_angle_deg, goal_heading, ctx.pose);
                            debug!("Turning on the spot {:?}", out.turn_dir);
                        }

                        out.actuation.steer_deg = match out.turn_dir {
                            TurnDir::Left => params.max_steer_deg,
                            _ => -params.max_steer_deg,
                        };
                    }
                }
            }
        }

        out
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Update the planner for the rover's position and return the policy heading from the rover's
/// cell, in degrees anticlockwise from east.
///
/// Returns `None` once all goals are exhausted, in which case the rover navigates on vision
/// alone.
fn plan(planner: &mut PolicyStore, pose: &Pose, params: &RoverParams) -> Option<f64> {
    let cell = GridCell::from_position(pose.pos)?;

    loop {
        let goal = planner.current_goal()?;

        if cell.dist(&goal) <= params.goal_reached_cells {
            planner.goal_reached();
            continue
        }

        if !planner.grid_set() {
            match compute_policy(planner.grid(), goal) {
                Some(policy) => {
                    if let Err(e) = planner.set_policy(policy) {
                        warn!("Could not set the policy: {}", e);
                        return None
                    }
                    debug!("Policy computed for goal ({}, {})", goal.x, goal.y);
                },
                None => {
                    planner.goal_unreachable();
                    continue
                }
            }
        }

        match planner.action_at(&cell) {
            Some(action) => return action.heading_deg(),
            // The map can disagree with where the rover actually is, so only give up on the goal
            // if the rover's cell is open
            None if planner.grid().is_traversable(&cell) => {
                planner.goal_unreachable();
                continue
            },
            None => return None
        }
    }
}

/// Heading error from the rover's yaw to the given heading, in degrees, positive to the left.
fn heading_error_deg(heading_deg: f64, pose: &Pose) -> f64 {
    get_ang_dist_2pi(
        pose.yaw_deg.to_radians(),
        heading_deg.to_radians()
    ).to_degrees()
}

/// Steering while driving forward.
fn forward_steer(
    perceived: &Perceived,
    nav_angle_deg: Option<f64>,
    goal_heading: Option<f64>,
    pose: &Pose,
    params: &RoverParams
) -> f64 {
    let sample_angle_deg = mean(&perceived.sample_angles).map(f64::to_degrees);

    let steer = match (perceived.sample_detected, sample_angle_deg, goal_heading) {
        (true, Some(a), _) => a,
        (_, _, Some(h)) => {
            nav_angle_deg.unwrap_or(0.0) + GOAL_STEER_GAIN * heading_error_deg(h, pose)
        },
        _ => nav_angle_deg.unwrap_or(0.0),
    };

    clamp(&steer, &-params.max_steer_deg, &params.max_steer_deg)
}

/// Pick the direction of an on the spot turn, towards the goal if there is one, otherwise
/// towards the more open side.
fn choose_turn(nav_angle_deg: Option<f64>, goal_heading: Option<f64>, pose: &Pose) -> TurnDir {
    let bias = match goal_heading {
        Some(h) => heading_error_deg(h, pose),
        None => nav_angle_deg.unwrap_or(0.0)
    };

    if bias > 0.0 {
        TurnDir::Left
    }
    else {
        TurnDir::Right
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::{planner::NavGrid, speed_ctrl::PidController};

    struct Fixture {
        params: RoverParams,
        pid: PidController,
        planner: PolicyStore,
        pose: Pose,
        perceived: Perceived,
    }

    impl Fixture {
        fn new(goals: &[GridCell]) -> Self {
            let params = RoverParams::default();

            Self {
                pid: PidController::new(params.pid_k_p, params.pid_k_i, params.pid_k_d),
                planner: PolicyStore::new(NavGrid::open(20, 20), goals),
                params,
                pose: Pose { pos: [5.5, 5.5], ..Pose::default() },
                perceived: Perceived::default(),
            }
        }

        /// Perceive `n` navigable pixels at the given angle and distance.
        fn see(&mut self, n: usize, angle_deg: f64, dist: f64) {
            self.perceived.nav_angles = vec![angle_deg.to_radians(); n];
            self.perceived.nav_dists = vec![dist; n];
        }

        fn decide(&mut self, mode: NavMode, turn_dir: TurnDir, vel: f64) -> DecisionOutput {
            ReactiveDecision.decide(DecisionCtx {
                mode,
                turn_dir,
                send_pickup: false,
                pose: &self.pose,
                vel,
                near_sample: false,
                picking_up: false,
                perceived: &self.perceived,
                params: &self.params,
                pid: &mut self.pid,
                planner: &mut self.planner,
            })
        }
    }

    #[test]
    fn test_forward_to_stop() {
        let mut f = Fixture::new(&[]);
        f.see(10, 0.0, 50.0);

        let out = f.decide(NavMode::Forward, TurnDir::None, 1.2);

        assert_eq!(out.mode, NavMode::Stop);
        assert_eq!(out.actuation.throttle, 0.0);
        assert_eq!(out.actuation.brake, f.params.brake_set);
        assert_eq!(f.pid, PidController::new(2.0, 0.005, 0.5));
    }

    #[test]
    fn test_wall_ahead_stops() {
        let mut f = Fixture::new(&[]);
        f.see(500, 0.0, 10.0);

        assert_eq!(f.decide(NavMode::Forward, TurnDir::None, 1.2).mode, NavMode::Stop);
    }

    #[test]
    fn test_forward_speed_control() {
        let mut f = Fixture::new(&[]);
        f.see(500, 30.0, 50.0);

        let out = f.decide(NavMode::Forward, TurnDir::None, 0.0);

        assert_eq!(out.mode, NavMode::Forward);
        assert_eq!(out.actuation.throttle, f.params.throttle_set);
        assert_eq!(out.actuation.brake, 0.0);
        assert_eq!(out.actuation.steer_deg, f.params.max_steer_deg);
        assert_eq!(f.pid.desired(), f.params.max_vel);

        // Over speed gives no throttle
        let out = f.decide(NavMode::Forward, TurnDir::None, 9.0);
        assert_eq!(out.actuation.throttle, 0.0);

        // Approaching a sample halves the target speed
        f.perceived.sample_detected = true;
        f.perceived.sample_angles = vec![(-5f64).to_radians(); 6];
        let out = f.decide(NavMode::Forward, TurnDir::None, 1.0);
        assert_eq!(f.pid.desired(), f.params.max_vel / 2.0);
        assert!((out.actuation.steer_deg + 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_stop_brakes_then_turns_monotonically() {
        let mut f = Fixture::new(&[]);
        f.see(10, -30.0, 50.0);

        // Still moving
        let out = f.decide(NavMode::Stop, TurnDir::None, 1.0);
        assert_eq!(out.actuation.brake, f.params.brake_set);
        assert_eq!(out.turn_dir, TurnDir::None);

        // Rolling backwards is still moving
        let out = f.decide(NavMode::Stop, TurnDir::None, -1.0);
        assert_eq!(out.actuation.brake, f.params.brake_set);
        assert_eq!(out.actuation.steer_deg, 0.0);
        assert_eq!(out.turn_dir, TurnDir::None);

        // Stationary, turns towards the open side
        let out = f.decide(NavMode::Stop, TurnDir::None, 0.0);
        assert_eq!(out.mode, NavMode::Stop);
        assert_eq!(out.turn_dir, TurnDir::Right);
        assert_eq!(out.actuation.steer_deg, -f.params.max_steer_deg);
        assert_eq!(out.actuation.brake, 0.0);

        // Keeps turning the same way even when the open side moves
        f.see(10, 30.0, 50.0);
        let out = f.decide(NavMode::Stop, out.turn_dir, 0.0);
        assert_eq!(out.turn_dir, TurnDir::Right);
        assert_eq!(out.actuation.steer_deg, -f.params.max_steer_deg);
    }

    #[test]
    fn test_stop_to_forward() {
        let mut f = Fixture::new(&[]);

        // Enough terrain but too far off to the side
        f.see(100, 40.0, 50.0);
        assert_eq!(f.decide(NavMode::Stop, TurnDir::Left, 0.0).mode, NavMode::Stop);

        f.see(100, 10.0, 50.0);
        let out = f.decide(NavMode::Stop, TurnDir::Left, 0.0);

        assert_eq!(out.mode, NavMode::Forward);
        assert_eq!(out.turn_dir, TurnDir::None);
        assert_eq!(out.actuation.throttle, f.params.throttle_set);
        assert!((out.actuation.steer_deg - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_pickup_request() {
        let mut f = Fixture::new(&[]);

        let out = ReactiveDecision.decide(DecisionCtx {
            mode: NavMode::Forward,
            turn_dir: TurnDir::None,
            send_pickup: false,
            pose: &f.pose,
            vel: 0.0,
            near_sample: true,
            picking_up: false,
            perceived: &f.perceived,
            params: &f.params,
            pid: &mut f.pid,
            planner: &mut f.planner,
        });

        assert!(out.send_pickup);
        assert_eq!(out.actuation.brake, f.params.brake_set);
        assert_eq!(out.actuation.throttle, 0.0);
    }

    #[test]
    fn test_goal_bias_and_advance() {
        // Rover at (5, 5), first goal due north
        let mut f = Fixture::new(&[GridCell::new(5, 15), GridCell::new(6, 13)]);
        f.see(500, 0.0, 50.0);

        let out = f.decide(NavMode::Forward, TurnDir::None, 1.0);

        assert!(f.planner.grid_set());
        assert_eq!(f.planner.current_goal(), Some(GridCell::new(5, 15)));
        assert_eq!(out.actuation.steer_deg, f.params.max_steer_deg);

        // Arrive at the goal, the next one is also within reach so the planner runs out
        f.pose.pos = [5.5, 14.5];
        f.pose.yaw_deg = 90.0;
        let out = f.decide(NavMode::Forward, TurnDir::None, 1.0);

        assert!(f.planner.is_exhausted());
        assert!(!f.planner.grid_set());
        assert_eq!(out.actuation.steer_deg, 0.0);
    }

    #[test]
    fn test_unreachable_goal_skipped() {
        let mut f = Fixture::new(&[GridCell::new(50, 50), GridCell::new(15, 5)]);
        f.see(500, 0.0, 50.0);

        f.decide(NavMode::Forward, TurnDir::None, 1.0);

        assert_eq!(f.planner.current_goal(), Some(GridCell::new(15, 5)));
        assert!(f.planner.grid_set());
    }
}
