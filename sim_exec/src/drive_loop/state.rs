//! # Drive loop state machine

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info};
use nalgebra::Point2;
use serde::Serialize;

// Internal
use super::{Params, PidController, PidError};
use crate::{
    physics::{Robot, IN_PER_FT},
    telemetry::IndicatorColor,
    tracking::wheel_speeds,
    traj::TrajPoint,
};
use util::maths::get_ang_dist_2pi;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Deadband of the heading hold used while driving and steering towards a goal.
///
/// Units: degrees
const HEADING_HOLD_DEADBAND_DEG: f64 = 1.0;

/// Beyond this heading error the robot turns in place before translating.
///
/// Units: degrees
const MAX_TRANSLATING_HEADING_ERROR_DEG: f64 = 90.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The drivetrain control loop.
///
/// The loop owns the robot and both controllers. It never changes state on its own, the owner
/// selects a state with one of the `set_*_state` functions and then calls `on_loop` once per
/// cycle.
#[derive(Debug, Clone)]
pub struct DriveLoop {
    robot: Robot,

    drive_pid: PidController,
    turn_pid: PidController,

    state: DriveLoopState,

    /// Feedforward velocity constant
    ///
    /// Units: volts/(feet/second)
    k_v: f64,

    /// Feedforward acceleration constant
    ///
    /// Units: volts/(feet/second^2)
    k_a: f64,

    /// Latest profile setpoints for the left and right wheels
    left_setpoint: TrajPoint,
    right_setpoint: TrajPoint,

    /// Latest heading setpoint for the closed loop profile.
    ///
    /// Units: degrees
    heading_setpoint_deg: f64,

    /// Latest curve following setpoint as (linear feet/second, angular radians/second)
    curve_setpoint: (f64, f64),
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// States of the drive loop, each carrying the goal it was entered with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum DriveLoopState {
    /// Idle, no command is sent to the robot
    Waiting,

    /// Drive to a point, steering towards it every cycle
    DriveToGoal {
        goal_in: Point2<f64>,
        tolerance_in: f64,
        top_speed_fps: f64,
        min_speed_fps: f64,
        reverse: bool,
    },

    /// Drive a distance holding the heading the state was entered with
    DriveDistance {
        goal_pos_in: f64,
        goal_angle_deg: f64,
        tolerance_in: f64,
        top_speed_fps: f64,
        min_speed_fps: f64,
    },

    /// Turn in place to an absolute heading
    TurnAngle {
        goal_angle_deg: f64,
        tolerance_deg: f64,
        top_speed_fps: f64,
        min_speed_fps: f64,
    },

    /// Pure feedforward on the profile setpoints
    OpenLoopProfile,

    /// Feedforward plus position and heading feedback on the profile setpoints.
    ClosedLoopProfile {
        /// Average wheel position when the profile started
        start_pos_in: f64,
        tolerance_in: f64,
        tolerance_deg: f64,
    },

    /// Feedforward on a commanded linear and angular velocity
    CurveFollowing,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DriveLoop {
    /// Create a new loop in the `Waiting` state.
    ///
    /// Both controllers are scaled by the robot's max linear speed.
    pub fn new(robot: Robot, params: &Params) -> Result<Self, PidError> {
        let top_speed_fps = robot.max_linear_speed_fps();

        let drive_pid = PidController::new(
            params.drive_k_p,
            params.drive_k_i,
            params.drive_k_d,
            top_speed_fps,
        )?;
        let turn_pid = PidController::new(
            params.turn_k_p,
            params.turn_k_i,
            params.turn_k_d,
            top_speed_fps,
        )?;

        let k_v = params
            .k_v
            .unwrap_or(crate::physics::NOMINAL_VOLTAGE_V / top_speed_fps);

        Ok(Self {
            robot,
            drive_pid,
            turn_pid,
            state: DriveLoopState::Waiting,
            k_v,
            k_a: params.k_a,
            left_setpoint: TrajPoint::default(),
            right_setpoint: TrajPoint::default(),
            heading_setpoint_deg: 0.0,
            curve_setpoint: (0.0, 0.0),
        })
    }

    // ---- STATE SELECTION ----

    pub fn set_waiting_state(&mut self) {
        self.enter(DriveLoopState::Waiting);
    }

    /// Drive to the given point, forwards or backwards.
    pub fn set_drive_to_goal_state(
        &mut self,
        goal_in: Point2<f64>,
        tolerance_in: f64,
        top_speed_fps: f64,
        min_speed_fps: f64,
        reverse: bool,
    ) {
        self.enter(DriveLoopState::DriveToGoal {
            goal_in,
            tolerance_in,
            top_speed_fps,
            min_speed_fps,
            reverse,
        });
    }

    /// Drive `distance_in` from the current position, negative distances drive backwards.
    pub fn set_drive_distance_state(
        &mut self,
        distance_in: f64,
        tolerance_in: f64,
        top_speed_fps: f64,
        min_speed_fps: f64,
    ) {
        self.enter(DriveLoopState::DriveDistance {
            goal_pos_in: self.robot.average_pos_in() + distance_in,
            goal_angle_deg: self.robot.heading_deg(),
            tolerance_in,
            top_speed_fps,
            min_speed_fps,
        });
    }

    /// Turn by `angle_deg` relative to the current heading, positive is anticlockwise.
    pub fn set_turn_angle_state(
        &mut self,
        angle_deg: f64,
        tolerance_deg: f64,
        top_speed_fps: f64,
        min_speed_fps: f64,
    ) {
        self.enter(DriveLoopState::TurnAngle {
            goal_angle_deg: self.robot.heading_deg() + angle_deg,
            tolerance_deg,
            top_speed_fps,
            min_speed_fps,
        });
    }

    pub fn set_open_loop_profile_state(&mut self) {
        self.left_setpoint = TrajPoint::default();
        self.right_setpoint = TrajPoint::default();
        self.enter(DriveLoopState::OpenLoopProfile);
    }

    pub fn set_closed_loop_profile_state(&mut self, tolerance_in: f64, tolerance_deg: f64) {
        self.left_setpoint = TrajPoint::default();
        self.right_setpoint = TrajPoint::default();
        self.heading_setpoint_deg = self.robot.heading_deg();
        self.enter(DriveLoopState::ClosedLoopProfile {
            start_pos_in: self.robot.average_pos_in(),
            tolerance_in,
            tolerance_deg,
        });
    }

    pub fn set_curve_following_state(&mut self) {
        self.curve_setpoint = (0.0, 0.0);
        self.enter(DriveLoopState::CurveFollowing);
    }

    // ---- SETPOINTS ----

    /// Set the profile setpoints for the next cycle.
    ///
    /// Wheel positions are relative to the start of the profile, the heading is absolute.
    pub fn set_profile_setpoint(&mut self, left: TrajPoint, right: TrajPoint, heading_deg: f64) {
        self.left_setpoint = left;
        self.right_setpoint = right;
        self.heading_setpoint_deg = heading_deg;
    }

    /// Set the body velocities to follow for the next cycle.
    pub fn set_curve_setpoint(&mut self, linear_fps: f64, angular_rads: f64) {
        self.curve_setpoint = (linear_fps, angular_rads);
    }

    // ---- LOOP ----

    /// Run one cycle of the active state and step the robot.
    pub fn on_loop(&mut self) {
        let state = self.state;
        let (left_v, right_v) = match state {
            DriveLoopState::Waiting => {
                self.robot.set_color(IndicatorColor::IDLE);
                return;
            }
            DriveLoopState::DriveToGoal {
                goal_in,
                tolerance_in,
                top_speed_fps,
                min_speed_fps,
                reverse,
            } => self.drive_to_goal(goal_in, tolerance_in, top_speed_fps, min_speed_fps, reverse),
            DriveLoopState::DriveDistance {
                goal_pos_in,
                goal_angle_deg,
                tolerance_in,
                top_speed_fps,
                min_speed_fps,
            } => {
                let drive = self.drive_pid.calc_regulated_pid(
                    goal_pos_in,
                    self.robot.average_pos_in(),
                    tolerance_in,
                    top_speed_fps,
                    min_speed_fps,
                );
                let turn = self.turn_pid.calc_pid(
                    goal_angle_deg,
                    self.robot.heading_deg(),
                    HEADING_HOLD_DEADBAND_DEG,
                );
                (drive - turn, drive + turn)
            }
            DriveLoopState::TurnAngle {
                goal_angle_deg,
                tolerance_deg,
                top_speed_fps,
                min_speed_fps,
            } => {
                let turn = self.turn_pid.calc_regulated_pid(
                    goal_angle_deg,
                    self.robot.heading_deg(),
                    tolerance_deg,
                    top_speed_fps,
                    min_speed_fps,
                );
                (-turn, turn)
            }
            DriveLoopState::OpenLoopProfile => (
                self.feedforward(&self.left_setpoint),
                self.feedforward(&self.right_setpoint),
            ),
            DriveLoopState::ClosedLoopProfile {
                start_pos_in,
                tolerance_in,
                tolerance_deg,
            } => {
                let target_pos_in = start_pos_in
                    + (self.left_setpoint.position_in + self.right_setpoint.position_in) / 2.0;

                let drive = self.drive_pid.calc_pid(
                    target_pos_in,
                    self.robot.average_pos_in(),
                    tolerance_in,
                );
                let turn = self.turn_pid.calc_pid(
                    self.heading_setpoint_deg,
                    self.robot.heading_deg(),
                    tolerance_deg,
                );

                (
                    self.feedforward(&self.left_setpoint) + drive - turn,
                    self.feedforward(&self.right_setpoint) + drive + turn,
                )
            }
            DriveLoopState::CurveFollowing => {
                let (linear_fps, angular_rads) = self.curve_setpoint;
                let (left_fps, right_fps) = wheel_speeds(
                    linear_fps,
                    angular_rads,
                    self.robot.track_width_in() / IN_PER_FT,
                );

                (self.k_v * left_fps, self.k_v * right_fps)
            }
        };

        self.robot.update(left_v, right_v);
    }

    /// Command zero volts and let the robot coast for one cycle.
    pub fn coast(&mut self) {
        self.robot.update(0.0, 0.0);
    }

    /// Whether the robot is inside the square tolerance box around `goal_in`.
    ///
    /// Both axes are checked independently, the box is not a circle.
    pub fn in_goal_box(&self, goal_in: Point2<f64>, tolerance_in: f64) -> bool {
        let pos = self.robot.position_in();

        (pos.x - goal_in.x).abs() <= tolerance_in && (pos.y - goal_in.y).abs() <= tolerance_in
    }

    // ---- ACCESSORS ----

    pub fn robot(&self) -> &Robot {
        &self.robot
    }

    pub fn robot_mut(&mut self) -> &mut Robot {
        &mut self.robot
    }

    pub fn state(&self) -> &DriveLoopState {
        &self.state
    }

    pub fn drive_pid(&self) -> &PidController {
        &self.drive_pid
    }

    pub fn turn_pid(&self) -> &PidController {
        &self.turn_pid
    }

    pub fn k_v(&self) -> f64 {
        self.k_v
    }

    pub fn k_a(&self) -> f64 {
        self.k_a
    }

    pub fn set_feedforward(&mut self, k_v: f64, k_a: f64) {
        self.k_v = k_v;
        self.k_a = k_a;
    }

    // ---- PRIVATE ----

    fn enter(&mut self, state: DriveLoopState) {
        self.drive_pid.reset();
        self.turn_pid.reset();

        info!("DriveLoop entering {:?}", state);

        self.state = state;
    }

    fn feedforward(&self, setpoint: &TrajPoint) -> f64 {
        self.k_v * setpoint.velocity_fps + self.k_a * setpoint.acceleration_fps2
    }

    fn drive_to_goal(
        &mut self,
        goal_in: Point2<f64>,
        tolerance_in: f64,
        top_speed_fps: f64,
        min_speed_fps: f64,
        reverse: bool,
    ) -> (f64, f64) {
        let delta = goal_in - self.robot.position_in();
        let distance_in = delta.norm();

        let mut bearing_rad = delta.y.atan2(delta.x);
        if reverse {
            bearing_rad += std::f64::consts::PI;
        }

        let heading_error_deg =
            get_ang_dist_2pi(self.robot.heading_rad(), bearing_rad).to_degrees();

        // Derate the speed while pointing away from the goal
        let scale = if heading_error_deg.abs() > MAX_TRANSLATING_HEADING_ERROR_DEG {
            0.0
        } else {
            (1.0 - heading_error_deg.abs() / MAX_TRANSLATING_HEADING_ERROR_DEG).powi(2)
        };

        let current_pos_in = self.robot.average_pos_in();
        let goal_pos_in = if reverse {
            current_pos_in - distance_in
        } else {
            current_pos_in + distance_in
        };

        let drive = self.drive_pid.calc_regulated_pid(
            goal_pos_in,
            current_pos_in,
            tolerance_in,
            top_speed_fps * scale,
            min_speed_fps * scale,
        );

        // The bearing is meaningless once on top of the goal
        let turn = if self.in_goal_box(goal_in, tolerance_in) {
            0.0
        } else {
            let heading_deg = self.robot.heading_deg();
            self.turn_pid.calc_regulated_pid(
                heading_deg + heading_error_deg,
                heading_deg,
                HEADING_HOLD_DEADBAND_DEG,
                top_speed_fps,
                0.0,
            )
        };

        debug!(
            "DriveToGoal: dist {:.2} in, heading error {:.2} deg, scale {:.3}",
            distance_in, heading_error_deg, scale
        );

        (drive - turn, drive + turn)
    }
}
