//! # Manoeuvre execution

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info};
use nalgebra::Point2;

// Internal
use super::{path_from_coords, MnvrCmd, MnvrError};
use crate::{
    drive_loop::{DriveLoop, Params},
    traj::{BezierProfile, PursuitPath, QuinticBezierPath},
    tracking::{PurePursuit, Ramsete},
};
use util::time::seconds_to_cycles;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Speed below which the robot is considered settled on its goal.
///
/// Units: feet/second
const SETTLED_SPEED_FPS: f64 = 0.05;

/// Angular speed below which the robot is considered settled on its goal.
///
/// Units: radians/second
const SETTLED_RATE_RADS: f64 = 0.05;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A manoeuvre in progress.
#[derive(Debug)]
pub struct Mnvr {
    name: &'static str,

    kind: MnvrKind,

    /// Number of cycles run so far
    cycle: u64,

    /// Number of cycles after which the manoeuvre times out
    max_cycles: u64,

    period_s: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Per kind state of a manoeuvre.
#[derive(Debug)]
enum MnvrKind {
    DriveDistance,

    TurnAngle,

    DriveToGoal {
        goal_in: Point2<f64>,
        tolerance_in: f64,
    },

    Profile {
        profile: BezierProfile,

        /// Robot heading minus profile heading at the start
        heading_offset_rad: f64,
    },

    Pursuit {
        pursuit: PurePursuit,
    },

    Ramsete {
        profile: BezierProfile,
        ramsete: Ramsete,
    },

    Wait,
}

/// Outcome of a single manoeuvre step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MnvrStatus {
    Running,
    Complete,
    TimedOut,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Mnvr {
    /// Start the manoeuvre, putting the drive loop into the matching state.
    pub fn init(cmd: &MnvrCmd, drive_loop: &mut DriveLoop, params: &Params) -> Result<Self, MnvrError> {
        let period_s = drive_loop.robot().timestep_s();
        let start_pos = drive_loop.robot().position_in();
        let start_heading = drive_loop.robot().heading_rad();
        let track_width_in = drive_loop.robot().track_width_in();

        let mut goal = None;

        let kind = match cmd {
            MnvrCmd::DriveDistance {
                distance_in,
                tolerance_in,
                top_speed_fps,
                min_speed_fps,
                ..
            } => {
                drive_loop.set_drive_distance_state(
                    *distance_in,
                    *tolerance_in,
                    *top_speed_fps,
                    *min_speed_fps,
                );
                MnvrKind::DriveDistance
            }
            MnvrCmd::TurnAngle {
                angle_deg,
                tolerance_deg,
                top_speed_fps,
                min_speed_fps,
                ..
            } => {
                drive_loop.set_turn_angle_state(
                    *angle_deg,
                    *tolerance_deg,
                    *top_speed_fps,
                    *min_speed_fps,
                );
                MnvrKind::TurnAngle
            }
            MnvrCmd::DriveToGoal {
                x_in,
                y_in,
                reverse,
                tolerance_in,
                top_speed_fps,
                min_speed_fps,
                ..
            } => {
                let goal_in = Point2::new(*x_in, *y_in);
                let tolerance_in = tolerance_in.unwrap_or(params.waypoint_tolerance_in);

                drive_loop.set_drive_to_goal_state(
                    goal_in,
                    tolerance_in,
                    *top_speed_fps,
                    *min_speed_fps,
                    *reverse,
                );
                goal = Some(goal_in);
                MnvrKind::DriveToGoal {
                    goal_in,
                    tolerance_in,
                }
            }
            MnvrCmd::Profile {
                closed_loop,
                control_points,
                ..
            } => {
                let path = field_path(control_points, start_pos, start_heading)?;
                let profile = BezierProfile::new(&path, track_width_in, &params.profile)?;

                if *closed_loop {
                    drive_loop.set_closed_loop_profile_state(
                        params.waypoint_tolerance_in,
                        params.turn_tolerance_deg,
                    );
                } else {
                    drive_loop.set_open_loop_profile_state();
                }

                goal = profile.points().last().copied();
                MnvrKind::Profile {
                    heading_offset_rad: start_heading - profile.heading_at(0.0),
                    profile,
                }
            }
            MnvrCmd::Pursuit {
                reverse,
                control_points,
                ..
            } => {
                let path = field_path(control_points, start_pos, start_heading)?;
                let profile = BezierProfile::new(&path, track_width_in, &params.profile)?;
                let goals = PursuitPath::from_profile(&profile).goals();

                drive_loop.set_curve_following_state();

                goal = goals.last().copied();
                MnvrKind::Pursuit {
                    pursuit: PurePursuit::new(&params.pursuit, goals, *reverse, period_s),
                }
            }
            MnvrCmd::Ramsete { control_points, .. } => {
                let path = field_path(control_points, start_pos, start_heading)?;
                let profile = BezierProfile::new(&path, track_width_in, &params.profile)?;

                drive_loop.set_curve_following_state();

                goal = profile.points().last().copied();
                MnvrKind::Ramsete {
                    profile,
                    ramsete: Ramsete::new(&params.ramsete),
                }
            }
            MnvrCmd::Wait { .. } => {
                drive_loop.set_waiting_state();
                MnvrKind::Wait
            }
        };

        drive_loop.robot_mut().set_telemetry_tag(cmd.name(), goal);

        let max_cycles = seconds_to_cycles(cmd.timeout_s(), period_s);

        info!(
            "Starting {} manoeuvre, timeout after {} cycles",
            cmd.name(),
            max_cycles
        );

        Ok(Self {
            name: cmd.name(),
            kind,
            cycle: 0,
            max_cycles,
            period_s,
        })
    }

    /// Run one cycle of the manoeuvre.
    pub fn step(&mut self, drive_loop: &mut DriveLoop) -> MnvrStatus {
        // Time into the manoeuvre at the start of this cycle
        let time_s = self.cycle as f64 * self.period_s;

        match &mut self.kind {
            MnvrKind::Profile {
                profile,
                heading_offset_rad,
            } => {
                let heading_deg = (profile.heading_at(time_s) + *heading_offset_rad).to_degrees();
                drive_loop.set_profile_setpoint(
                    profile.get_left_traj_point(time_s),
                    profile.get_right_traj_point(time_s),
                    heading_deg,
                );
                drive_loop.on_loop();
            }
            MnvrKind::Pursuit { pursuit } => {
                let robot = drive_loop.robot();
                let (v, w) = pursuit.update(robot.position_in(), robot.heading_rad());
                drive_loop.set_curve_setpoint(v, w);
                drive_loop.on_loop();
            }
            MnvrKind::Ramsete { profile, ramsete } => {
                let robot = drive_loop.robot();
                let (v, w) = ramsete.calculate(
                    robot.position_in(),
                    robot.heading_rad(),
                    &profile.state_at(time_s),
                );
                drive_loop.set_curve_setpoint(v, w);
                drive_loop.on_loop();
            }
            MnvrKind::Wait => drive_loop.coast(),
            _ => drive_loop.on_loop(),
        }

        self.cycle += 1;

        if self.is_complete(drive_loop) {
            debug!("{} manoeuvre complete after {} cycles", self.name, self.cycle);
            MnvrStatus::Complete
        } else if self.cycle >= self.max_cycles {
            MnvrStatus::TimedOut
        } else {
            MnvrStatus::Running
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn max_cycles(&self) -> u64 {
        self.max_cycles
    }

    fn is_complete(&self, drive_loop: &DriveLoop) -> bool {
        let robot = drive_loop.robot();
        let elapsed_s = self.cycle as f64 * self.period_s;

        match &self.kind {
            MnvrKind::DriveDistance => {
                drive_loop.drive_pid().at_target()
                    && robot.linear_vel_fps().abs() < SETTLED_SPEED_FPS
            }
            MnvrKind::TurnAngle => {
                drive_loop.turn_pid().at_target()
                    && robot.angular_vel_rads().abs() < SETTLED_RATE_RADS
            }
            MnvrKind::DriveToGoal {
                goal_in,
                tolerance_in,
            } => drive_loop.in_goal_box(*goal_in, *tolerance_in),
            MnvrKind::Profile { profile, .. } | MnvrKind::Ramsete { profile, .. } => {
                elapsed_s > profile.total_time_s()
            }
            MnvrKind::Pursuit { pursuit } => pursuit.arrived(),
            MnvrKind::Wait => self.cycle >= self.max_cycles,
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Build the path from robot relative control points and move it into the field frame.
fn field_path(
    coords: &[f64],
    origin_in: Point2<f64>,
    heading_rad: f64,
) -> Result<QuinticBezierPath, MnvrError> {
    Ok(path_from_coords(coords)?.transformed(origin_in, heading_rad))
}
