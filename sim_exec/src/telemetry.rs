//! # Telemetry
//!
//! Snapshots of the robot's state for consumption outside the simulation: the per-tick [`Pose`]
//! and the extended [`RobotData`] record. Both are plain owned values, so a snapshot taken on one
//! tick is never changed by later ticks.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Point2;
use serde::Serialize;
use util::archive::{ArchiveError, Archived, Archiver};
use util::maths::lin_map;
use util::session::Session;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Indicator colour attached to a pose, used only for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndicatorColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Placement of the robot at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Pose {
    /// Units: inches
    pub position_in: Point2<f64>,

    /// Heading, counter clockwise from the field's +x axis.
    ///
    /// Units: radians
    pub heading_rad: f64,

    pub color: IndicatorColor,
}

/// Flat pose record for the CSV archive.
#[derive(Debug, Clone, Copy, Serialize)]
struct PoseRecord {
    time_s: f64,
    x_in: f64,
    y_in: f64,
    heading_rad: f64,
    r: u8,
    g: u8,
    b: u8,
}

/// The extended telemetry record produced by [`crate::physics::Robot::get_data`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RobotData {
    pub time_s: f64,

    pub x_in: f64,
    pub y_in: f64,
    pub heading_rad: f64,
    pub heading_deg: f64,

    pub average_pos_in: f64,
    pub linear_vel_fps: f64,
    pub angular_vel_rads: f64,
    pub linear_acc_fps2: f64,
    pub angular_acc_rads2: f64,

    pub left_pos_in: f64,
    pub right_pos_in: f64,
    pub left_vel_fps: f64,
    pub right_vel_fps: f64,
    pub left_acc_fps2: f64,
    pub right_acc_fps2: f64,

    pub left_voltage_v: f64,
    pub right_voltage_v: f64,
    pub left_torque_nm: f64,
    pub right_torque_nm: f64,

    /// Indicator colour as a `#rrggbb` string
    pub color: String,

    /// Name of the manoeuvre currently driving the robot
    pub command: String,

    pub goal_x_in: Option<f64>,
    pub goal_y_in: Option<f64>,
}

/// Archives the robot's telemetry every tick.
#[derive(Default)]
pub struct TelemetryLog {
    poses: Vec<(f64, Pose)>,
    arch_poses: Archiver,

    latest: Option<RobotData>,
    arch_robot_data: Archiver,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl IndicatorColor {
    pub const IDLE: Self = Self::rgb(255, 255, 255);
    pub const STOPPED: Self = Self::rgb(128, 128, 128);
    pub const TURNING: Self = Self::rgb(0, 96, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Colour for a given motion. Forward travel is green and reverse travel red, brighter the
    /// closer the speed is to `max_speed`. Turning in place is blue.
    pub fn from_motion(linear_vel: f64, max_speed: f64, angular_vel: f64, max_angular: f64) -> Self {
        let lin_frac = (linear_vel.abs() / max_speed).min(1.0);
        let ang_frac = (angular_vel.abs() / max_angular).min(1.0);

        if lin_frac < 0.01 {
            return if ang_frac < 0.01 {
                Self::STOPPED
            } else {
                Self::TURNING
            };
        }

        let level = lin_map((0.0, 1.0), (64.0, 255.0), lin_frac).round() as u8;
        if linear_vel > 0.0 {
            Self::rgb(0, level, 0)
        } else {
            Self::rgb(level, 0, 0)
        }
    }

    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl TelemetryLog {
    /// Create a log which keeps the pose history in memory only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a log which also archives into the session's `arch` directory.
    pub fn with_session(session: &Session) -> Result<Self, ArchiveError> {
        Ok(Self {
            arch_poses: Archiver::from_path(session, "poses.csv")?,
            arch_robot_data: Archiver::from_path(session, "robot_data.csv")?,
            ..Self::default()
        })
    }

    /// Record the telemetry of one tick.
    pub fn record(&mut self, pose: Pose, data: RobotData) {
        self.poses.push((data.time_s, pose));
        self.latest = Some(data);
    }

    /// The pose history, oldest first, paired with the simulation time.
    pub fn poses(&self) -> &[(f64, Pose)] {
        &self.poses
    }

    pub fn latest(&self) -> Option<&RobotData> {
        self.latest.as_ref()
    }
}

impl Archived for TelemetryLog {
    fn write(&mut self) -> Result<(), ArchiveError> {
        if let Some((time_s, pose)) = self.poses.last() {
            self.arch_poses.serialise(PoseRecord {
                time_s: *time_s,
                x_in: pose.position_in.x,
                y_in: pose.position_in.y,
                heading_rad: pose.heading_rad,
                r: pose.color.r,
                g: pose.color.g,
                b: pose.color.b,
            })?;
        }

        if let Some(ref data) = self.latest {
            self.arch_robot_data.serialise(data)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_color_from_motion() {
        assert_eq!(IndicatorColor::from_motion(0.0, 4.0, 0.0, 3.0), IndicatorColor::STOPPED);
        assert_eq!(IndicatorColor::from_motion(0.0, 4.0, 1.0, 3.0), IndicatorColor::TURNING);
        assert_eq!(IndicatorColor::from_motion(4.0, 4.0, 0.0, 3.0), IndicatorColor::rgb(0, 255, 0));
        assert_eq!(IndicatorColor::from_motion(-8.0, 4.0, 0.0, 3.0), IndicatorColor::rgb(255, 0, 0));
        assert_eq!(IndicatorColor::rgb(255, 0, 16).hex(), "#ff0010");
    }

    #[test]
    fn test_pose_history_is_independent() {
        let mut log = TelemetryLog::new();
        let mut pose = Pose {
            position_in: Point2::new(1.0, 2.0),
            heading_rad: 0.5,
            color: IndicatorColor::IDLE,
        };

        let data = RobotData {
            time_s: 0.01,
            x_in: 1.0,
            y_in: 2.0,
            heading_rad: 0.5,
            heading_deg: 0.5f64.to_degrees(),
            average_pos_in: 0.0,
            linear_vel_fps: 0.0,
            angular_vel_rads: 0.0,
            linear_acc_fps2: 0.0,
            angular_acc_rads2: 0.0,
            left_pos_in: 0.0,
            right_pos_in: 0.0,
            left_vel_fps: 0.0,
            right_vel_fps: 0.0,
            left_acc_fps2: 0.0,
            right_acc_fps2: 0.0,
            left_voltage_v: 0.0,
            right_voltage_v: 0.0,
            left_torque_nm: 0.0,
            right_torque_nm: 0.0,
            color: IndicatorColor::IDLE.hex(),
            command: String::from("wait"),
            goal_x_in: None,
            goal_y_in: None,
        };

        log.record(pose, data);

        // Mutating the source after capture must not alter the recorded pose
        pose.position_in.x = 100.0;
        assert_eq!(log.poses()[0].1.position_in.x, 1.0);

        // Writing without a session is a no-op
        assert!(log.write().is_ok());
    }
}
