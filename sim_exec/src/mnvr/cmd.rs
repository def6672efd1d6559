//! # Manoeuvre commands
//!
//! Commands are parsed from the words of a script line, for example
//!
//! ```text
//! dist 48 --top 3;
//! turn -90;
//! goto 60 24 --reverse --timeout-s 8;
//! profile --closed-loop 0 0 30 0 50 0 70 30 80 40 100 40;
//! wait 0.5;
//! ```
//!
//! Control points are given as 6 `x y` pairs in inches relative to the robot's pose when the
//! manoeuvre starts, with +x forwards and +y to the left.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use structopt::{clap::AppSettings, StructOpt};

// Internal
use super::MnvrError;
use crate::traj::QuinticBezierPath;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A manoeuvre the robot can perform.
#[derive(Debug, Clone, Serialize, Deserialize, StructOpt)]
#[structopt(name = "mnvr", global_settings = &[AppSettings::AllowNegativeNumbers])]
pub enum MnvrCmd {
    /// Drive straight for a distance, holding the current heading.
    #[structopt(name = "dist")]
    DriveDistance {
        /// Distance to drive in inches, negative distances drive backwards.
        distance_in: f64,

        /// Position tolerance in inches.
        #[structopt(long = "tol", default_value = "1")]
        tolerance_in: f64,

        /// Top speed in feet/second.
        #[structopt(long = "top", default_value = "4")]
        top_speed_fps: f64,

        /// Minimum speed in feet/second, applied while outside the tolerance.
        #[structopt(long = "min", default_value = "0")]
        min_speed_fps: f64,

        /// Time after which the manoeuvre is abandoned.
        #[structopt(long, default_value = "15")]
        timeout_s: f64,
    },

    /// Turn in place by an angle relative to the current heading.
    #[structopt(name = "turn")]
    TurnAngle {
        /// Angle to turn in degrees, positive is anticlockwise.
        angle_deg: f64,

        /// Heading tolerance in degrees.
        #[structopt(long = "tol", default_value = "1")]
        tolerance_deg: f64,

        /// Top speed of the wheels in feet/second.
        #[structopt(long = "top", default_value = "4")]
        top_speed_fps: f64,

        /// Minimum speed of the wheels in feet/second.
        #[structopt(long = "min", default_value = "0")]
        min_speed_fps: f64,

        #[structopt(long, default_value = "15")]
        timeout_s: f64,
    },

    /// Drive to a point in the field frame.
    #[structopt(name = "goto")]
    DriveToGoal {
        /// Goal x coordinate in inches.
        x_in: f64,

        /// Goal y coordinate in inches.
        y_in: f64,

        /// Drive backwards to the goal.
        #[structopt(long)]
        reverse: bool,

        /// Size of the goal box in inches, measured on each axis.
        #[structopt(long = "tol")]
        tolerance_in: Option<f64>,

        #[structopt(long = "top", default_value = "4")]
        top_speed_fps: f64,

        #[structopt(long = "min", default_value = "0")]
        min_speed_fps: f64,

        #[structopt(long, default_value = "15")]
        timeout_s: f64,
    },

    /// Follow a trajectory profile along a Bezier path.
    #[structopt(name = "profile")]
    Profile {
        /// Add position and heading feedback to the feedforward.
        #[structopt(long)]
        closed_loop: bool,

        #[structopt(long, default_value = "15")]
        timeout_s: f64,

        /// The 12 control point coordinates, x0 y0 x1 y1 ... x5 y5.
        #[structopt(required = true, allow_hyphen_values = true)]
        control_points: Vec<f64>,
    },

    /// Follow a Bezier path with pure pursuit.
    #[structopt(name = "pursuit")]
    Pursuit {
        /// Follow the path driving backwards.
        #[structopt(long)]
        reverse: bool,

        #[structopt(long, default_value = "15")]
        timeout_s: f64,

        /// The 12 control point coordinates, x0 y0 x1 y1 ... x5 y5.
        #[structopt(required = true, allow_hyphen_values = true)]
        control_points: Vec<f64>,
    },

    /// Track a trajectory profile along a Bezier path with RAMSETE.
    #[structopt(name = "ramsete")]
    Ramsete {
        #[structopt(long, default_value = "15")]
        timeout_s: f64,

        /// The 12 control point coordinates, x0 y0 x1 y1 ... x5 y5.
        #[structopt(required = true, allow_hyphen_values = true)]
        control_points: Vec<f64>,
    },

    /// Do nothing for a while, the robot coasts.
    #[structopt(name = "wait")]
    Wait {
        /// Time to wait in seconds.
        duration_s: f64,
    },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MnvrCmd {
    /// Parse a command from the words of a script line.
    pub fn from_words<S: AsRef<str>>(words: &[S]) -> Result<Self, MnvrError> {
        let args = std::iter::once("mnvr").chain(words.iter().map(|w| w.as_ref()));

        Self::from_iter_safe(args).map_err(|e| MnvrError::ParseError(e.message))
    }

    /// Short name used in logs and telemetry.
    pub fn name(&self) -> &'static str {
        match self {
            MnvrCmd::DriveDistance { .. } => "dist",
            MnvrCmd::TurnAngle { .. } => "turn",
            MnvrCmd::DriveToGoal { .. } => "goto",
            MnvrCmd::Profile { .. } => "profile",
            MnvrCmd::Pursuit { .. } => "pursuit",
            MnvrCmd::Ramsete { .. } => "ramsete",
            MnvrCmd::Wait { .. } => "wait",
        }
    }

    /// Time after which the manoeuvre is abandoned.
    pub fn timeout_s(&self) -> f64 {
        match self {
            MnvrCmd::DriveDistance { timeout_s, .. }
            | MnvrCmd::TurnAngle { timeout_s, .. }
            | MnvrCmd::DriveToGoal { timeout_s, .. }
            | MnvrCmd::Profile { timeout_s, .. }
            | MnvrCmd::Pursuit { timeout_s, .. }
            | MnvrCmd::Ramsete { timeout_s, .. } => *timeout_s,
            MnvrCmd::Wait { duration_s } => *duration_s,
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Build a path from 12 coordinates.
pub fn path_from_coords(coords: &[f64]) -> Result<QuinticBezierPath, MnvrError> {
    if coords.len() != 12 {
        return Err(MnvrError::WrongNumControlPoints(coords.len()));
    }

    let mut points = [Point2::origin(); 6];
    for (p, xy) in points.iter_mut().zip(coords.chunks(2)) {
        *p = Point2::new(xy[0], xy[1]);
    }

    Ok(QuinticBezierPath::new(points))
}

#[cfg(test)]
mod test {
    use super::*;

    fn words(line: &str) -> Vec<&str> {
        line.split_whitespace().collect()
    }

    #[test]
    fn test_parse_dist() {
        match MnvrCmd::from_words(&words("dist -24 --top 2")).unwrap() {
            MnvrCmd::DriveDistance {
                distance_in,
                tolerance_in,
                top_speed_fps,
                min_speed_fps,
                ..
            } => {
                assert_eq!(distance_in, -24.0);
                assert_eq!(tolerance_in, 1.0);
                assert_eq!(top_speed_fps, 2.0);
                assert_eq!(min_speed_fps, 0.0);
            }
            c => panic!("Wrong command {:?}", c),
        }
    }

    #[test]
    fn test_parse_goto() {
        let cmd = MnvrCmd::from_words(&words("goto 60 -12 --reverse --timeout-s 8")).unwrap();
        assert_eq!(cmd.name(), "goto");
        assert_eq!(cmd.timeout_s(), 8.0);

        match cmd {
            MnvrCmd::DriveToGoal {
                x_in,
                y_in,
                reverse,
                tolerance_in,
                ..
            } => {
                assert_eq!((x_in, y_in), (60.0, -12.0));
                assert!(reverse);
                assert_eq!(tolerance_in, None);
            }
            c => panic!("Wrong command {:?}", c),
        }
    }

    #[test]
    fn test_parse_profile() {
        let cmd = MnvrCmd::from_words(&words(
            "profile --closed-loop 0 0 20 0 40 -10 60 -20 80 -20 100 -20",
        ))
        .unwrap();

        match cmd {
            MnvrCmd::Profile {
                closed_loop,
                control_points,
                ..
            } => {
                assert!(closed_loop);
                let path = path_from_coords(&control_points).unwrap();
                assert_eq!(path.control_points()[2], Point2::new(40.0, -10.0));
            }
            c => panic!("Wrong command {:?}", c),
        }
    }

    #[test]
    fn test_parse_errors() {
        assert!(MnvrCmd::from_words(&words("fly 10")).is_err());
        assert!(MnvrCmd::from_words(&words("dist")).is_err());
        assert!(matches!(
            path_from_coords(&[0.0; 10]),
            Err(MnvrError::WrongNumControlPoints(10))
        ));
    }
}
