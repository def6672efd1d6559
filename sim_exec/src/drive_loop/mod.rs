//! # Drive loop module
//!
//! The drive loop is the drivetrain's control state machine. It owns the [`Robot`] and two
//! [`PidController`]s, one regulating the average wheel position (inches) and one regulating the
//! heading (degrees).
//!
//! Each state produces a left and right voltage per cycle:
//!
//! - `DriveDistance` regulates position with a heading hold,
//! - `TurnAngle` regulates heading alone,
//! - `DriveToGoal` steers towards a point, recomputing both setpoints every cycle and derating the
//!   speed as the heading error grows,
//! - the profile states follow externally supplied wheel setpoints, with or without feedback,
//! - `CurveFollowing` converts a linear and angular velocity into wheel voltages.
//!
//! The outputs are mixed differentially, `left = drive - turn` and `right = drive + turn`.
//!
//! [`Robot`]: crate::physics::Robot

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod params;
pub mod pid;
pub mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use params::*;
pub use pid::*;
pub use state::*;
