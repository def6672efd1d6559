//! # Manoeuvres module
//!
//! Manoeuvres are the commands a script is made of. Each one is parsed into a [`MnvrCmd`],
//! started as a [`Mnvr`] which puts the [`DriveLoop`] into the matching state, and then stepped
//! once per cycle until it completes or times out. The [`Sequencer`] runs a queue of them.
//!
//! Timeouts are counted in cycles of the robot's timestep.
//!
//! [`DriveLoop`]: crate::drive_loop::DriveLoop

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod cmd;
pub mod exec;
pub mod sequencer;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use cmd::*;
pub use exec::*;
pub use sequencer::*;

use crate::traj::ProfileError;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum MnvrError {
    #[error("Could not parse the manoeuvre: {0}")]
    ParseError(String),

    #[error("Expected 12 control point coordinates, got {0}")]
    WrongNumControlPoints(usize),

    #[error("Could not generate the manoeuvre's profile: {0}")]
    ProfileError(#[from] ProfileError),
}
