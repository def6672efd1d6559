//! # Trajectory module
//!
//! Paths are quintic Bezier curves described by six control points in the field frame (inches).
//! A [`BezierProfile`] samples a path evenly by distance and assigns a velocity to each sample,
//! limited by the path's curvature and the robot's acceleration and deceleration, which is then
//! integrated into per-wheel position, velocity and acceleration setpoints indexed by time.
//!
//! A [`PursuitPath`] is the reduced form of a profile used by pure pursuit, and can be saved to
//! and loaded from a simple text file.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod bezier;
pub mod profile;
pub mod pursuit_path;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

pub use bezier::*;
pub use profile::*;
pub use pursuit_path::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single wheel setpoint taken from a profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TrajPoint {
    /// Distance travelled by the wheel since the start of the profile
    ///
    /// Units: inches
    pub position_in: f64,

    /// Units: feet/second
    pub velocity_fps: f64,

    /// Units: feet/second^2
    pub acceleration_fps2: f64,
}
