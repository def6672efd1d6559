//! # Physics module
//!
//! The physics module models the robot's drivetrain from the motors up. Each side of the robot is
//! a [`Gearbox`] of identical [`Motor`]s driving a wheel, and the [`Robot`] couples the two sides
//! through the chassis' mass and moment of inertia.
//!
//! Integration happens in SI units internally. Everything crossing the module boundary is in
//! inches, feet/second, pounds and radians.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod gearbox;
pub mod motor;
pub mod params;
pub mod robot;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use gearbox::*;
pub use motor::*;
pub use params::*;
pub use robot::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Nominal battery voltage, all commands saturate at plus or minus this value.
///
/// Units: volts
pub const NOMINAL_VOLTAGE_V: f64 = 12.0;

/// Meters in one inch
pub const M_PER_IN: f64 = 0.0254;

/// Inches in one foot
pub const IN_PER_FT: f64 = 12.0;

/// Kilograms in one pound
pub const KG_PER_LB: f64 = 0.453_592_37;

/// Radians per second in one revolution per minute
pub const RADS_PER_RPM: f64 = std::f64::consts::TAU / 60.0;
