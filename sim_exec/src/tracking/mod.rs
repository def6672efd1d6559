//! # Path tracking module
//!
//! Geometric and nonlinear path tracking controllers. Both controllers output a body linear
//! velocity (feet/second) and angular velocity (radians/second), which the drive loop follows in
//! its `CurveFollowing` state.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod pure_pursuit;
pub mod ramsete;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use pure_pursuit::*;
pub use ramsete::*;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Left and right wheel speeds of a differential drive for the given body velocities.
///
/// `linear` and the returned speeds share units, `track_width` must be in the length unit of
/// `linear`.
pub fn wheel_speeds(linear: f64, angular_rads: f64, track_width: f64) -> (f64, f64) {
    (
        (2.0 * linear - angular_rads * track_width) / 2.0,
        (2.0 * linear + angular_rads * track_width) / 2.0,
    )
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_wheel_speeds() {
        assert_eq!(wheel_speeds(2.0, 0.0, 2.5), (2.0, 2.0));
        assert_eq!(wheel_speeds(0.0, 1.0, 2.0), (-1.0, 1.0));
        assert_eq!(wheel_speeds(1.0, -1.0, 1.0), (1.5, 0.5));
    }
}
