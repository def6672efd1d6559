//! Robot parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::MotorKind;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters describing the simulated robot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobotParams {
    // ---- CHASSIS ----

    /// Units: pounds
    pub mass_lb: f64,

    /// Length of the chassis along the direction of travel.
    ///
    /// Units: inches
    pub length_in: f64,

    /// Width of the chassis, the wheels sit on its sides.
    ///
    /// Units: inches
    pub width_in: f64,

    /// Units: inches
    pub wheel_diameter_in: f64,

    // ---- DRIVE ----

    /// The motor fitted to both gearboxes
    pub motor: MotorKind,

    /// Number of motors in each gearbox
    pub motors_per_side: u32,

    /// Explicit gearbox reduction. Takes priority over `top_speed_fps`.
    #[serde(default)]
    pub gear_ratio: Option<f64>,

    /// Free speed of the robot, used to derive the gearbox reduction when `gear_ratio` isn't
    /// given.
    ///
    /// Units: feet/second
    #[serde(default)]
    pub top_speed_fps: Option<f64>,

    // ---- INTEGRATION ----

    /// Fixed integration timestep, also the period of the control loop.
    ///
    /// Units: seconds
    pub timestep_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for RobotParams {
    /// A 153 lb, 30" square robot on 4" wheels with two NEOs a side geared for 4 ft/s.
    fn default() -> Self {
        Self {
            mass_lb: 153.0,
            length_in: 30.0,
            width_in: 30.0,
            wheel_diameter_in: 4.0,
            motor: MotorKind::Neo,
            motors_per_side: 2,
            gear_ratio: None,
            top_speed_fps: Some(4.0),
            timestep_s: 0.01,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_shipped_params() {
        let params: RobotParams =
            util::params::from_str(include_str!("../../../params/robot.toml")).unwrap();

        assert_eq!(params.motor, MotorKind::Neo);
        assert_eq!(params.motors_per_side, 2);
        assert_eq!(params.gear_ratio, None);
        assert_eq!(params.top_speed_fps, RobotParams::default().top_speed_fps);
    }
}
