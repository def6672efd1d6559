//! # Feedforward characterisation
//!
//! Drives a fresh robot open loop at a sweep of voltages and fits the feedforward model
//! `voltage = k_v * velocity + k_a * acceleration + k_s`.
//!
//! `k_v` and `k_s` come from the steady state velocity reached at each voltage. `k_a` comes from
//! the acceleration seen in the first cycle, when the robot is still at rest and the velocity term
//! is zero.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info};
use serde::Serialize;

// Internal
use crate::physics::{Robot, RobotError, RobotParams};
use util::maths::{linear_regression, MathsError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Measurements from a single voltage step.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CharSample {
    pub voltage_v: f64,

    /// Acceleration in the first cycle from rest
    ///
    /// Units: feet/second^2
    pub initial_acc_fps2: f64,

    /// Velocity at the end of the run
    ///
    /// Units: feet/second
    pub steady_vel_fps: f64,
}

/// Fitted feedforward constants.
#[derive(Debug, Clone, Serialize)]
pub struct Characterisation {
    /// Units: volts/(feet/second)
    pub k_v: f64,

    /// Units: volts/(feet/second^2)
    pub k_a: f64,

    /// Units: volts
    pub k_s: f64,

    /// Coefficient of determination of the velocity fit
    pub r_squared: f64,

    pub samples: Vec<CharSample>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CharacteriseError {
    #[error("Could not build the robot: {0}")]
    RobotError(#[from] RobotError),

    #[error("Could not fit the feedforward model: {0}")]
    FitError(#[from] MathsError),
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Run one open loop step per voltage, each lasting `duration_s`, and fit the feedforward
/// constants.
pub fn characterise(
    params: &RobotParams,
    voltages: &[f64],
    duration_s: f64,
) -> Result<Characterisation, CharacteriseError> {
    let mut samples = Vec::with_capacity(voltages.len());

    for &voltage_v in voltages {
        let mut robot = Robot::new(params.clone())?;

        robot.update(voltage_v, voltage_v);
        let initial_acc_fps2 = robot.get_data().linear_acc_fps2;

        while robot.time_s() < duration_s {
            robot.update(voltage_v, voltage_v);
        }

        let sample = CharSample {
            voltage_v,
            initial_acc_fps2,
            steady_vel_fps: robot.linear_vel_fps(),
        };
        debug!("Characterisation step: {:?}", sample);
        samples.push(sample);
    }

    let voltages: Vec<f64> = samples.iter().map(|s| s.voltage_v).collect();
    let vels: Vec<f64> = samples.iter().map(|s| s.steady_vel_fps).collect();
    let accs: Vec<f64> = samples.iter().map(|s| s.initial_acc_fps2).collect();

    let vel_fit = linear_regression(&vels, &voltages)?;
    let acc_fit = linear_regression(&accs, &voltages)?;

    info!(
        "Characterised feedforward: k_v = {:.4} V/(ft/s), k_a = {:.4} V/(ft/s^2), k_s = {:.4} V (r^2 = {:.5})",
        vel_fit.slope, acc_fit.slope, vel_fit.intercept, vel_fit.r_squared
    );

    Ok(Characterisation {
        k_v: vel_fit.slope,
        k_a: acc_fit.slope,
        k_s: vel_fit.intercept,
        r_squared: vel_fit.r_squared,
        samples,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_characterise() {
        let params = RobotParams::default();
        let voltages = [2.0, 4.0, 6.0, 8.0, 10.0, 12.0];

        let chr = characterise(&params, &voltages, 2.0).unwrap();
        let max_speed = Robot::new(params).unwrap().max_linear_speed_fps();

        // The model has no friction so the fit is exact
        assert!((chr.k_v - 12.0 / max_speed).abs() < 1e-3);
        assert!(chr.k_s.abs() < 1e-3);
        assert!(chr.r_squared > 0.9999);
        assert!(chr.k_a > 0.0);
        assert_eq!(chr.samples.len(), voltages.len());
    }

    #[test]
    fn test_not_enough_voltages() {
        assert!(matches!(
            characterise(&RobotParams::default(), &[12.0], 1.0),
            Err(CharacteriseError::FitError(_))
        ));
    }
}
