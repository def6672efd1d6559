//! # PID controller
//!
//! A discrete PID controller evaluated once per control cycle. The controller doesn't know about
//! time, the gains are expressed per cycle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
use crate::physics::NOMINAL_VOLTAGE_V;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A PID controller
#[derive(Debug, Serialize, Clone)]
pub struct PidController {
    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Derivative gain
    k_d: f64,

    /// The speed that corresponds to the full nominal voltage. Used to convert the speed bands
    /// passed into `calc_regulated_pid` into voltage bands.
    ///
    /// Units: feet/second
    top_speed_fps: f64,

    /// Sum of all errors since the last reset. Not clamped.
    error_sum: f64,

    /// Error seen on the previous call
    last_error: f64,

    /// Whether the last error was within the tolerance
    at_target: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PidError {
    #[error("The controller's top speed must be positive and finite, found {0}")]
    InvalidTopSpeed(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {
    /// Create a new controller with the given gains.
    pub fn new(k_p: f64, k_i: f64, k_d: f64, top_speed_fps: f64) -> Result<Self, PidError> {
        if !(top_speed_fps > 0.0 && top_speed_fps.is_finite()) {
            return Err(PidError::InvalidTopSpeed(top_speed_fps));
        }

        Ok(Self {
            k_p,
            k_i,
            k_d,
            top_speed_fps,
            error_sum: 0.0,
            last_error: 0.0,
            at_target: false,
        })
    }

    /// Get the raw output of the controller.
    ///
    /// `at_target` is updated on every call, so callers must check it again after each
    /// evaluation.
    pub fn calc_pid(&mut self, setpoint: f64, current: f64, epsilon: f64) -> f64 {
        let error = setpoint - current;

        self.at_target = error.abs() <= epsilon;
        self.error_sum += error;

        let out = self.k_p * error + self.k_i * self.error_sum + self.k_d * (error - self.last_error);

        self.last_error = error;

        out
    }

    /// Get the output of the controller with its magnitude limited to the voltage band
    /// corresponding to `[min_speed_fps, top_speed_fps]`.
    ///
    /// The sign of the raw output is kept so the regulated controller can brake and reverse after
    /// an overshoot. The lower bound only applies while the error is outside `epsilon`, once on
    /// target the output is allowed to decay to zero.
    pub fn calc_regulated_pid(
        &mut self,
        setpoint: f64,
        current: f64,
        epsilon: f64,
        top_speed_fps: f64,
        min_speed_fps: f64,
    ) -> f64 {
        let raw = self.calc_pid(setpoint, current, epsilon);

        let max_v = NOMINAL_VOLTAGE_V * top_speed_fps / self.top_speed_fps;
        let min_v = if self.at_target {
            0.0
        } else {
            (NOMINAL_VOLTAGE_V * min_speed_fps / self.top_speed_fps).min(max_v)
        };

        raw.signum() * raw.abs().max(min_v).min(max_v)
    }

    /// Clear the accumulated history, must be called before the controller is reused for a new
    /// goal.
    pub fn reset(&mut self) {
        self.error_sum = 0.0;
        self.last_error = 0.0;
        self.at_target = false;
    }

    pub fn at_target(&self) -> bool {
        self.at_target
    }

    pub fn error_sum(&self) -> f64 {
        self.error_sum
    }

    pub fn last_error(&self) -> f64 {
        self.last_error
    }

    pub fn top_speed_fps(&self) -> f64 {
        self.top_speed_fps
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_proportional_only() {
        let mut pid = PidController::new(0.7, 0.0, 0.0, 4.0).unwrap();

        for (sp, cur) in [(10.0, 3.0), (-5.0, 2.5), (0.0, 0.0), (1e3, -1e3)].iter() {
            assert_eq!(pid.calc_pid(*sp, *cur, 0.1), 0.7 * (sp - cur));
        }
    }

    #[test]
    fn test_at_target_boundary() {
        let mut pid = PidController::new(1.0, 0.0, 0.0, 4.0).unwrap();

        pid.calc_pid(10.0, 9.0, 1.0);
        assert!(pid.at_target());

        pid.calc_pid(10.0, 8.5, 1.0);
        assert!(!pid.at_target());

        pid.calc_pid(-10.0, -9.0, 1.0);
        assert!(pid.at_target());
    }

    #[test]
    fn test_integral_and_derivative() {
        let mut pid = PidController::new(0.0, 1.0, 2.0, 4.0).unwrap();

        // First call: sum = 3, derivative against the zeroed last error
        assert_eq!(pid.calc_pid(3.0, 0.0, 0.0), 3.0 + 2.0 * 3.0);

        // Second call: sum = 4, derivative = 1 - 3
        assert_eq!(pid.calc_pid(1.0, 0.0, 0.0), 4.0 + 2.0 * -2.0);

        pid.reset();
        assert_eq!(pid.error_sum(), 0.0);
        assert_eq!(pid.last_error(), 0.0);
    }

    #[test]
    fn test_integral_winds_up_unbounded() {
        let mut pid = PidController::new(0.0, 1.0, 0.0, 4.0).unwrap();

        // An unreachable goal keeps growing the integral
        for i in 1..=1000 {
            pid.calc_pid(100.0, 0.0, 1.0);
            assert_eq!(pid.error_sum(), 100.0 * i as f64);
        }
    }

    #[test]
    fn test_regulated_band() {
        let mut pid = PidController::new(1.0, 0.0, 0.0, 4.0).unwrap();

        // Large errors saturate at the top of the band, 2 ft/s of 4 ft/s is 6 V
        assert_eq!(pid.calc_regulated_pid(100.0, 0.0, 1.0, 2.0, 0.0), 6.0);
        assert_eq!(pid.calc_regulated_pid(-100.0, 0.0, 1.0, 2.0, 0.0), -6.0);

        // Small errors are lifted to the bottom of the band, keeping their sign
        assert_eq!(pid.calc_regulated_pid(0.0, 1.5, 1.0, 4.0, 1.0), -3.0);
        assert_eq!(pid.calc_regulated_pid(1.5, 0.0, 1.0, 4.0, 1.0), 3.0);

        // On target the floor no longer applies
        assert_eq!(pid.calc_regulated_pid(0.5, 0.0, 1.0, 4.0, 1.0), 0.5);

        // A zero top speed means no output at all
        assert_eq!(pid.calc_regulated_pid(100.0, 0.0, 1.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn test_invalid_top_speed() {
        assert!(PidController::new(1.0, 0.0, 0.0, 0.0).is_err());
        assert!(PidController::new(1.0, 0.0, 0.0, -1.0).is_err());
        assert!(PidController::new(1.0, 0.0, 0.0, std::f64::NAN).is_err());
    }
}
