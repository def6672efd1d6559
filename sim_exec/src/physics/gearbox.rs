//! Gearbox model, one or more motors driving a single output shaft

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

use super::{Motor, IN_PER_FT, M_PER_IN, NOMINAL_VOLTAGE_V};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A reduction gearbox driven by `num_motors` identical motors.
///
/// The kinematic state describes the output shaft. `reset` zeroes that state and never touches
/// the configuration.
#[derive(Debug, Clone, Serialize)]
pub struct Gearbox {
    /// Motor turns per output turn
    gear_ratio: f64,

    motor: Motor,

    num_motors: u32,

    /// Units: radians
    position_rad: f64,

    /// Units: radians/second
    velocity_rads: f64,

    /// Units: radians/second^2
    acceleration_rads2: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Gearbox {
    pub fn new(gear_ratio: f64, motor: Motor, num_motors: u32) -> Self {
        Self {
            gear_ratio,
            motor,
            num_motors,
            position_rad: 0.0,
            velocity_rads: 0.0,
            acceleration_rads2: 0.0,
        }
    }

    /// Build a gearbox whose ratio gives the requested free speed at the wheel.
    pub fn from_top_speed(
        motor: Motor,
        num_motors: u32,
        top_speed_fps: f64,
        wheel_radius_in: f64,
    ) -> Self {
        let top_speed_ms = top_speed_fps * IN_PER_FT * M_PER_IN;
        let gear_ratio = motor.free_speed_rads * wheel_radius_in * M_PER_IN / top_speed_ms;

        Self::new(gear_ratio, motor, num_motors)
    }

    /// Torque at the output shaft for the given terminal voltage and the current shaft speed.
    ///
    /// This is the linear torque-speed curve of a DC motor reflected through the gear ratio.
    ///
    /// Units: newton meters
    pub fn calc_torque(&self, voltage: f64) -> f64 {
        let m = &self.motor;
        let g = self.gear_ratio;

        let per_motor = (g * m.torque_constant / m.resistance_ohm) * voltage
            - (g * g * m.torque_constant / (m.resistance_ohm * m.voltage_constant))
                * self.velocity_rads;

        per_motor * self.num_motors as f64
    }

    /// Integrate the output shaft over one step assuming constant acceleration.
    pub fn update(&mut self, acceleration_rads2: f64, dt_s: f64) {
        self.acceleration_rads2 = acceleration_rads2;
        self.velocity_rads += self.acceleration_rads2 * dt_s;
        self.position_rad +=
            self.velocity_rads * dt_s + 0.5 * self.acceleration_rads2 * dt_s.powi(2);
    }

    /// Zero the kinematic state.
    pub fn reset(&mut self) {
        self.position_rad = 0.0;
        self.velocity_rads = 0.0;
        self.acceleration_rads2 = 0.0;
    }

    /// Output shaft speed at which the torque vanishes at nominal voltage.
    ///
    /// Units: radians/second
    pub fn free_speed_rads(&self) -> f64 {
        NOMINAL_VOLTAGE_V * self.motor.voltage_constant / self.gear_ratio
    }

    pub fn gear_ratio(&self) -> f64 {
        self.gear_ratio
    }

    pub fn motor(&self) -> &Motor {
        &self.motor
    }

    pub fn num_motors(&self) -> u32 {
        self.num_motors
    }

    pub fn position_rad(&self) -> f64 {
        self.position_rad
    }

    pub fn velocity_rads(&self) -> f64 {
        self.velocity_rads
    }

    pub fn acceleration_rads2(&self) -> f64 {
        self.acceleration_rads2
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_reset_then_idle_stays_zero() {
        let mut gb = Gearbox::new(10.0, Motor::neo(), 2);

        gb.update(50.0, 0.01);
        gb.update(-20.0, 0.01);
        assert!(gb.position_rad() != 0.0);

        gb.reset();
        for dt in [0.001, 0.01, 0.1, 1.0].iter() {
            gb.update(0.0, *dt);
            assert_eq!(gb.position_rad(), 0.0);
            assert_eq!(gb.velocity_rads(), 0.0);
            assert_eq!(gb.acceleration_rads2(), 0.0);
        }

        // Configuration survives the reset
        assert_eq!(gb.gear_ratio(), 10.0);
        assert_eq!(gb.num_motors(), 2);
    }

    #[test]
    fn test_update_order() {
        let mut gb = Gearbox::new(1.0, Motor::neo(), 1);

        gb.update(2.0, 0.5);

        // Velocity is updated first, position then uses the new velocity
        assert_eq!(gb.velocity_rads(), 1.0);
        assert_eq!(gb.position_rad(), 1.0 * 0.5 + 0.5 * 2.0 * 0.25);
    }

    #[test]
    fn test_torque_curve() {
        let mut gb = Gearbox::new(8.0, Motor::neo(), 2);
        let m = Motor::neo();

        // At rest the torque is the stall torque scaled by the ratio and motor count
        let stall = gb.calc_torque(12.0);
        assert!((stall - 2.0 * 8.0 * m.stall_torque_nm).abs() < 1e-9);

        // At free speed there is no torque left
        let free = gb.free_speed_rads();
        gb.update(free, 1.0);
        assert!((gb.velocity_rads() - free).abs() < 1e-12);
        assert!(gb.calc_torque(12.0).abs() < 1e-9);
    }

    #[test]
    fn test_ratio_from_top_speed() {
        let gb = Gearbox::from_top_speed(Motor::neo(), 2, 4.0, 2.0);

        // 4 ft/s on a 2 inch radius wheel
        let wheel_free_speed_ms = gb.motor().free_speed_rads / gb.gear_ratio() * 2.0 * M_PER_IN;
        assert!((wheel_free_speed_ms - 4.0 * 12.0 * M_PER_IN).abs() < 1e-12);
        assert!((gb.gear_ratio() - 25.65).abs() < 0.05);
    }
}
