//! Differential drive robot model

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{trace, warn};
use nalgebra::{Point2, Vector2};

use super::{
    Gearbox, Motor, RobotParams, IN_PER_FT, KG_PER_LB, M_PER_IN, NOMINAL_VOLTAGE_V,
};
use crate::telemetry::{IndicatorColor, Pose, RobotData};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A differential drive robot with a rigid rectangular chassis.
///
/// Each tick the left and right voltages are converted into wheel forces, which are mixed into
/// per-side accelerations through the chassis' mass and moment of inertia, integrated by the
/// gearboxes, and finally used to advance the pose.
#[derive(Debug, Clone)]
pub struct Robot {
    params: RobotParams,

    left: Gearbox,
    right: Gearbox,

    // ---- DERIVED CONSTANTS ----
    mass_kg: f64,
    wheel_radius_m: f64,
    wheel_radius_in: f64,

    /// Distance from the centre of the chassis to each wheel
    pivot_arm_m: f64,

    moi_kgm2: f64,

    /// Force mixing coefficient for the same side, `1/m + arm^2/I`
    f_plus: f64,

    /// Force mixing coefficient for the opposite side, `1/m - arm^2/I`
    f_minus: f64,

    max_linear_speed_fps: f64,
    max_angular_speed_rads: f64,

    // ---- STATE ----
    time_s: f64,
    average_pos_in: f64,
    heading_rad: f64,
    position_in: Point2<f64>,
    linear_vel_fps: f64,
    angular_vel_rads: f64,
    color: IndicatorColor,

    left_voltage_v: f64,
    right_voltage_v: f64,
    left_torque_nm: f64,
    right_torque_nm: f64,

    // ---- TELEMETRY TAGS ----
    command: String,
    goal_in: Option<Point2<f64>>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors in the robot's configuration.
#[derive(Debug, thiserror::Error)]
pub enum RobotError {
    #[error("The robot's {0} must be positive and finite, found {1}")]
    InvalidParameter(&'static str, f64),

    #[error("Each gearbox needs at least one motor")]
    NoMotors,

    #[error("Either `gear_ratio` or `top_speed_fps` must be given")]
    NoGearing,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Robot {
    /// Build a robot at the origin facing along +x.
    pub fn new(params: RobotParams) -> Result<Self, RobotError> {
        check_positive("mass", params.mass_lb)?;
        check_positive("length", params.length_in)?;
        check_positive("width", params.width_in)?;
        check_positive("wheel diameter", params.wheel_diameter_in)?;
        check_positive("timestep", params.timestep_s)?;

        if params.motors_per_side == 0 {
            return Err(RobotError::NoMotors);
        }

        let motor = Motor::from(params.motor);
        let wheel_radius_in = params.wheel_diameter_in / 2.0;

        let gearbox = match (params.gear_ratio, params.top_speed_fps) {
            (Some(ratio), _) => {
                check_positive("gear ratio", ratio)?;
                Gearbox::new(ratio, motor, params.motors_per_side)
            }
            (None, Some(top_speed_fps)) => {
                check_positive("top speed", top_speed_fps)?;
                Gearbox::from_top_speed(
                    motor,
                    params.motors_per_side,
                    top_speed_fps,
                    wheel_radius_in,
                )
            }
            (None, None) => return Err(RobotError::NoGearing),
        };

        let mass_kg = params.mass_lb * KG_PER_LB;
        let wheel_radius_m = wheel_radius_in * M_PER_IN;
        let length_m = params.length_in * M_PER_IN;
        let width_m = params.width_in * M_PER_IN;
        let pivot_arm_m = width_m / 2.0;

        // Uniform rectangular plate about its centre
        let moi_kgm2 = mass_kg * (length_m.powi(2) + width_m.powi(2)) / 12.0;

        let f_plus = 1.0 / mass_kg + pivot_arm_m.powi(2) / moi_kgm2;
        let f_minus = 1.0 / mass_kg - pivot_arm_m.powi(2) / moi_kgm2;

        let max_linear_speed_ms = gearbox.free_speed_rads() * wheel_radius_m;

        Ok(Self {
            left: gearbox.clone(),
            right: gearbox,
            mass_kg,
            wheel_radius_m,
            wheel_radius_in,
            pivot_arm_m,
            moi_kgm2,
            f_plus,
            f_minus,
            max_linear_speed_fps: max_linear_speed_ms / M_PER_IN / IN_PER_FT,
            max_angular_speed_rads: max_linear_speed_ms / pivot_arm_m,
            time_s: 0.0,
            average_pos_in: 0.0,
            heading_rad: 0.0,
            position_in: Point2::origin(),
            linear_vel_fps: 0.0,
            angular_vel_rads: 0.0,
            color: IndicatorColor::IDLE,
            left_voltage_v: 0.0,
            right_voltage_v: 0.0,
            left_torque_nm: 0.0,
            right_torque_nm: 0.0,
            command: String::new(),
            goal_in: None,
            params,
        })
    }

    /// Advance the simulation by one fixed timestep with the given wheel voltages.
    ///
    /// Voltages are saturated to the nominal battery voltage. Non-finite voltages are treated as
    /// zero.
    pub fn update(&mut self, left_voltage: f64, right_voltage: f64) {
        let dt = self.params.timestep_s;

        self.left_voltage_v = saturate_voltage(left_voltage);
        self.right_voltage_v = saturate_voltage(right_voltage);

        // Voltage to torque to force at the wheel contact patch
        self.left_torque_nm = self.left.calc_torque(self.left_voltage_v);
        self.right_torque_nm = self.right.calc_torque(self.right_voltage_v);
        let left_force_n = self.left_torque_nm / self.wheel_radius_m;
        let right_force_n = self.right_torque_nm / self.wheel_radius_m;

        // Mix the forces into wheel angular accelerations
        let left_acc = (self.f_plus * left_force_n + self.f_minus * right_force_n)
            / self.wheel_radius_m;
        let right_acc = (self.f_minus * left_force_n + self.f_plus * right_force_n)
            / self.wheel_radius_m;

        self.left.update(left_acc, dt);
        self.right.update(right_acc, dt);

        // Body velocities
        self.angular_vel_rads = self.wheel_radius_m / (2.0 * self.pivot_arm_m)
            * (self.right.velocity_rads() - self.left.velocity_rads());
        self.linear_vel_fps =
            (self.left_vel_fps() + self.right_vel_fps()) / 2.0;

        // Translate along the heading held during this tick, then rotate
        let new_average_pos_in = (self.left_pos_in() + self.right_pos_in()) / 2.0;
        let delta_in = new_average_pos_in - self.average_pos_in;
        self.position_in += Vector2::new(self.heading_rad.cos(), self.heading_rad.sin()) * delta_in;
        self.average_pos_in = new_average_pos_in;
        self.heading_rad += self.angular_vel_rads * dt;

        self.time_s += dt;

        self.color = IndicatorColor::from_motion(
            self.linear_vel_fps,
            self.max_linear_speed_fps,
            self.angular_vel_rads,
            self.max_angular_speed_rads,
        );

        trace!(
            "Robot t={:.3} pos=({:.3}, {:.3}) head={:.4} v={:.3} w={:.3}",
            self.time_s,
            self.position_in.x,
            self.position_in.y,
            self.heading_rad,
            self.linear_vel_fps,
            self.angular_vel_rads
        );
    }

    /// Put the robot at rest at the given placement, zeroing both gearboxes.
    pub fn reset_to(&mut self, position_in: Point2<f64>, heading_rad: f64) {
        self.left.reset();
        self.right.reset();
        self.average_pos_in = 0.0;
        self.position_in = position_in;
        self.heading_rad = heading_rad;
        self.linear_vel_fps = 0.0;
        self.angular_vel_rads = 0.0;
        self.left_voltage_v = 0.0;
        self.right_voltage_v = 0.0;
        self.left_torque_nm = 0.0;
        self.right_torque_nm = 0.0;
        self.color = IndicatorColor::IDLE;
    }

    /// Snapshot of the robot's placement.
    pub fn get_pose(&self) -> Pose {
        Pose {
            position_in: self.position_in,
            heading_rad: self.heading_rad,
            color: self.color,
        }
    }

    /// Snapshot of all telemetry fields.
    pub fn get_data(&self) -> RobotData {
        let left_acc_fps2 = self.to_fps(self.left.acceleration_rads2());
        let right_acc_fps2 = self.to_fps(self.right.acceleration_rads2());

        RobotData {
            time_s: self.time_s,
            x_in: self.position_in.x,
            y_in: self.position_in.y,
            heading_rad: self.heading_rad,
            heading_deg: self.heading_rad.to_degrees(),
            average_pos_in: self.average_pos_in,
            linear_vel_fps: self.linear_vel_fps,
            angular_vel_rads: self.angular_vel_rads,
            linear_acc_fps2: (left_acc_fps2 + right_acc_fps2) / 2.0,
            angular_acc_rads2: self.wheel_radius_m / (2.0 * self.pivot_arm_m)
                * (self.right.acceleration_rads2() - self.left.acceleration_rads2()),
            left_pos_in: self.left_pos_in(),
            right_pos_in: self.right_pos_in(),
            left_vel_fps: self.left_vel_fps(),
            right_vel_fps: self.right_vel_fps(),
            left_acc_fps2,
            right_acc_fps2,
            left_voltage_v: self.left_voltage_v,
            right_voltage_v: self.right_voltage_v,
            left_torque_nm: self.left_torque_nm,
            right_torque_nm: self.right_torque_nm,
            color: self.color.hex(),
            command: self.command.clone(),
            goal_x_in: self.goal_in.map(|g| g.x),
            goal_y_in: self.goal_in.map(|g| g.y),
        }
    }

    /// Tag the telemetry with the manoeuvre currently in control and its goal point, if any.
    pub fn set_telemetry_tag(&mut self, command: &str, goal_in: Option<Point2<f64>>) {
        self.command = command.to_string();
        self.goal_in = goal_in;
    }

    pub fn set_color(&mut self, color: IndicatorColor) {
        self.color = color;
    }

    // ---- ACCESSORS ----

    pub fn params(&self) -> &RobotParams {
        &self.params
    }

    pub fn timestep_s(&self) -> f64 {
        self.params.timestep_s
    }

    pub fn time_s(&self) -> f64 {
        self.time_s
    }

    pub fn left_gearbox(&self) -> &Gearbox {
        &self.left
    }

    pub fn right_gearbox(&self) -> &Gearbox {
        &self.right
    }

    pub fn mass_kg(&self) -> f64 {
        self.mass_kg
    }

    pub fn moi_kgm2(&self) -> f64 {
        self.moi_kgm2
    }

    /// Distance between the left and right wheels.
    ///
    /// Units: inches
    pub fn track_width_in(&self) -> f64 {
        2.0 * self.pivot_arm_m / M_PER_IN
    }

    pub fn max_linear_speed_fps(&self) -> f64 {
        self.max_linear_speed_fps
    }

    pub fn max_angular_speed_rads(&self) -> f64 {
        self.max_angular_speed_rads
    }

    pub fn average_pos_in(&self) -> f64 {
        self.average_pos_in
    }

    pub fn heading_rad(&self) -> f64 {
        self.heading_rad
    }

    pub fn heading_deg(&self) -> f64 {
        self.heading_rad.to_degrees()
    }

    pub fn position_in(&self) -> Point2<f64> {
        self.position_in
    }

    pub fn linear_vel_fps(&self) -> f64 {
        self.linear_vel_fps
    }

    pub fn angular_vel_rads(&self) -> f64 {
        self.angular_vel_rads
    }

    pub fn left_pos_in(&self) -> f64 {
        self.left.position_rad() * self.wheel_radius_in
    }

    pub fn right_pos_in(&self) -> f64 {
        self.right.position_rad() * self.wheel_radius_in
    }

    pub fn left_vel_fps(&self) -> f64 {
        self.to_fps(self.left.velocity_rads())
    }

    pub fn right_vel_fps(&self) -> f64 {
        self.to_fps(self.right.velocity_rads())
    }

    /// Convert a wheel rate (or rate derivative) into the equivalent surface speed in feet.
    fn to_fps(&self, rads: f64) -> f64 {
        rads * self.wheel_radius_in / IN_PER_FT
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn check_positive(name: &'static str, value: f64) -> Result<(), RobotError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(RobotError::InvalidParameter(name, value))
    }
}

fn saturate_voltage(voltage: f64) -> f64 {
    if voltage.is_finite() {
        voltage.clamp(-NOMINAL_VOLTAGE_V, NOMINAL_VOLTAGE_V)
    } else {
        warn!("Non-finite voltage command ({}) replaced with zero", voltage);
        0.0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn robot() -> Robot {
        Robot::new(RobotParams::default()).unwrap()
    }

    #[test]
    fn test_straight_drive_never_turns() {
        let mut robot = robot();
        let mut last_pos = robot.average_pos_in();

        for _ in 0..300 {
            robot.update(12.0, 12.0);

            assert_eq!(robot.heading_rad(), 0.0);
            assert_eq!(robot.angular_vel_rads(), 0.0);
            assert!(robot.average_pos_in() > last_pos);
            last_pos = robot.average_pos_in();
        }

        // After 3 s the robot has reached its top speed but never exceeds it
        let max = robot.max_linear_speed_fps();
        assert!(robot.linear_vel_fps() > 0.99 * max);
        assert!(robot.linear_vel_fps() <= max * 1.000_001);
        assert!((max - 4.0).abs() < 0.1);

        // Travelled in a straight line along +x
        assert_eq!(robot.position_in().y, 0.0);
        assert!((robot.position_in().x - robot.average_pos_in()).abs() < 1e-9);
    }

    #[test]
    fn test_opposite_voltages_turn_in_place() {
        let mut robot = robot();
        let mut last_heading = robot.heading_rad();

        for _ in 0..300 {
            robot.update(-12.0, 12.0);

            assert!(robot.average_pos_in().abs() < 1e-9);
            assert!(robot.heading_rad() > last_heading);
            last_heading = robot.heading_rad();
        }

        assert!(robot.position_in().coords.norm() < 1e-9);
    }

    #[test]
    fn test_voltage_saturation() {
        let mut a = robot();
        let mut b = robot();

        a.update(12.0, 12.0);
        b.update(50.0, 1e9);

        assert_eq!(a.average_pos_in(), b.average_pos_in());
        assert_eq!(b.get_data().left_voltage_v, 12.0);

        // NaN is treated as no command
        let mut c = robot();
        c.update(std::f64::NAN, std::f64::NAN);
        assert_eq!(c.average_pos_in(), 0.0);
        assert!(c.get_pose().position_in.x.is_finite());
    }

    #[test]
    fn test_average_pos_is_wheel_mean() {
        let mut robot = robot();

        for i in 0..200 {
            let l = if i < 100 { 6.0 } else { -3.0 };
            robot.update(l, 9.0);

            let mean = (robot.left_pos_in() + robot.right_pos_in()) / 2.0;
            assert!((robot.average_pos_in() - mean).abs() < 1e-12);
        }
    }

    #[test]
    fn test_telemetry_snapshot() {
        let mut robot = robot();
        robot.set_telemetry_tag("goto", Some(Point2::new(10.0, 5.0)));
        robot.update(6.0, 6.0);

        let data = robot.get_data();
        assert_eq!(data.command, "goto");
        assert_eq!(data.goal_x_in, Some(10.0));
        assert_eq!(data.goal_y_in, Some(5.0));
        assert_eq!(data.left_voltage_v, 6.0);
        assert!((data.time_s - 0.01).abs() < 1e-12);

        // The snapshot doesn't change with the robot
        robot.update(12.0, 12.0);
        assert!(robot.get_data().average_pos_in > data.average_pos_in);
    }

    #[test]
    fn test_invalid_params() {
        let mut params = RobotParams::default();
        params.mass_lb = 0.0;
        assert!(Robot::new(params).is_err());

        let mut params = RobotParams::default();
        params.top_speed_fps = None;
        assert!(matches!(Robot::new(params), Err(RobotError::NoGearing)));

        let mut params = RobotParams::default();
        params.motors_per_side = 0;
        assert!(matches!(Robot::new(params), Err(RobotError::NoMotors)));
    }
}
