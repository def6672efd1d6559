//! RAMSETE nonlinear trajectory tracking controller

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;
use nalgebra::Point2;
use serde::Serialize;

use crate::{drive_loop::RamseteParams, physics::IN_PER_FT, traj::ProfileState};
use util::maths::get_ang_dist_2pi;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Below this heading error `sin(x)/x` is taken as 1.
const SINC_TOLERANCE_RAD: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Tracks a time parameterised reference pose.
///
/// Distances are handled in feet so the default gains match the usual tuning.
#[derive(Debug, Clone, Serialize)]
pub struct Ramsete {
    /// Units: 1/feet^2
    beta: f64,

    zeta: f64,
}

/// The pose error in the robot's frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RamseteError {
    /// Error along the robot's heading
    ///
    /// Units: feet
    pub forward_ft: f64,

    /// Error to the robot's left
    ///
    /// Units: feet
    pub lateral_ft: f64,

    /// Units: radians
    pub heading_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Ramsete {
    pub fn new(params: &RamseteParams) -> Self {
        Self {
            beta: params.beta,
            zeta: params.zeta,
        }
    }

    /// Get the linear (feet/second) and angular (radians/second) velocity demands which drive the
    /// robot onto the reference.
    pub fn calculate(
        &self,
        position_in: Point2<f64>,
        heading_rad: f64,
        reference: &ProfileState,
    ) -> (f64, f64) {
        let err = Self::pose_error(position_in, heading_rad, reference);

        let vd = reference.linear_vel_fps;
        let wd = reference.angular_vel_rads;

        let k = 2.0 * self.zeta * (wd.powi(2) + self.beta * vd.powi(2)).sqrt();

        let v = vd * err.heading_rad.cos() + k * err.forward_ft;
        let w = wd + k * err.heading_rad + self.beta * vd * sinc(err.heading_rad) * err.lateral_ft;

        trace!("Ramsete: {:?}, k = {:.4}, v = {:.4}, w = {:.4}", err, k, v, w);

        (v, w)
    }

    /// Rotate the reference minus current pose into the robot's frame.
    pub fn pose_error(
        position_in: Point2<f64>,
        heading_rad: f64,
        reference: &ProfileState,
    ) -> RamseteError {
        let delta = (reference.position_in - position_in) / IN_PER_FT;
        let (s, c) = heading_rad.sin_cos();

        RamseteError {
            forward_ft: c * delta.x + s * delta.y,
            lateral_ft: -s * delta.x + c * delta.y,
            heading_rad: get_ang_dist_2pi(heading_rad, reference.heading_rad),
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn sinc(x: f64) -> f64 {
    if x.abs() < SINC_TOLERANCE_RAD {
        1.0
    } else {
        x.sin() / x
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        drive_loop::{DriveLoop, Params},
        physics::{Robot, RobotParams},
        traj::{BezierProfile, QuinticBezierPath},
    };

    fn reference(x: f64, y: f64, heading_rad: f64, v: f64, w: f64) -> ProfileState {
        ProfileState {
            position_in: Point2::new(x, y),
            heading_rad,
            linear_vel_fps: v,
            angular_vel_rads: w,
        }
    }

    #[test]
    fn test_on_reference() {
        let ramsete = Ramsete::new(&RamseteParams::default());

        let (v, w) = ramsete.calculate(Point2::new(5.0, 5.0), 0.3, &reference(5.0, 5.0, 0.3, 2.0, 0.5));
        assert!((v - 2.0).abs() < 1e-12);
        assert!((w - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_error_frame() {
        // Robot facing +y, reference 12 inches ahead and 24 inches to its left
        let err = Ramsete::pose_error(
            Point2::origin(),
            std::f64::consts::FRAC_PI_2,
            &reference(-24.0, 12.0, std::f64::consts::FRAC_PI_2, 0.0, 0.0),
        );

        assert!((err.forward_ft - 1.0).abs() < 1e-12);
        assert!((err.lateral_ft - 2.0).abs() < 1e-12);
        assert!(err.heading_rad.abs() < 1e-12);
    }

    #[test]
    fn test_corrections() {
        let ramsete = Ramsete::new(&RamseteParams::default());

        // Behind the reference: speed up
        let (v, _) = ramsete.calculate(Point2::new(-6.0, 0.0), 0.0, &reference(0.0, 0.0, 0.0, 2.0, 0.0));
        assert!(v > 2.0);

        // Reference to the left: turn left
        let (_, w) = ramsete.calculate(Point2::new(0.0, -6.0), 0.0, &reference(0.0, 0.0, 0.0, 2.0, 0.0));
        assert!(w > 0.0);

        // Heading behind the reference: turn towards it
        let (_, w) = ramsete.calculate(Point2::origin(), 0.2, &reference(0.0, 0.0, 0.0, 2.0, 0.0));
        assert!(w < 0.0);
    }

    #[test]
    fn test_track_profile() {
        let path = QuinticBezierPath::new([
            Point2::new(0.0, 0.0),
            Point2::new(30.0, 0.0),
            Point2::new(50.0, 0.0),
            Point2::new(70.0, 30.0),
            Point2::new(80.0, 40.0),
            Point2::new(100.0, 40.0),
        ]);

        let params = Params::default();
        let robot = Robot::new(RobotParams::default()).unwrap();
        let profile = BezierProfile::new(&path, robot.track_width_in(), &params.profile).unwrap();
        let ramsete = Ramsete::new(&params.ramsete);

        let mut dl = DriveLoop::new(robot, &params).unwrap();
        dl.set_curve_following_state();

        let mut time_s = 0.0;
        while time_s < profile.total_time_s() + 1.0 {
            let (v, w) = ramsete.calculate(
                dl.robot().position_in(),
                dl.robot().heading_rad(),
                &profile.state_at(time_s),
            );
            dl.set_curve_setpoint(v, w);
            dl.on_loop();
            time_s += dl.robot().timestep_s();
        }

        assert!((dl.robot().position_in() - Point2::new(100.0, 40.0)).norm() < 3.0);
    }
}
