//! Pure pursuit controller

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, info};
use nalgebra::Point2;
use serde::Serialize;

use crate::drive_loop::PursuitParams;
use util::maths::get_ang_dist_2pi;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Steers the robot towards a goal on the path a lookahead distance ahead of it, slowing down as
/// the final goal approaches.
#[derive(Debug, Clone, Serialize)]
pub struct PurePursuit {
    /// Units: feet/second
    max_speed_fps: f64,

    /// Largest change in speed allowed in one cycle
    ///
    /// Units: feet/second
    max_speed_step_fps: f64,

    /// Units: 1/second
    turn_const: f64,

    reverse: bool,

    /// Units: inches
    goal_dist_in: f64,

    /// Units: inches
    end_dist_in: f64,

    /// Units: inches
    lookahead_in: f64,

    goals: Vec<Point2<f64>>,

    /// Index of the first goal not yet reached, only ever increases
    goal_index: usize,

    arrived: bool,

    /// Current speed demand, negative when reversing
    ///
    /// Units: feet/second
    speed_fps: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PurePursuit {
    /// Create a new controller over the given goals. The controller runs once every `period_s`.
    pub fn new(
        params: &PursuitParams,
        goals: Vec<Point2<f64>>,
        reverse: bool,
        period_s: f64,
    ) -> Self {
        let max_speed_step_fps = if params.acc_time_s > 0.0 {
            params.max_speed_fps * period_s / params.acc_time_s
        } else {
            params.max_speed_fps
        };

        let arrived = goals.is_empty();

        Self {
            max_speed_fps: params.max_speed_fps,
            max_speed_step_fps,
            turn_const: params.turn_const,
            reverse,
            goal_dist_in: params.goal_dist_in,
            end_dist_in: params.end_dist_in,
            lookahead_in: params.lookahead_in,
            goals,
            goal_index: 0,
            arrived,
            speed_fps: 0.0,
        }
    }

    /// Run one cycle of the controller from the robot's current pose.
    ///
    /// Returns the linear (feet/second) and angular (radians/second) velocity demands. Both are
    /// zero once the last goal has been reached.
    pub fn update(&mut self, position_in: Point2<f64>, heading_rad: f64) -> (f64, f64) {
        self.advance_goals(position_in);

        if self.arrived {
            self.speed_fps = 0.0;
            return (0.0, 0.0);
        }

        let target_speed = self.arrive(position_in);
        self.seek(position_in, heading_rad, target_speed)
    }

    pub fn arrived(&self) -> bool {
        self.arrived
    }

    pub fn goal_index(&self) -> usize {
        self.goal_index
    }

    pub fn goals(&self) -> &[Point2<f64>] {
        &self.goals
    }

    pub fn speed_fps(&self) -> f64 {
        self.speed_fps
    }

    /// Skip every goal the robot is already within the end distance of.
    fn advance_goals(&mut self, position_in: Point2<f64>) {
        while self.goal_index < self.goals.len()
            && (self.goals[self.goal_index] - position_in).norm() <= self.end_dist_in
        {
            self.goal_index += 1;
        }

        if !self.arrived && self.goal_index == self.goals.len() {
            info!("Pure pursuit arrived at the final goal");
            self.arrived = true;
        }
    }

    /// Speed magnitude to aim for, ramping down linearly inside the goal distance of the final
    /// goal but never below the speed at the end distance.
    fn arrive(&self, position_in: Point2<f64>) -> f64 {
        let final_dist_in = match self.goals.last() {
            Some(g) => (g - position_in).norm(),
            None => 0.0,
        };

        if final_dist_in < self.goal_dist_in {
            (self.max_speed_fps * final_dist_in.max(self.end_dist_in) / self.goal_dist_in)
                .min(self.max_speed_fps)
        } else {
            self.max_speed_fps
        }
    }

    /// Steer towards the lookahead goal, derating the speed by the bearing error.
    fn seek(&mut self, position_in: Point2<f64>, heading_rad: f64, target_speed: f64) -> (f64, f64) {
        let goal = self.lookahead_goal(position_in);
        let delta = goal - position_in;
        let bearing = delta.y.atan2(delta.x);

        // Direction of travel, backwards when reversing
        let travel_heading = if self.reverse {
            heading_rad + std::f64::consts::PI
        } else {
            heading_rad
        };

        // Shortest rotation from the direction of travel onto the bearing
        let twist = get_ang_dist_2pi(travel_heading, bearing);

        let derate = (1.0 - twist.abs().min(std::f64::consts::FRAC_PI_2) / std::f64::consts::FRAC_PI_2)
            .powi(2);

        let mut desired = target_speed * derate;
        if self.reverse {
            desired = -desired;
        }

        let step = (desired - self.speed_fps)
            .max(-self.max_speed_step_fps)
            .min(self.max_speed_step_fps);
        self.speed_fps += step;

        debug!(
            "PurePursuit: goal {}/{}, twist {:.3} rad, speed {:.3} ft/s",
            self.goal_index,
            self.goals.len(),
            twist,
            self.speed_fps
        );

        (self.speed_fps, self.turn_const * twist)
    }

    /// The first remaining goal at least the lookahead distance away, or the final goal.
    fn lookahead_goal(&self, position_in: Point2<f64>) -> Point2<f64> {
        self.goals[self.goal_index..]
            .iter()
            .find(|g| (*g - position_in).norm() >= self.lookahead_in)
            .or_else(|| self.goals.last())
            .copied()
            .unwrap_or(position_in)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        drive_loop::{DriveLoop, Params},
        physics::{Robot, RobotParams},
    };

    fn line_goals(length_in: f64, spacing_in: f64, dir: f64) -> Vec<Point2<f64>> {
        let n = (length_in / spacing_in) as usize;
        (0..=n)
            .map(|i| Point2::new(dir * i as f64 * spacing_in, 0.0))
            .collect()
    }

    #[test]
    fn test_speed_is_rate_limited() {
        let params = PursuitParams::default();
        let mut pp = PurePursuit::new(&params, line_goals(200.0, 1.0, 1.0), false, 0.01);

        let step = params.max_speed_fps * 0.01 / params.acc_time_s;
        let mut last = 0.0;
        for _ in 0..10 {
            let (v, w) = pp.update(Point2::origin(), 0.0);
            assert!((v - last - step).abs() < 1e-12);
            assert_eq!(w, 0.0);
            last = v;
        }
    }

    #[test]
    fn test_turn_direction() {
        let params = PursuitParams::default();
        let goals = vec![Point2::new(0.0, 50.0)];

        // Goal on the left turns anticlockwise
        let mut pp = PurePursuit::new(&params, goals.clone(), false, 0.01);
        let (v, w) = pp.update(Point2::origin(), 0.0);
        assert!(w > 0.0);

        // 90 degrees off means no translation
        assert_eq!(v, 0.0);

        // Reversing towards it turns the back of the robot to face it, clockwise
        let mut pp = PurePursuit::new(&params, goals, true, 0.01);
        let (_, w) = pp.update(Point2::origin(), 0.0);
        assert!(w < 0.0);
    }

    #[test]
    fn test_arrival_is_permanent() {
        let params = PursuitParams::default();
        let mut pp = PurePursuit::new(
            &params,
            vec![Point2::new(1.0, 0.0), Point2::new(2.0, 0.0)],
            false,
            0.01,
        );

        assert_eq!(pp.update(Point2::new(2.0, 0.0), 0.0), (0.0, 0.0));
        assert!(pp.arrived());
        assert_eq!(pp.goal_index(), 2);

        // Moving away again doesn't bring the goals back
        pp.update(Point2::new(-100.0, 0.0), 0.0);
        assert!(pp.arrived());
        assert_eq!(pp.goal_index(), 2);
    }

    fn run(goals: Vec<Point2<f64>>, reverse: bool) -> DriveLoop {
        let params = Params::default();
        let robot = Robot::new(RobotParams::default()).unwrap();
        let period_s = robot.timestep_s();
        let mut dl = DriveLoop::new(robot, &params).unwrap();
        let mut pp = PurePursuit::new(&params.pursuit, goals, reverse, period_s);

        dl.set_curve_following_state();
        for _ in 0..3000 {
            let (v, w) = pp.update(dl.robot().position_in(), dl.robot().heading_rad());
            if pp.arrived() {
                break;
            }
            dl.set_curve_setpoint(v, w);
            dl.on_loop();
        }

        assert!(pp.arrived());
        dl
    }

    #[test]
    fn test_follow_straight_line() {
        let dl = run(line_goals(100.0, 1.0, 1.0), false);

        let end = Point2::new(100.0, 0.0);
        assert!((dl.robot().position_in() - end).norm() <= PursuitParams::default().end_dist_in);
        assert_eq!(dl.robot().position_in().y, 0.0);
    }

    #[test]
    fn test_follow_reverse() {
        let dl = run(line_goals(60.0, 1.0, -1.0), true);

        let end = Point2::new(-60.0, 0.0);
        assert!((dl.robot().position_in() - end).norm() <= PursuitParams::default().end_dist_in);
        assert!(dl.robot().heading_rad().abs() < 1e-9);
    }

    #[test]
    fn test_follow_curve() {
        // Quarter circle of radius 60 to the left
        let goals: Vec<_> = (0..=90)
            .map(|i| {
                let a = (i as f64).to_radians();
                Point2::new(60.0 * a.sin(), 60.0 * (1.0 - a.cos()))
            })
            .collect();

        let dl = run(goals, false);

        let end = Point2::new(60.0, 60.0);
        assert!((dl.robot().position_in() - end).norm() <= PursuitParams::default().end_dist_in);
        assert!(dl.robot().heading_deg() > 45.0);
    }
}
