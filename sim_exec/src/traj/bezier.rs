//! Quintic Bezier paths

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::warn;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use util::maths::get_ang_dist_2pi;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Half width of the parameter window used to difference the curve.
pub const DIFF_EPSILON: f64 = 5e-4;

/// Binomial coefficients of the fifth order Bernstein basis
const BINOMIALS: [f64; 6] = [1.0, 5.0, 10.0, 10.0, 5.0, 1.0];

/// Windows shorter than this are treated as a stationary point of the curve.
///
/// Units: inches
const MIN_WINDOW_LENGTH_IN: f64 = 1e-12;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A parametric path over `t` in `[0, 1]`.
///
/// Only `calc_point` has to be implemented. Heading and curvature are found by differencing
/// points over a small window around `t`, which is shifted to a one sided difference at the ends
/// of the path.
pub trait BezierPath {
    /// The point on the path at `t`. Values of `t` outside `[0, 1]` extrapolate the curve.
    fn calc_point(&self, t: f64) -> Point2<f64>;

    /// The direction of travel at `t`, anticlockwise from +x.
    ///
    /// Units: radians
    fn calc_heading(&self, t: f64) -> f64 {
        // Widen the window until the curve has moved, a stationary point has no direction
        let mut epsilon = DIFF_EPSILON;
        while epsilon <= 1.0 {
            let (t0, t1) = diff_window(t, epsilon);
            let delta = self.calc_point(t1) - self.calc_point(t0);

            if delta.norm() > MIN_WINDOW_LENGTH_IN {
                return delta.y.atan2(delta.x);
            }

            epsilon *= 10.0;
        }

        warn!("Path has no length around t = {}, heading defaults to 0", t);
        0.0
    }

    /// Signed curvature at `t`, positive when turning anticlockwise.
    ///
    /// Units: 1/inches
    fn calc_curvature(&self, t: f64) -> f64 {
        let (t0, t1) = diff_window(t, DIFF_EPSILON);

        let distance = (self.calc_point(t1) - self.calc_point(t0)).norm();
        if distance <= MIN_WINDOW_LENGTH_IN {
            return 0.0;
        }

        get_ang_dist_2pi(self.calc_heading(t0), self.calc_heading(t1)) / distance
    }

    /// `num_points` points evenly spaced in `t`, including both ends.
    fn sample(&self, num_points: usize) -> Vec<Point2<f64>> {
        match num_points {
            0 => Vec::new(),
            1 => vec![self.calc_point(0.0)],
            _ => (0..num_points)
                .map(|i| self.calc_point(i as f64 / (num_points - 1) as f64))
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A fifth order Bezier curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuinticBezierPath {
    /// Units: inches
    control_points: [Point2<f64>; 6],
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl QuinticBezierPath {
    pub fn new(control_points: [Point2<f64>; 6]) -> Self {
        Self { control_points }
    }

    pub fn control_points(&self) -> &[Point2<f64>; 6] {
        &self.control_points
    }

    /// Mutable access to the control points, used to edit the path in place.
    pub fn control_points_mut(&mut self) -> &mut [Point2<f64>; 6] {
        &mut self.control_points
    }

    /// Return a copy of the path with every control point translated and rotated by the given
    /// pose, taking a path written relative to the robot into the field frame.
    pub fn transformed(&self, origin_in: Point2<f64>, heading_rad: f64) -> Self {
        let (s, c) = heading_rad.sin_cos();
        let mut control_points = self.control_points;

        for p in control_points.iter_mut() {
            *p = Point2::new(
                origin_in.x + c * p.x - s * p.y,
                origin_in.y + s * p.x + c * p.y,
            );
        }

        Self { control_points }
    }
}

impl BezierPath for QuinticBezierPath {
    fn calc_point(&self, t: f64) -> Point2<f64> {
        let u = 1.0 - t;

        let mut point = Point2::origin();
        for (i, (p, b)) in self.control_points.iter().zip(BINOMIALS.iter()).enumerate() {
            let weight = b * u.powi(5 - i as i32) * t.powi(i as i32);
            point.coords += p.coords * weight;
        }

        point
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// The differencing window around `t`, one sided at the ends of the path.
fn diff_window(t: f64, epsilon: f64) -> (f64, f64) {
    if t - epsilon < 0.0 {
        (t, t + epsilon)
    } else if t + epsilon > 1.0 {
        (t - epsilon, t)
    } else {
        (t - epsilon, t + epsilon)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn straight() -> QuinticBezierPath {
        QuinticBezierPath::new([
            Point2::new(0.0, 0.0),
            Point2::new(20.0, 0.0),
            Point2::new(40.0, 0.0),
            Point2::new(60.0, 0.0),
            Point2::new(80.0, 0.0),
            Point2::new(100.0, 0.0),
        ])
    }

    #[test]
    fn test_endpoints() {
        let path = QuinticBezierPath::new([
            Point2::new(1.0, 2.0),
            Point2::new(10.0, -4.0),
            Point2::new(3.0, 7.0),
            Point2::new(-2.0, 5.0),
            Point2::new(8.0, 8.0),
            Point2::new(30.0, 12.0),
        ]);

        assert!((path.calc_point(0.0) - Point2::new(1.0, 2.0)).norm() < 1e-12);
        assert!((path.calc_point(1.0) - Point2::new(30.0, 12.0)).norm() < 1e-12);
    }

    #[test]
    fn test_evenly_spaced_control_points_are_linear() {
        let path = straight();

        for i in 0..=10 {
            let t = i as f64 / 10.0;
            let p = path.calc_point(t);
            assert!((p.x - 100.0 * t).abs() < 1e-9);
            assert_eq!(p.y, 0.0);

            assert!(path.calc_heading(t).abs() < 1e-12);
            assert!(path.calc_curvature(t).abs() < 1e-9);
        }
    }

    #[test]
    fn test_circle_like_curvature() {
        // A quarter turn to the left, curvature should be positive everywhere
        let path = QuinticBezierPath::new([
            Point2::new(0.0, 0.0),
            Point2::new(20.0, 0.0),
            Point2::new(40.0, 0.0),
            Point2::new(50.0, 10.0),
            Point2::new(50.0, 30.0),
            Point2::new(50.0, 50.0),
        ]);

        assert!(path.calc_heading(0.0).abs() < 1e-6);
        assert!((path.calc_heading(1.0) - std::f64::consts::FRAC_PI_2).abs() < 1e-6);

        for i in 1..10 {
            assert!(path.calc_curvature(i as f64 / 10.0) > 0.0);
        }
    }

    #[test]
    fn test_degenerate_path() {
        let p = Point2::new(3.0, 4.0);
        let path = QuinticBezierPath::new([p; 6]);

        assert_eq!(path.calc_heading(0.5), 0.0);
        assert_eq!(path.calc_curvature(0.5), 0.0);

        // Coincident leading control points still have a direction
        let path = QuinticBezierPath::new([
            Point2::new(0.0, 0.0),
            Point2::new(0.0, 0.0),
            Point2::new(0.0, 0.0),
            Point2::new(0.0, 10.0),
            Point2::new(0.0, 20.0),
            Point2::new(0.0, 30.0),
        ]);
        let heading = path.calc_heading(0.0);
        assert!(heading.is_finite());
        assert!((heading - std::f64::consts::FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn test_transformed() {
        let path = straight().transformed(Point2::new(10.0, 5.0), std::f64::consts::FRAC_PI_2);

        let end = path.calc_point(1.0);
        assert!((end.x - 10.0).abs() < 1e-9);
        assert!((end.y - 105.0).abs() < 1e-9);
    }

    #[test]
    fn test_sample() {
        let path = straight();

        assert!(path.sample(0).is_empty());
        assert_eq!(path.sample(1), vec![Point2::new(0.0, 0.0)]);

        let points = path.sample(11);
        assert_eq!(points.len(), 11);
        assert!((points[10].x - 100.0).abs() < 1e-9);
    }
}
