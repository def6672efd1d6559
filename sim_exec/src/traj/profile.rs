//! Time parameterised trajectory profile along a Bezier path

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, warn};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use super::{BezierPath, TrajPoint};
use crate::physics::IN_PER_FT;
use util::maths::get_ang_dist_2pi;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Curvatures below this are treated as straight, giving an infinite radius.
///
/// Units: 1/inches
const STRAIGHT_CURVATURE: f64 = 1e-6;

/// Paths shorter than this can't be profiled.
///
/// Units: inches
const MIN_PATH_LENGTH_IN: f64 = 1e-6;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Limits used when generating trajectory profiles
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ProfileParams {
    /// Number of samples along the path
    pub resolution: usize,

    /// Units: feet/second
    pub max_vel_fps: f64,

    /// Units: feet/second^2
    pub max_acc_fps2: f64,

    /// Units: feet/second^2
    pub max_dec_fps2: f64,
}

/// A velocity profile along a path.
///
/// All arrays have one entry per sample. Samples are evenly spaced in distance along the path.
/// Velocities are stored in inches/second and accelerations in inches/second^2, lookups convert
/// them to feet.
#[derive(Debug, Clone, Serialize)]
pub struct BezierProfile {
    track_width_in: f64,

    /// Curve parameter of each sample
    ts: Vec<f64>,

    distances_in: Vec<f64>,
    points: Vec<Point2<f64>>,

    /// Continuous (unwrapped) heading of the path
    headings_rad: Vec<f64>,

    /// Signed curvature, positive when turning anticlockwise
    curvatures: Vec<f64>,

    /// Unsigned radius of the path, infinite on straight sections
    radii_in: Vec<f64>,

    center_vel_ips: Vec<f64>,

    left_vel_ips: Vec<f64>,
    right_vel_ips: Vec<f64>,
    left_pos_in: Vec<f64>,
    right_pos_in: Vec<f64>,
    left_acc_ips2: Vec<f64>,
    right_acc_ips2: Vec<f64>,

    times_s: Vec<f64>,
}

/// The motion of the centre of the robot at one sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProfileState {
    pub position_in: Point2<f64>,
    pub heading_rad: f64,
    pub linear_vel_fps: f64,
    pub angular_vel_rads: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("A profile needs at least 2 samples, got {0}")]
    InvalidResolution(usize),

    #[error("The profile's {0} must be positive and finite, found {1}")]
    InvalidLimit(&'static str, f64),

    #[error("The path has no length")]
    ZeroLength,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for ProfileParams {
    fn default() -> Self {
        Self {
            resolution: 500,
            max_vel_fps: 3.5,
            max_acc_fps2: 4.0,
            max_dec_fps2: 4.0,
        }
    }
}

impl BezierProfile {
    /// Generate the profile for a robot with the given track width.
    pub fn new<P: BezierPath>(
        path: &P,
        track_width_in: f64,
        params: &ProfileParams,
    ) -> Result<Self, ProfileError> {
        let n = params.resolution;
        if n < 2 {
            return Err(ProfileError::InvalidResolution(n));
        }
        check_limit("track width", track_width_in)?;
        check_limit("max velocity", params.max_vel_fps)?;
        check_limit("max acceleration", params.max_acc_fps2)?;
        check_limit("max deceleration", params.max_dec_fps2)?;

        let mut profile = Self {
            track_width_in,
            ts: Vec::with_capacity(n),
            distances_in: Vec::with_capacity(n),
            points: Vec::with_capacity(n),
            headings_rad: Vec::with_capacity(n),
            curvatures: Vec::with_capacity(n),
            radii_in: Vec::with_capacity(n),
            center_vel_ips: Vec::with_capacity(n),
            left_vel_ips: Vec::with_capacity(n),
            right_vel_ips: Vec::with_capacity(n),
            left_pos_in: Vec::with_capacity(n),
            right_pos_in: Vec::with_capacity(n),
            left_acc_ips2: Vec::with_capacity(n),
            right_acc_ips2: Vec::with_capacity(n),
            times_s: Vec::with_capacity(n),
        };

        let (t_samples, d_samples) = parameterise_by_t(path, n);
        let total_in = d_samples[n - 1];
        if !(total_in > MIN_PATH_LENGTH_IN) {
            return Err(ProfileError::ZeroLength);
        }

        profile.parameterise_by_d(path, &t_samples, &d_samples);
        profile.apply_curvature_constraint(params.max_vel_fps * IN_PER_FT);
        profile.apply_acceleration_constraint(params.max_acc_fps2 * IN_PER_FT);
        profile.apply_deceleration_constraint(params.max_dec_fps2 * IN_PER_FT);
        profile.calc_wheels();

        debug!(
            "Generated {} sample profile: {:.2} in in {:.3} s",
            n,
            total_in,
            profile.total_time_s()
        );

        Ok(profile)
    }

    // ---- LOOKUP ----

    /// Setpoint of the left wheel at the first sample at or after `time_s`.
    ///
    /// Samples are not interpolated. Times past the end return the last sample.
    pub fn get_left_traj_point(&self, time_s: f64) -> TrajPoint {
        let i = self.index_at(time_s);
        traj_point(self.left_pos_in[i], self.left_vel_ips[i], self.left_acc_ips2[i])
    }

    /// Setpoint of the right wheel at the first sample at or after `time_s`.
    pub fn get_right_traj_point(&self, time_s: f64) -> TrajPoint {
        let i = self.index_at(time_s);
        traj_point(self.right_pos_in[i], self.right_vel_ips[i], self.right_acc_ips2[i])
    }

    /// Path heading at the first sample at or after `time_s`.
    ///
    /// Units: radians
    pub fn heading_at(&self, time_s: f64) -> f64 {
        self.headings_rad[self.index_at(time_s)]
    }

    /// Motion of the robot's centre at the first sample at or after `time_s`.
    pub fn state_at(&self, time_s: f64) -> ProfileState {
        let i = self.index_at(time_s);

        ProfileState {
            position_in: self.points[i],
            heading_rad: self.headings_rad[i],
            linear_vel_fps: self.center_vel_ips[i] / IN_PER_FT,
            angular_vel_rads: self.center_vel_ips[i] * self.curvatures[i],
        }
    }

    fn index_at(&self, time_s: f64) -> usize {
        self.times_s
            .partition_point(|&t| t < time_s)
            .min(self.times_s.len() - 1)
    }

    // ---- ACCESSORS ----

    pub fn len(&self) -> usize {
        self.times_s.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times_s.is_empty()
    }

    pub fn track_width_in(&self) -> f64 {
        self.track_width_in
    }

    pub fn total_time_s(&self) -> f64 {
        self.times_s.last().copied().unwrap_or(0.0)
    }

    pub fn total_distance_in(&self) -> f64 {
        self.distances_in.last().copied().unwrap_or(0.0)
    }

    pub fn ts(&self) -> &[f64] {
        &self.ts
    }

    pub fn times_s(&self) -> &[f64] {
        &self.times_s
    }

    pub fn distances_in(&self) -> &[f64] {
        &self.distances_in
    }

    pub fn points(&self) -> &[Point2<f64>] {
        &self.points
    }

    pub fn headings_rad(&self) -> &[f64] {
        &self.headings_rad
    }

    pub fn curvatures(&self) -> &[f64] {
        &self.curvatures
    }

    pub fn radii_in(&self) -> &[f64] {
        &self.radii_in
    }

    /// Units: inches/second
    pub fn center_vel_ips(&self) -> &[f64] {
        &self.center_vel_ips
    }

    /// Units: inches/second
    pub fn left_vel_ips(&self) -> &[f64] {
        &self.left_vel_ips
    }

    /// Units: inches/second
    pub fn right_vel_ips(&self) -> &[f64] {
        &self.right_vel_ips
    }

    pub fn left_pos_in(&self) -> &[f64] {
        &self.left_pos_in
    }

    pub fn right_pos_in(&self) -> &[f64] {
        &self.right_pos_in
    }

    /// Units: inches/second^2
    pub fn left_acc_ips2(&self) -> &[f64] {
        &self.left_acc_ips2
    }

    /// Units: inches/second^2
    pub fn right_acc_ips2(&self) -> &[f64] {
        &self.right_acc_ips2
    }

    // ---- GENERATION ----

    /// Resample the path evenly by distance by interpolating the `t` to distance table.
    fn parameterise_by_d<P: BezierPath>(&mut self, path: &P, t_samples: &[f64], d_samples: &[f64]) {
        let n = t_samples.len();
        let total_in = d_samples[n - 1];

        let mut seg = 0;
        for j in 0..n {
            let d = total_in * j as f64 / (n - 1) as f64;

            while seg < n - 2 && d_samples[seg + 1] < d {
                seg += 1;
            }

            let span = d_samples[seg + 1] - d_samples[seg];
            let frac = if span > 0.0 {
                ((d - d_samples[seg]) / span).max(0.0).min(1.0)
            } else {
                0.0
            };
            let t = t_samples[seg] + frac * (t_samples[seg + 1] - t_samples[seg]);

            let curvature = path.calc_curvature(t);
            let (curvature, radius) = if curvature.abs() < STRAIGHT_CURVATURE {
                (0.0, std::f64::INFINITY)
            } else {
                (curvature, 1.0 / curvature.abs())
            };

            let raw_heading = path.calc_heading(t);
            let heading = match self.headings_rad.last() {
                Some(&prev) => prev + get_ang_dist_2pi(prev, raw_heading),
                None => raw_heading,
            };

            self.ts.push(t);
            self.distances_in.push(d);
            self.points.push(path.calc_point(t));
            self.headings_rad.push(heading);
            self.curvatures.push(curvature);
            self.radii_in.push(radius);
        }
    }

    /// Limit the centre velocity so the outside wheel never exceeds the max velocity.
    fn apply_curvature_constraint(&mut self, max_vel_ips: f64) {
        let half_track = self.track_width_in / 2.0;

        self.center_vel_ips = self
            .radii_in
            .iter()
            .map(|&r| {
                if r.is_infinite() {
                    max_vel_ips
                } else {
                    max_vel_ips * r / (r + half_track)
                }
            })
            .collect();
    }

    /// Forward pass, the robot starts from rest.
    fn apply_acceleration_constraint(&mut self, max_acc_ips2: f64) {
        let step_in = self.step_in();

        self.center_vel_ips[0] = 0.0;
        for i in 1..self.center_vel_ips.len() {
            let reachable = (self.center_vel_ips[i - 1].powi(2) + 2.0 * max_acc_ips2 * step_in).sqrt();
            self.center_vel_ips[i] = self.center_vel_ips[i].min(reachable);
        }
    }

    /// Backward pass, the robot must be able to stop at the end.
    fn apply_deceleration_constraint(&mut self, max_dec_ips2: f64) {
        let step_in = self.step_in();
        let n = self.center_vel_ips.len();

        self.center_vel_ips[n - 1] = 0.0;
        for i in (0..n - 1).rev() {
            let stoppable = (self.center_vel_ips[i + 1].powi(2) + 2.0 * max_dec_ips2 * step_in).sqrt();
            self.center_vel_ips[i] = self.center_vel_ips[i].min(stoppable);
        }
    }

    /// Derive the sample times and the per wheel positions, velocities and accelerations.
    fn calc_wheels(&mut self) {
        let n = self.center_vel_ips.len();
        let step_in = self.step_in();
        let half_track = self.track_width_in / 2.0;

        // Wheel velocities, the wheel on the outside of the turn is the faster one
        for i in 0..n {
            let v = self.center_vel_ips[i];
            let r = self.radii_in[i];

            if r.is_infinite() {
                self.left_vel_ips.push(v);
                self.right_vel_ips.push(v);
            } else {
                let outer = v * (r + half_track) / r;
                let inner = v * (r - half_track) / r;

                if self.curvatures[i] > 0.0 {
                    self.left_vel_ips.push(inner);
                    self.right_vel_ips.push(outer);
                } else {
                    self.left_vel_ips.push(outer);
                    self.right_vel_ips.push(inner);
                }
            }
        }

        // Times and wheel positions, assuming constant acceleration between samples
        self.times_s.push(0.0);
        self.left_pos_in.push(0.0);
        self.right_pos_in.push(0.0);

        let mut stalled = 0;
        for i in 1..n {
            let vel_sum = self.center_vel_ips[i - 1] + self.center_vel_ips[i];
            let dt = if vel_sum > 0.0 {
                2.0 * step_in / vel_sum
            } else {
                stalled += 1;
                0.0
            };

            self.times_s.push(self.times_s[i - 1] + dt);
            self.left_pos_in.push(
                self.left_pos_in[i - 1] + (self.left_vel_ips[i - 1] + self.left_vel_ips[i]) / 2.0 * dt,
            );
            self.right_pos_in.push(
                self.right_pos_in[i - 1]
                    + (self.right_vel_ips[i - 1] + self.right_vel_ips[i]) / 2.0 * dt,
            );
        }

        if stalled > 0 {
            warn!("{} profile segments have zero velocity and take no time", stalled);
        }

        // Forward difference accelerations, zero at the end
        for i in 0..n {
            let (left_acc, right_acc) = if i + 1 < n {
                let dt = self.times_s[i + 1] - self.times_s[i];
                if dt > 0.0 {
                    (
                        (self.left_vel_ips[i + 1] - self.left_vel_ips[i]) / dt,
                        (self.right_vel_ips[i + 1] - self.right_vel_ips[i]) / dt,
                    )
                } else {
                    (0.0, 0.0)
                }
            } else {
                (0.0, 0.0)
            };

            self.left_acc_ips2.push(left_acc);
            self.right_acc_ips2.push(right_acc);
        }
    }

    /// Distance between neighbouring samples
    fn step_in(&self) -> f64 {
        self.total_distance_in() / (self.distances_in.len() - 1) as f64
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Sample the path evenly in `t`, accumulating the chord length.
fn parameterise_by_t<P: BezierPath>(path: &P, n: usize) -> (Vec<f64>, Vec<f64>) {
    let mut ts = Vec::with_capacity(n);
    let mut ds = Vec::with_capacity(n);

    let mut prev = path.calc_point(0.0);
    let mut dist = 0.0;

    for i in 0..n {
        let t = i as f64 / (n - 1) as f64;
        let point = path.calc_point(t);

        dist += (point - prev).norm();
        prev = point;

        ts.push(t);
        ds.push(dist);
    }

    (ts, ds)
}

fn traj_point(position_in: f64, vel_ips: f64, acc_ips2: f64) -> TrajPoint {
    TrajPoint {
        position_in,
        velocity_fps: vel_ips / IN_PER_FT,
        acceleration_fps2: acc_ips2 / IN_PER_FT,
    }
}

fn check_limit(name: &'static str, value: f64) -> Result<(), ProfileError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ProfileError::InvalidLimit(name, value))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::traj::QuinticBezierPath;

    const TRACK_WIDTH_IN: f64 = 30.0;

    fn diagonal() -> QuinticBezierPath {
        // Collinear but unevenly spaced, so t and distance aren't proportional
        QuinticBezierPath::new([
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 10.0),
            Point2::new(15.0, 15.0),
            Point2::new(40.0, 40.0),
            Point2::new(60.0, 60.0),
            Point2::new(70.0, 70.0),
        ])
    }

    fn s_curve() -> QuinticBezierPath {
        QuinticBezierPath::new([
            Point2::new(0.0, 0.0),
            Point2::new(40.0, 0.0),
            Point2::new(60.0, 0.0),
            Point2::new(60.0, 60.0),
            Point2::new(80.0, 60.0),
            Point2::new(120.0, 60.0),
        ])
    }

    fn straight_x(length_in: f64) -> QuinticBezierPath {
        let mut points = [Point2::origin(); 6];
        for (i, p) in points.iter_mut().enumerate() {
            p.x = length_in * i as f64 / 5.0;
        }
        QuinticBezierPath::new(points)
    }

    #[test]
    fn test_straight_wheels_match_centre() {
        let profile = BezierProfile::new(&diagonal(), TRACK_WIDTH_IN, &ProfileParams::default())
            .unwrap();

        for i in 0..profile.len() {
            assert_eq!(profile.left_vel_ips()[i], profile.center_vel_ips()[i]);
            assert_eq!(profile.right_vel_ips()[i], profile.center_vel_ips()[i]);
            assert!(profile.radii_in()[i].is_infinite());
        }

        let expected_len = 70.0 * std::f64::consts::SQRT_2;
        assert!((profile.total_distance_in() - expected_len).abs() < 1e-3);
    }

    #[test]
    fn test_array_lengths_and_boundaries() {
        let params = ProfileParams {
            resolution: 321,
            ..ProfileParams::default()
        };
        let profile = BezierProfile::new(&s_curve(), TRACK_WIDTH_IN, &params).unwrap();

        let n = 321;
        assert_eq!(profile.len(), n);
        for len in [
            profile.ts().len(),
            profile.distances_in().len(),
            profile.points().len(),
            profile.headings_rad().len(),
            profile.curvatures().len(),
            profile.radii_in().len(),
            profile.center_vel_ips().len(),
            profile.left_vel_ips().len(),
            profile.right_vel_ips().len(),
            profile.left_pos_in().len(),
            profile.right_pos_in().len(),
            profile.left_acc_ips2().len(),
            profile.right_acc_ips2().len(),
            profile.times_s().len(),
        ]
        .iter()
        {
            assert_eq!(*len, n);
        }

        assert_eq!(profile.center_vel_ips()[0], 0.0);
        assert_eq!(profile.center_vel_ips()[n - 1], 0.0);

        for w in profile.times_s().windows(2) {
            assert!(w[1] >= w[0]);
        }
    }

    #[test]
    fn test_limits_respected() {
        let params = ProfileParams::default();
        let profile = BezierProfile::new(&s_curve(), TRACK_WIDTH_IN, &params).unwrap();
        let max_ips = params.max_vel_fps * IN_PER_FT;

        for i in 0..profile.len() {
            assert!(profile.center_vel_ips()[i] <= max_ips + 1e-9);
            assert!(profile.left_vel_ips()[i] <= max_ips + 1e-9);
            assert!(profile.right_vel_ips()[i] <= max_ips + 1e-9);
            assert!(!profile.times_s()[i].is_nan());
            assert!(!profile.left_pos_in()[i].is_nan());
        }

        // First a left turn, so the right wheel leads, then a right turn
        let n = profile.len();
        assert!(profile.curvatures()[n / 8] > 0.0);
        assert!(profile.right_vel_ips()[n / 8] > profile.left_vel_ips()[n / 8]);
        assert!(profile.curvatures()[7 * n / 8] < 0.0);
        assert!(profile.left_vel_ips()[7 * n / 8] > profile.right_vel_ips()[7 * n / 8]);

        // The path finishes pointing the way it started
        assert!(profile.headings_rad()[n - 1].abs() < 1e-3);
    }

    #[test]
    fn test_total_time_matches_trapezoid() {
        let params = ProfileParams::default();
        let length_in = 100.0;
        let profile = BezierProfile::new(&straight_x(length_in), TRACK_WIDTH_IN, &params).unwrap();

        let v = params.max_vel_fps * IN_PER_FT;
        let a = params.max_acc_fps2 * IN_PER_FT;

        // Accelerate, cruise, decelerate
        let ramp_in = v * v / (2.0 * a);
        let expected_s = 2.0 * v / a + (length_in - 2.0 * ramp_in) / v;
        assert!((profile.total_time_s() - expected_s).abs() / expected_s < 0.01);

        // Integrating the wheel velocities over the profile times recovers the path length
        let n = profile.len();
        assert!((profile.left_pos_in()[n - 1] - length_in).abs() < 1e-6);
        assert!((profile.right_pos_in()[n - 1] - length_in).abs() < 1e-6);
    }

    #[test]
    fn test_lookup() {
        let profile = BezierProfile::new(&straight_x(100.0), TRACK_WIDTH_IN, &ProfileParams::default())
            .unwrap();

        // Before the start is the first sample
        let first = profile.get_left_traj_point(-1.0);
        assert_eq!(first.position_in, 0.0);
        assert_eq!(first.velocity_fps, 0.0);

        // After the end is the last sample
        let last = profile.get_right_traj_point(1e6);
        assert!((last.position_in - 100.0).abs() < 1e-6);
        assert_eq!(last.velocity_fps, 0.0);
        assert_eq!(last.acceleration_fps2, 0.0);

        // Velocities are returned in feet/second
        let mid_time = profile.total_time_s() / 2.0;
        let mid = profile.get_left_traj_point(mid_time);
        assert!((mid.velocity_fps - ProfileParams::default().max_vel_fps).abs() < 1e-9);

        // The returned sample is the first one at or after the time
        let i = profile.times_s().iter().position(|&t| t >= mid_time).unwrap();
        assert_eq!(mid.position_in, profile.left_pos_in()[i]);

        let state = profile.state_at(mid_time);
        assert_eq!(state.angular_vel_rads, 0.0);
        assert_eq!(profile.heading_at(mid_time), 0.0);
    }

    #[test]
    fn test_invalid_inputs() {
        let params = ProfileParams {
            resolution: 1,
            ..ProfileParams::default()
        };
        assert!(matches!(
            BezierProfile::new(&diagonal(), TRACK_WIDTH_IN, &params),
            Err(ProfileError::InvalidResolution(1))
        ));

        let params = ProfileParams {
            max_acc_fps2: 0.0,
            ..ProfileParams::default()
        };
        assert!(BezierProfile::new(&diagonal(), TRACK_WIDTH_IN, &params).is_err());

        let point = QuinticBezierPath::new([Point2::new(1.0, 1.0); 6]);
        assert!(matches!(
            BezierProfile::new(&point, TRACK_WIDTH_IN, &ProfileParams::default()),
            Err(ProfileError::ZeroLength)
        ));
    }
}
