//! Drive loop parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use crate::traj::ProfileParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the drive loop and the path tracking manoeuvres built on it.
#[derive(Deserialize, Debug, Clone)]
pub struct Params {
    /// Drive controller proportional gain
    ///
    /// Units: volts/inch
    pub drive_k_p: f64,

    /// Drive controller integral gain
    pub drive_k_i: f64,

    /// Drive controller derivative gain
    pub drive_k_d: f64,

    /// Turn controller proportional gain
    ///
    /// Units: volts/degree
    pub turn_k_p: f64,

    /// Turn controller integral gain
    pub turn_k_i: f64,

    /// Turn controller derivative gain
    pub turn_k_d: f64,

    /// Feedforward velocity constant. If not given `12 / max_speed` is used.
    ///
    /// Units: volts/(feet/second)
    #[serde(default)]
    pub k_v: Option<f64>,

    /// Feedforward acceleration constant
    ///
    /// Units: volts/(feet/second^2)
    #[serde(default)]
    pub k_a: f64,

    /// Default tolerance for reaching a goal point
    ///
    /// Units: inches
    pub waypoint_tolerance_in: f64,

    /// Tolerance used by heading holds and point turns
    ///
    /// Units: degrees
    pub turn_tolerance_deg: f64,

    /// Trajectory profile generation
    pub profile: ProfileParams,

    /// Pure pursuit tuning
    pub pursuit: PursuitParams,

    /// RAMSETE tuning
    pub ramsete: RamseteParams,
}

#[derive(Deserialize, Debug, Clone)]
pub struct PursuitParams {
    /// Time to accelerate from rest to the max speed
    ///
    /// Units: seconds
    pub acc_time_s: f64,

    /// Angular velocity demanded per radian of bearing error
    ///
    /// Units: 1/second
    pub turn_const: f64,

    /// Units: feet/second
    pub max_speed_fps: f64,

    /// Distance from the last goal at which the robot starts slowing down
    ///
    /// Units: inches
    pub goal_dist_in: f64,

    /// Distance at which a goal is considered reached
    ///
    /// Units: inches
    pub end_dist_in: f64,

    /// Minimum distance to the point being steered towards
    ///
    /// Units: inches
    pub lookahead_in: f64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct RamseteParams {
    /// Convergence gain, larger values correct the pose error more aggressively
    ///
    /// Units: 1/feet^2
    pub beta: f64,

    /// Damping, between 0 and 1
    pub zeta: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            drive_k_p: 0.5,
            drive_k_i: 0.0,
            drive_k_d: 0.0,
            turn_k_p: 0.15,
            turn_k_i: 0.0,
            turn_k_d: 0.0,
            k_v: None,
            k_a: 0.0,
            waypoint_tolerance_in: 1.0,
            turn_tolerance_deg: 1.0,
            profile: ProfileParams::default(),
            pursuit: PursuitParams::default(),
            ramsete: RamseteParams::default(),
        }
    }
}

impl Default for PursuitParams {
    fn default() -> Self {
        Self {
            acc_time_s: 1.0,
            turn_const: 2.0,
            max_speed_fps: 3.0,
            goal_dist_in: 24.0,
            end_dist_in: 3.0,
            lookahead_in: 12.0,
        }
    }
}

impl Default for RamseteParams {
    fn default() -> Self {
        // beta = 2 m^-2 converted to ft^-2
        Self {
            beta: 0.19,
            zeta: 0.7,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_shipped_params_match_defaults() {
        let params: Params =
            util::params::from_str(include_str!("../../../params/drive_loop.toml")).unwrap();
        let defaults = Params::default();

        assert_eq!(params.drive_k_p, defaults.drive_k_p);
        assert_eq!(params.turn_k_p, defaults.turn_k_p);
        assert_eq!(params.k_v, None);
        assert_eq!(params.profile.resolution, defaults.profile.resolution);
        assert_eq!(params.pursuit.lookahead_in, defaults.pursuit.lookahead_in);
        assert_eq!(params.ramsete.beta, defaults.ramsete.beta);
    }

    #[test]
    fn test_missing_table_rejected() {
        let res: Result<Params, _> = util::params::from_str(
            "drive_k_p = 1.0\ndrive_k_i = 0.0\ndrive_k_d = 0.0\n\
             turn_k_p = 1.0\nturn_k_i = 0.0\nturn_k_d = 0.0\n\
             waypoint_tolerance_in = 1.0\nturn_tolerance_deg = 1.0\n",
        );
        assert!(res.is_err());
    }
}
