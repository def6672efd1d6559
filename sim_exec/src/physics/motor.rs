//! DC motor electrical model

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::{NOMINAL_VOLTAGE_V, RADS_PER_RPM};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Physical constants of a brushed or brushless DC motor, measured at the nominal voltage.
///
/// The derived constants are computed once on construction and the motor is never mutated
/// afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Motor {
    /// Units: newton meters
    pub stall_torque_nm: f64,

    /// Units: amps
    pub stall_current_a: f64,

    /// Units: radians/second
    pub free_speed_rads: f64,

    /// Units: amps
    pub free_current_a: f64,

    /// Winding resistance.
    ///
    /// Units: ohms
    pub resistance_ohm: f64,

    /// Speed produced per volt of back EMF.
    ///
    /// Units: (radians/second)/volt
    pub voltage_constant: f64,

    /// Torque produced per amp.
    ///
    /// Units: newton meters/amp
    pub torque_constant: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Motors the simulator knows the datasheet values of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotorKind {
    Neo,
    Cim,
    MiniCim,
    Falcon500,
    Pro775,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Motor {
    /// Build a motor from its datasheet values. `free_speed_rpm` is converted to radians/second.
    pub fn new(
        stall_torque_nm: f64,
        stall_current_a: f64,
        free_speed_rpm: f64,
        free_current_a: f64,
    ) -> Self {
        let free_speed_rads = free_speed_rpm * RADS_PER_RPM;
        let resistance_ohm = NOMINAL_VOLTAGE_V / stall_current_a;

        Self {
            stall_torque_nm,
            stall_current_a,
            free_speed_rads,
            free_current_a,
            resistance_ohm,
            voltage_constant: free_speed_rads
                / (NOMINAL_VOLTAGE_V - resistance_ohm * free_current_a),
            torque_constant: stall_torque_nm / stall_current_a,
        }
    }

    pub fn neo() -> Self {
        Self::new(3.36, 166.0, 5880.0, 1.3)
    }

    pub fn cim() -> Self {
        Self::new(2.41, 131.0, 5330.0, 2.7)
    }

    pub fn mini_cim() -> Self {
        Self::new(1.41, 89.0, 5840.0, 3.0)
    }

    pub fn falcon_500() -> Self {
        Self::new(4.69, 257.0, 6380.0, 1.5)
    }

    pub fn pro_775() -> Self {
        Self::new(0.71, 134.0, 18730.0, 0.7)
    }
}

impl From<MotorKind> for Motor {
    fn from(kind: MotorKind) -> Self {
        match kind {
            MotorKind::Neo => Motor::neo(),
            MotorKind::Cim => Motor::cim(),
            MotorKind::MiniCim => Motor::mini_cim(),
            MotorKind::Falcon500 => Motor::falcon_500(),
            MotorKind::Pro775 => Motor::pro_775(),
        }
    }
}
