//! # Drive simulator library.
//!
//! This library allows the simulator executable, benchmarks and tools to access the simulation
//! core: the drivetrain physics, the control loop driving it, and the trajectory and path
//! tracking algorithms that feed the control loop.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Feedforward characterisation - fits kV/kA/kS by driving the simulated robot open loop
pub mod characterise;

/// Drive loop - PID controllers and the state machine turning setpoints into motor voltages
pub mod drive_loop;

/// Manoeuvres - script commands, their execution and the sequencer running them in order
pub mod mnvr;

/// Physics - motors, gearboxes and the integrated robot model
pub mod physics;

/// Telemetry - pose and robot data snapshots, and their archive
pub mod telemetry;

/// Path tracking - pure pursuit and RAMSETE controllers
pub mod tracking;

/// Trajectories - Bezier paths, velocity profiles and pursuit paths
pub mod traj;
