//! Main simulator executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the session and logging
//!     - Load the robot and drive loop parameters
//!     - Either:
//!         - Characterise the robot's feedforward constants, or
//!         - Export the pursuit path of a Bezier curve, or
//!         - Run a manoeuvre script:
//!             - Parse every line of the script into a manoeuvre
//!             - Main loop, one iteration per physics timestep:
//!                 - Sequencer step (manoeuvre processing and drive loop update)
//!                 - Telemetry recording and archiving
//!             - Save a summary of the run
//!
//! # Usage
//!
//! ```text
//! sim_exec scripts/demo.txt
//! sim_exec --characterise
//! sim_exec --export-profile path.txt --points 0 0 30 0 50 0 70 30 80 40 100 40
//! ```

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use structopt::{clap::AppSettings, StructOpt};

// Internal
use sim_lib::{
    characterise::characterise,
    drive_loop::{DriveLoop, Params},
    mnvr::{path_from_coords, MnvrCmd, MnvrRecord, Sequencer},
    physics::{Robot, RobotParams},
    telemetry::{Pose, TelemetryLog},
    traj::{BezierProfile, PursuitPath},
};
use util::{
    archive::Archived,
    logger::{logger_init, LevelFilter},
    script_interpreter::ScriptInterpreter,
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Voltages driven during feedforward characterisation.
///
/// Units: volts
const CHARACTERISATION_VOLTAGES_V: [f64; 6] = [2.0, 4.0, 6.0, 8.0, 10.0, 12.0];

/// Length of each characterisation step.
///
/// Units: seconds
const CHARACTERISATION_STEP_S: f64 = 3.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Differential drive robot simulator
#[derive(Debug, StructOpt)]
#[structopt(name = "sim_exec", global_settings = &[AppSettings::AllowNegativeNumbers])]
struct Cli {
    /// Manoeuvre script to run
    #[structopt(parse(from_os_str), required_unless_one = &["characterise", "export-profile"])]
    script: Option<PathBuf>,

    /// Minimum log level, one of `info`, `debug` or `trace`
    #[structopt(short, long, default_value = "info")]
    log_level: LevelFilter,

    /// Fit the feedforward constants of the robot instead of running a script
    #[structopt(long)]
    characterise: bool,

    /// Write the pursuit path of the curve given by `--points` to this file
    #[structopt(long, parse(from_os_str), requires = "points")]
    export_profile: Option<PathBuf>,

    /// Control points of the exported curve, 6 `x y` pairs in inches
    #[structopt(long = "points", allow_hyphen_values = true)]
    points: Vec<f64>,
}

/// Summary of a script run, saved in the session directory.
#[derive(Debug, Serialize)]
struct RunSummary {
    final_pose: Pose,

    /// Units: seconds
    sim_time_s: f64,

    mnvrs: Vec<MnvrRecord>,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let cli = Cli::from_args();

    // ---- EARLY INITIALISATION ----

    let session = Session::new("sim_exec", "sessions").wrap_err("Failed to create the session")?;

    logger_init(cli.log_level, &session).wrap_err("Failed to initialise logging")?;

    info!("Drive Simulator Executable\n");
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI arguments: {:?}", cli);

    // ---- LOAD PARAMETERS ----

    let robot_params: RobotParams =
        util::params::load("robot.toml").wrap_err("Could not load robot params")?;
    let drive_loop_params: Params =
        util::params::load("drive_loop.toml").wrap_err("Could not load drive loop params")?;

    info!("Parameters loaded");

    // ---- DISPATCH ----

    let result = if cli.characterise {
        run_characterisation(&session, &robot_params)
    } else if let Some(ref path) = cli.export_profile {
        export_profile(path, &cli.points, &robot_params, &drive_loop_params)
    } else {
        match cli.script {
            Some(ref path) => run_script(&session, path, robot_params, drive_loop_params),
            None => Err(eyre!("No script given")),
        }
    };

    session.exit();

    result
}

/// Run a manoeuvre script to completion.
fn run_script(
    session: &Session,
    script_path: &Path,
    robot_params: RobotParams,
    drive_loop_params: Params,
) -> Result<(), Report> {
    info!("Loading script from {:?}", script_path);

    let mut si = ScriptInterpreter::new(script_path).wrap_err("Failed to load script")?;

    info!("Loaded script contains {} manoeuvres\n", si.get_num_lines());

    let mut sequencer = Sequencer::new(drive_loop_params.clone());

    while let Some(line) = si.next_line() {
        let cmd = MnvrCmd::from_words(&line.words)
            .wrap_err_with(|| format!("Invalid manoeuvre on line {}", line.line_num))?;
        debug!("Line {}: {:?}", line.line_num, cmd);
        sequencer.push(cmd);
    }

    // ---- INITIALISE MODULES ----

    let robot = Robot::new(robot_params).wrap_err("Failed to initialise the robot")?;
    info!(
        "Robot initialised, max speed {:.3} ft/s",
        robot.max_linear_speed_fps()
    );

    let mut drive_loop =
        DriveLoop::new(robot, &drive_loop_params).wrap_err("Failed to initialise the drive loop")?;

    let mut telem =
        TelemetryLog::with_session(session).wrap_err("Failed to initialise the telemetry archive")?;

    // ---- MAIN LOOP ----

    info!("Beginning main loop\n");

    loop {
        match sequencer.step(&mut drive_loop) {
            Ok(true) => (),
            Ok(false) => break,
            // A manoeuvre that can't be started is skipped
            Err(e) => {
                warn!("Could not start manoeuvre: {}", e);
                continue;
            }
        }

        let robot = drive_loop.robot();
        telem.record(robot.get_pose(), robot.get_data());

        if let Err(e) = telem.write() {
            warn!("Could not write telemetry archive: {}", e);
        }
    }

    info!("End of script reached, stopping");

    // ---- SUMMARY ----

    let robot = drive_loop.robot();
    let summary = RunSummary {
        final_pose: robot.get_pose(),
        sim_time_s: robot.time_s(),
        mnvrs: sequencer.history().to_vec(),
    };

    info!(
        "Finished at ({:.2}, {:.2}) in, heading {:.2} deg, after {:.2} s",
        summary.final_pose.position_in.x,
        summary.final_pose.position_in.y,
        robot.heading_deg(),
        summary.sim_time_s
    );

    let num_timed_out = summary.mnvrs.iter().filter(|m| m.timed_out).count();
    if num_timed_out > 0 {
        warn!("{} manoeuvre(s) timed out", num_timed_out);
    }

    session.save("summary.json", summary);

    Ok(())
}

/// Fit the feedforward constants and save them in the session.
fn run_characterisation(session: &Session, robot_params: &RobotParams) -> Result<(), Report> {
    info!("Characterising feedforward constants");

    let result = characterise(
        robot_params,
        &CHARACTERISATION_VOLTAGES_V,
        CHARACTERISATION_STEP_S,
    )
    .wrap_err("Characterisation failed")?;

    session.save("characterisation.json", result);

    Ok(())
}

/// Build a profile along the given curve and write its pursuit path.
fn export_profile(
    path: &Path,
    control_points: &[f64],
    robot_params: &RobotParams,
    drive_loop_params: &Params,
) -> Result<(), Report> {
    let curve = path_from_coords(control_points).wrap_err("Invalid control points")?;

    let robot = Robot::new(robot_params.clone()).wrap_err("Failed to initialise the robot")?;

    let profile = BezierProfile::new(&curve, robot.track_width_in(), &drive_loop_params.profile)
        .wrap_err("Could not build the profile")?;

    info!(
        "Profile is {:.2} in long and takes {:.2} s",
        profile.total_distance_in(),
        profile.total_time_s()
    );

    PursuitPath::from_profile(&profile)
        .save(path)
        .wrap_err_with(|| format!("Could not write the pursuit path to {:?}", path))?;

    info!("Pursuit path written to {:?}", path);

    Ok(())
}
