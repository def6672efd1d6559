//! # Manoeuvre sequencer

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::collections::VecDeque;
use log::{info, warn};
use serde::Serialize;

// Internal
use super::{Mnvr, MnvrCmd, MnvrError, MnvrStatus};
use crate::drive_loop::{DriveLoop, Params};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Runs a queue of manoeuvres one after another on a single drive loop.
///
/// Between manoeuvres the drive loop is returned to `Waiting`.
#[derive(Debug)]
pub struct Sequencer {
    params: Params,

    queue: VecDeque<MnvrCmd>,

    current: Option<(Mnvr, f64)>,

    history: Vec<MnvrRecord>,
}

/// Summary of a finished manoeuvre.
#[derive(Debug, Clone, Serialize)]
pub struct MnvrRecord {
    pub name: &'static str,

    /// Units: seconds
    pub start_time_s: f64,

    /// Units: seconds
    pub end_time_s: f64,

    pub timed_out: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Sequencer {
    pub fn new(params: Params) -> Self {
        Self {
            params,
            queue: VecDeque::new(),
            current: None,
            history: Vec::new(),
        }
    }

    /// Add a manoeuvre to the back of the queue.
    pub fn push(&mut self, cmd: MnvrCmd) {
        self.queue.push_back(cmd);
    }

    /// Whether there is nothing left to run.
    pub fn is_idle(&self) -> bool {
        self.current.is_none() && self.queue.is_empty()
    }

    /// Run one cycle.
    ///
    /// Returns `false` once every queued manoeuvre has finished. If a manoeuvre can't be started
    /// the loop is left waiting and the error returned, the rest of the queue is kept.
    pub fn step(&mut self, drive_loop: &mut DriveLoop) -> Result<bool, MnvrError> {
        if self.current.is_none() {
            let cmd = match self.queue.pop_front() {
                Some(c) => c,
                None => return Ok(false),
            };

            let mnvr = Mnvr::init(&cmd, drive_loop, &self.params)?;
            self.current = Some((mnvr, drive_loop.robot().time_s()));
        }

        let status = match self.current.as_mut() {
            Some((mnvr, _)) => mnvr.step(drive_loop),
            None => return Ok(false),
        };

        if status != MnvrStatus::Running {
            if let Some((mnvr, start_time_s)) = self.current.take() {
                let end_time_s = drive_loop.robot().time_s();
                let timed_out = status == MnvrStatus::TimedOut;

                if timed_out {
                    warn!(
                        "{} manoeuvre timed out after {} cycles",
                        mnvr.name(),
                        mnvr.cycle()
                    );
                } else {
                    info!("{} manoeuvre complete", mnvr.name());
                }

                self.history.push(MnvrRecord {
                    name: mnvr.name(),
                    start_time_s,
                    end_time_s,
                    timed_out,
                });

                drive_loop.set_waiting_state();
                drive_loop.robot_mut().set_telemetry_tag("", None);
            }
        }

        Ok(true)
    }

    /// Run every queued manoeuvre to completion, calling `on_cycle` after every cycle.
    pub fn run<F>(&mut self, drive_loop: &mut DriveLoop, mut on_cycle: F) -> Result<(), MnvrError>
    where
        F: FnMut(&DriveLoop),
    {
        while self.step(drive_loop)? {
            on_cycle(drive_loop);
        }

        Ok(())
    }

    pub fn history(&self) -> &[MnvrRecord] {
        &self.history
    }

    pub fn params(&self) -> &Params {
        &self.params
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::physics::{Robot, RobotParams};
    use nalgebra::Point2;

    fn setup() -> (Sequencer, DriveLoop) {
        let params = Params::default();
        let robot = Robot::new(RobotParams::default()).unwrap();
        let drive_loop = DriveLoop::new(robot, &params).unwrap();

        (Sequencer::new(params), drive_loop)
    }

    fn cmd(line: &str) -> MnvrCmd {
        MnvrCmd::from_words(&line.split_whitespace().collect::<Vec<_>>()).unwrap()
    }

    #[test]
    fn test_drive_distance_scenario() {
        let (mut seq, mut dl) = setup();

        seq.push(MnvrCmd::DriveDistance {
            distance_in: 100.0,
            tolerance_in: 1.0,
            top_speed_fps: 12.0,
            min_speed_fps: 0.0,
            timeout_s: 15.0,
        });
        seq.run(&mut dl, |_| ()).unwrap();

        assert!((dl.robot().average_pos_in() - 100.0).abs() <= 1.0);
        assert_eq!(seq.history().len(), 1);
        assert!(!seq.history()[0].timed_out);
        assert_eq!(*dl.state(), crate::drive_loop::DriveLoopState::Waiting);
    }

    #[test]
    fn test_drive_to_goal_scenario() {
        let (mut seq, mut dl) = setup();

        seq.push(cmd("goto 72 0"));
        seq.run(&mut dl, |_| ()).unwrap();

        assert!(!seq.history()[0].timed_out);
        let pos = dl.robot().position_in();
        assert!((pos.x - 72.0).abs() <= 1.0);
        assert!(pos.y.abs() <= 1.0);
    }

    #[test]
    fn test_square() {
        let (mut seq, mut dl) = setup();

        for _ in 0..4 {
            seq.push(cmd("dist 36"));
            seq.push(cmd("turn 90 --tol 0.5"));
        }

        let mut cycles = 0;
        seq.run(&mut dl, |_| cycles += 1).unwrap();

        assert!(cycles > 0);
        assert_eq!(seq.history().len(), 8);
        assert!(seq.history().iter().all(|r| !r.timed_out));

        // Back where it started, facing the same way plus a full turn
        assert!(dl.robot().position_in().coords.norm() < 6.0);
        assert!((dl.robot().heading_deg() - 360.0).abs() < 4.0);
    }

    #[test]
    fn test_goto_with_turn() {
        let (mut seq, mut dl) = setup();

        seq.push(cmd("goto 40 40"));
        seq.push(cmd("goto 0 0 --reverse"));
        seq.run(&mut dl, |_| ()).unwrap();

        assert!(seq.history().iter().all(|r| !r.timed_out));
        assert!(dl.in_goal_box(Point2::origin(), 1.0));
    }

    #[test]
    fn test_timeout() {
        let (mut seq, mut dl) = setup();

        seq.push(cmd("dist 500 --timeout-s 1"));
        seq.push(cmd("wait 0.5"));
        seq.run(&mut dl, |_| ()).unwrap();

        let history = seq.history();
        assert!(history[0].timed_out);
        assert!((history[0].end_time_s - 1.0).abs() < 1e-6);
        assert!(!history[1].timed_out);
        assert!((history[1].end_time_s - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_path_manoeuvres() {
        let coords = "0 0 30 0 50 0 70 30 80 40 100 40";
        let end = Point2::new(100.0, 40.0);

        for line in [
            format!("profile {}", coords),
            format!("profile --closed-loop {}", coords),
            format!("pursuit {}", coords),
            format!("ramsete {}", coords),
        ]
        .iter()
        {
            let (mut seq, mut dl) = setup();
            seq.push(cmd(line));
            seq.run(&mut dl, |_| ()).unwrap();

            assert!(!seq.history()[0].timed_out, "{} timed out", line);
            let err = (dl.robot().position_in() - end).norm();
            assert!(err < 6.0, "{} finished {:.2} in from the end", line, err);
        }
    }

    #[test]
    fn test_bad_command_is_reported() {
        let (mut seq, mut dl) = setup();

        seq.push(MnvrCmd::Ramsete {
            timeout_s: 10.0,
            control_points: vec![0.0; 4],
        });
        seq.push(cmd("wait 0.1"));

        assert!(matches!(
            seq.step(&mut dl),
            Err(MnvrError::WrongNumControlPoints(4))
        ));

        // The rest of the queue still runs
        seq.run(&mut dl, |_| ()).unwrap();
        assert_eq!(seq.history().len(), 1);
        assert!(seq.is_idle());
    }
}
