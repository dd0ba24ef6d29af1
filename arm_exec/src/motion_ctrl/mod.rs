//! # Motion Control
//!
//! The motion controller decides how the arm moves. It runs on its own thread, making one
//! decision per tick:
//!
//! - On the first tick it homes the arm, driving lift and extension to known positions.
//! - In autonomous mode it searches for the target, steers towards it, and once the target is
//!   under the gripper runs the pick and place sequence.
//! - In manual mode it executes the operator's jog commands one at a time.
//!
//! All position knowledge comes from the [`PositionEstimator`], which integrates the time each
//! axis has been commanded to move. Every phase which issues more than one command leaves the arm
//! stopped, or moving under a command which the next tick will replace.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod auto;
mod homing;
mod manual;
mod pick;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::Duration;
use log::{debug, info, warn};
use std::{sync::Arc, thread};

use comms_if::{eqpt::arm::ArmDems, tc::ArmMode};
use util::time::{self, Clock};

use crate::{
    arm_client::{ArmClientError, ArmTransport},
    calib::{CalibStore, Calibration},
    data_store::{CtrlWriter, DataStore},
    pos_est::{Axis, PositionEstimator},
};

pub use manual::manual_dems;
pub use pick::{PickPhase, PickPlan};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Wait after a tick in which nothing was commanded.
const IDLE_WAIT: std::time::Duration = std::time::Duration::from_millis(1);

/// Number of ticks between status reports in the log.
const REPORT_INTERVAL_TICKS: u64 = 5000;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Phase of the motion controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Driving the axes to their reference positions, only done once at startup.
    Homing,

    /// Autonomous pick and place.
    Auto(AutoPhase),

    /// Executing operator jog commands.
    Manual,
}

/// Phase of autonomous operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoPhase {
    /// No target in view, scanning by rotating.
    Seeking,

    /// Target in view but not under the gripper, steering towards it.
    Approaching,

    /// Target under the gripper, running the pick and place sequence.
    Acquiring(PickPhase),
}

#[derive(Debug, thiserror::Error)]
pub enum MotionCtrlError {
    #[error("The arm did not confirm {0:?}: {1}")]
    NotConfirmed(ArmDems, ArmClientError),
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Motion controller state.
pub struct MotionCtrl {
    transport: Box<dyn ArmTransport>,
    estimator: Box<dyn PositionEstimator>,
    clock: Arc<dyn Clock>,

    ds: DataStore,
    writer: CtrlWriter,
    calib: Arc<CalibStore>,

    phase: Phase,
    report: StatusReport,
}

/// Counters describing the controller's activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusReport {
    pub num_ticks: u64,

    /// Commands sent, including unconfirmed ones
    pub num_commands: u64,

    /// Commands the arm did not confirm
    pub num_unconfirmed: u64,

    /// Completed pick and place sequences
    pub num_picks: u64,

    /// Rotation wraparound corrections
    pub num_wraparounds: u64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MotionCtrl {
    /// Create a new controller, which will home the arm on its first tick.
    pub fn new(
        transport: Box<dyn ArmTransport>,
        estimator: Box<dyn PositionEstimator>,
        clock: Arc<dyn Clock>,
        ds: DataStore,
        writer: CtrlWriter,
        calib: Arc<CalibStore>,
    ) -> Self {
        Self {
            transport,
            estimator,
            clock,
            ds,
            writer,
            calib,
            phase: Phase::Homing,
            report: StatusReport::default(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn report(&self) -> StatusReport {
        self.report
    }

    /// Current position estimate of an axis.
    pub fn estimate(&self, axis: Axis) -> Duration {
        self.estimator.read(axis)
    }

    /// Run the controller forever.
    pub fn run(&mut self) {
        info!("Motion control started");

        loop {
            if !self.tick() {
                thread::sleep(IDLE_WAIT);
            }

            if self.report.num_ticks % REPORT_INTERVAL_TICKS == 0 {
                debug!("{:?}", self.report);
            }
        }
    }

    /// Make one decision.
    ///
    /// The calibration is read once at the start of the tick and used throughout it. Returns
    /// false if nothing was commanded.
    pub fn tick(&mut self) -> bool {
        let calib = self.calib.snapshot();
        self.report.num_ticks += 1;

        if self.phase == Phase::Homing {
            self.home(&calib);
            self.set_phase(self.mode_phase());
            return true;
        }

        match self.ds.mode() {
            ArmMode::Auto => {
                if let Phase::Manual = self.phase {
                    self.set_phase(Phase::Auto(AutoPhase::Seeking));
                }
                self.auto_tick(&calib);
                true
            },
            ArmMode::Manual => {
                self.set_phase(Phase::Manual);
                self.manual_tick(&calib)
            }
        }
    }

    /// The phase matching the current mode.
    fn mode_phase(&self) -> Phase {
        match self.ds.mode() {
            ArmMode::Auto => Phase::Auto(AutoPhase::Seeking),
            ArmMode::Manual => Phase::Manual
        }
    }

    fn set_phase(&mut self, phase: Phase) {
        if phase != self.phase {
            debug!("{:?} -> {:?}", self.phase, phase);
            self.phase = phase;
        }
    }

    /// Send demands to the arm.
    ///
    /// Unconfirmed demands are logged and not retried, the caller carries on as if they had been
    /// executed.
    fn command(&mut self, calib: &Calibration, dems: ArmDems) -> Result<(), MotionCtrlError> {
        self.report.num_commands += 1;

        let timeout = time::millis(calib.arm_timeout_ms as i64);

        self.transport.send(&calib.arm_endpoint, timeout, &dems).map_err(|e| {
            self.report.num_unconfirmed += 1;
            MotionCtrlError::NotConfirmed(dems, e)
        })
    }

    /// Send demands, logging failure.
    fn issue(&mut self, calib: &Calibration, dems: ArmDems) {
        if let Err(e) = self.command(calib, dems) {
            warn!("{}", e);
        }
    }

    /// Send demands and report how long the call took.
    fn issue_timed(&mut self, calib: &Calibration, dems: ArmDems) -> std::time::Duration {
        let start = self.clock.now();
        self.issue(calib, dems);
        self.clock.now().checked_sub(start).unwrap_or_default()
    }

    /// Wait for a number of milliseconds, negative waits are skipped.
    fn wait_ms(&self, ms: i64) {
        self.clock.sleep(time::millis(ms));
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
