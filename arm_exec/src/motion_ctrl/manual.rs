//! # Manual operation
//!
//! Operators jog the arm one axis at a time. A jog drives the axis at its calibrated speed for
//! `manual_interval_ms` and then stops the arm.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::info;

use comms_if::{eqpt::arm::ArmDems, tc::ManualCmd};

use super::MotionCtrl;
use crate::{
    calib::Calibration,
    pos_est::{signed_duration, Axis},
};

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MotionCtrl {
    /// Execute the pending jog, if there is one.
    ///
    /// Returns false if there was nothing to do.
    pub(crate) fn manual_tick(&mut self, calib: &Calibration) -> bool {
        // Consumed before anything moves so that a slow jog can't be repeated
        let cmd = match self.writer.take_manual_cmd() {
            Some(c) => c,
            None => return false
        };

        info!("Manual command: {}", cmd);

        let dems = manual_dems(cmd, calib);
        let interval = util::time::millis(calib.manual_interval_ms as i64);

        let start = self.clock.now();
        self.issue(calib, dems);
        self.clock.sleep(interval);
        let elapsed = self.clock.now().checked_sub(start).unwrap_or_default();

        self.issue(calib, ArmDems::stop());

        // Lift isn't time boxed the same way, so the whole elapsed time is used
        self.estimator.accumulate(Axis::Rotation, signed_duration(dems.rotation, interval));
        self.estimator.accumulate(Axis::Extension, signed_duration(dems.extension, interval));
        self.estimator.accumulate(Axis::Lift, signed_duration(dems.lift, elapsed));

        true
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Demands for a jog.
pub fn manual_dems(cmd: ManualCmd, calib: &Calibration) -> ArmDems {
    match cmd {
        ManualCmd::Forward => ArmDems::new(0, 0, calib.extension_speed, false),
        ManualCmd::Back => ArmDems::new(0, 0, -calib.extension_speed, false),
        ManualCmd::Right => ArmDems::new(calib.rotation_speed, 0, 0, false),
        ManualCmd::Left => ArmDems::new(-calib.rotation_speed, 0, 0, false),
        ManualCmd::Up => ArmDems::new(0, calib.lift_speed, 0, false),
        ManualCmd::Down => ArmDems::new(0, -calib.lift_speed, 0, false),
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::{calib::test::test_calibration, motion_ctrl::test::{harness, ms}};
    use chrono::Duration;

    #[test]
    fn test_jog_up() {
        let calib = test_calibration();
        assert_eq!(calib.manual_interval_ms, 200);

        let mut h = harness(calib.clone());
        h.transport.set_latency(ms(5));
        h.operator.set_manual_cmd(ManualCmd::Up);

        assert!(h.ctrl.manual_tick(&calib));

        assert_eq!(h.transport.dems(), vec![ArmDems::new(0, 120, 0, false), ArmDems::stop()]);
        assert_eq!(h.clock.sleeps(), vec![ms(200)]);
        assert_eq!(h.transport.times_ms(), vec![0, 205]);

        // Cleared before the arm was commanded
        assert_eq!(*h.transport.pending_manual.lock().unwrap(), vec![None, None]);
        assert_eq!(h.ds.manual_cmd(), None);

        assert_eq!(h.ctrl.estimate(Axis::Lift), Duration::milliseconds(205));
        assert_eq!(h.ctrl.estimate(Axis::Rotation), Duration::zero());
    }

    #[test]
    fn test_jog_left_back() {
        let calib = test_calibration();
        let mut h = harness(calib.clone());

        h.operator.set_manual_cmd(ManualCmd::Left);
        h.ctrl.manual_tick(&calib);
        h.operator.set_manual_cmd(ManualCmd::Back);
        h.ctrl.manual_tick(&calib);

        assert_eq!(h.ctrl.estimate(Axis::Rotation), Duration::milliseconds(-200));
        assert_eq!(h.ctrl.estimate(Axis::Extension), Duration::milliseconds(-200));
        assert_eq!(h.ctrl.estimate(Axis::Lift), Duration::zero());
    }

    #[test]
    fn test_no_command() {
        let calib = test_calibration();
        let mut h = harness(calib.clone());

        assert!(!h.ctrl.manual_tick(&calib));
        assert!(h.transport.dems().is_empty());
        assert!(h.clock.sleeps().is_empty());
    }

    #[test]
    fn test_manual_dems() {
        let calib = test_calibration();

        assert_eq!(manual_dems(ManualCmd::Forward, &calib), ArmDems::new(0, 0, 80, false));
        assert_eq!(manual_dems(ManualCmd::Right, &calib), ArmDems::new(100, 0, 0, false));
        assert_eq!(manual_dems(ManualCmd::Down, &calib), ArmDems::new(0, -120, 0, false));
    }
}
