//! # Homing
//!
//! Lift and extension are driven outwards for long enough to reach their end stops from any
//! starting position, then extension is brought back to the middle of its travel. This is the
//! only point, other than the end of a pick, where the position estimate is known to be right.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::Duration;
use log::info;

use comms_if::eqpt::arm::ArmDems;

use super::MotionCtrl;
use crate::{calib::Calibration, pos_est::Axis};

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MotionCtrl {
    /// Home the arm.
    pub(crate) fn home(&mut self, calib: &Calibration) {
        info!("Homing started");
        self.writer.set_homing(true);

        // Raise and extend fully, gripping so nothing is dropped on the way
        self.issue(calib, ArmDems::new(0, calib.lift_speed, calib.extension_speed, true));
        self.wait_ms(calib.lift_limit_ms.max(calib.extension_limit_ms));

        // Back to half extension
        self.issue(calib, ArmDems::new(0, 0, -calib.extension_speed, true));
        self.wait_ms(calib.extension_limit_ms / 2);

        self.issue(calib, ArmDems::stop());

        self.estimator.reset(Axis::Lift, Duration::milliseconds(calib.lift_limit_ms));
        self.estimator.reset(Axis::Extension, Duration::milliseconds(calib.extension_limit_ms / 2));

        self.writer.set_homing(false);
        info!("Homing complete");
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::{calib::test::test_calibration, motion_ctrl::test::{harness, ms}};

    #[test]
    fn test_homing_sequence() {
        let calib = test_calibration();
        assert_eq!((calib.lift_limit_ms, calib.extension_limit_ms), (1000, 800));

        let mut h = harness(calib.clone());
        h.ctrl.home(&calib);

        assert_eq!(h.transport.dems(), vec![
            ArmDems::new(0, 120, 80, true),
            ArmDems::new(0, 0, -80, true),
            ArmDems::stop(),
        ]);
        assert_eq!(h.clock.sleeps(), vec![ms(1000), ms(400)]);
        assert_eq!(h.transport.times_ms(), vec![0, 1000, 1400]);

        assert_eq!(h.ctrl.estimate(Axis::Extension), Duration::milliseconds(400));
        assert_eq!(h.ctrl.estimate(Axis::Lift), Duration::milliseconds(1000));
        assert!(!h.ds.homing());
    }

    #[test]
    fn test_homing_extension_longer() {
        let mut calib = test_calibration();
        calib.extension_limit_ms = 1500;

        let mut h = harness(calib.clone());
        h.ctrl.home(&calib);

        assert_eq!(h.clock.sleeps(), vec![ms(1500), ms(750)]);
        assert_eq!(h.ctrl.estimate(Axis::Extension), Duration::milliseconds(750));
    }
}
