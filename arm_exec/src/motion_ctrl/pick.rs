//! # Pick and place sequence
//!
//! Once the target is under the gripper it is picked up, carried back to the home heading,
//! placed at full extension and the arm returns to the heading it found the target at. The
//! sequence is split into four phases, run back to back:
//!
//! | Phase       | Commands                                      |
//! |-------------|-----------------------------------------------|
//! | `Grasp`     | lower, grip, raise                            |
//! | `Transport` | rotate to home heading, extend fully, lower   |
//! | `Release`   | release, raise                                |
//! | `Return`    | retract to half extension, rotate back, stop  |
//!
//! Every timed move waits for a duration derived from the position estimate before the next
//! command.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::Duration;
use log::{debug, info};

use comms_if::eqpt::arm::ArmDems;

use super::{AutoPhase, MotionCtrl, Phase};
use crate::{calib::Calibration, pos_est::{Axis, PositionEstimator}};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Timings of one pick, fixed when the target is acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickPlan {
    /// Duration of every lift move.
    ///
    /// Units: milliseconds
    pub lift_ms: i64,

    /// Duration of the rotation to the home heading and back.
    ///
    /// Units: milliseconds
    pub heading_ms: i64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickPhase {
    Grasp,
    Transport,
    Release,
    Return,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PickPhase {
    /// The phase following this one, `None` at the end of the sequence.
    pub fn next(self) -> Option<Self> {
        match self {
            PickPhase::Grasp => Some(PickPhase::Transport),
            PickPhase::Transport => Some(PickPhase::Release),
            PickPhase::Release => Some(PickPhase::Return),
            PickPhase::Return => None
        }
    }
}

impl PickPlan {
    /// Plan a pick from the current position estimate.
    ///
    /// Lift moves last as long as the lift has travelled from its lowest point. Rotating back to
    /// the home heading is timed by the whole revolutions turned so far.
    pub fn new(estimator: &dyn PositionEstimator, calib: &Calibration) -> Self {
        Self {
            lift_ms: estimator.read(Axis::Lift).num_milliseconds(),
            heading_ms: estimator.read(Axis::Rotation).num_milliseconds()
                / calib.rotation_revolution_ms.max(1),
        }
    }
}

impl MotionCtrl {
    /// Run the whole pick and place sequence.
    pub(crate) fn pick(&mut self, calib: &Calibration) {
        let plan = PickPlan::new(self.estimator.as_ref(), calib);
        info!("Target acquired, picking with {:?}", plan);

        let mut phase = Some(PickPhase::Grasp);
        while let Some(p) = phase {
            self.set_phase(Phase::Auto(AutoPhase::Acquiring(p)));
            self.pick_phase(calib, p, &plan);
            phase = p.next();
        }

        self.report.num_picks += 1;
        self.set_phase(Phase::Auto(AutoPhase::Seeking));
        info!("Pick complete ({} so far)", self.report.num_picks);
    }

    /// Run a single phase of the sequence.
    pub(crate) fn pick_phase(&mut self, calib: &Calibration, phase: PickPhase, plan: &PickPlan) {
        let PickPlan { lift_ms, heading_ms } = *plan;

        debug!("Pick phase {:?}", phase);

        match phase {
            PickPhase::Grasp => {
                self.move_lift(calib, -1, false, lift_ms);
                self.issue(calib, ArmDems::new(0, 0, 0, true));
                self.move_lift(calib, 1, true, lift_ms);
            },
            PickPhase::Transport => {
                self.move_rotation(calib, -1, heading_ms);

                let remaining_ms = calib.extension_limit_ms
                    - self.estimator.read(Axis::Extension).num_milliseconds();
                self.issue(calib, ArmDems::new(0, 0, calib.extension_speed, true));
                self.wait_ms(remaining_ms);
                self.estimator.accumulate(Axis::Extension, Duration::milliseconds(remaining_ms.max(0)));

                self.move_lift(calib, -1, true, lift_ms);
            },
            PickPhase::Release => {
                self.issue(calib, ArmDems::new(0, 0, 0, false));
                self.move_lift(calib, 1, false, lift_ms);
            },
            PickPhase::Return => {
                self.issue(calib, ArmDems::new(0, 0, -calib.extension_speed, false));
                self.wait_ms(calib.extension_limit_ms / 2);
                self.estimator.reset(
                    Axis::Extension,
                    Duration::milliseconds(calib.extension_limit_ms / 2)
                );

                self.move_rotation(calib, 1, heading_ms);
                self.issue(calib, ArmDems::stop());
            },
        }
    }

    /// Drive the lift for `ms` in `direction`, then account for the movement.
    fn move_lift(&mut self, calib: &Calibration, direction: i32, grip: bool, ms: i64) {
        self.issue(calib, ArmDems::new(0, direction * calib.lift_speed, 0, grip));
        self.wait_ms(ms);
        self.estimator.accumulate(Axis::Lift, Duration::milliseconds(ms.max(0)) * direction);
    }

    /// Rotate for `ms` in `direction` with the gripper engaged, then account for the movement.
    fn move_rotation(&mut self, calib: &Calibration, direction: i32, ms: i64) {
        self.issue(calib, ArmDems::new(direction * calib.rotation_speed, 0, 0, true));
        self.wait_ms(ms);
        self.estimator.accumulate(Axis::Rotation, Duration::milliseconds(ms.max(0)) * direction);
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
    fn test_phase_order() {
        let mut order = vec![PickPhase::Grasp];
        while let Some(p) = order.last().and_then(|p| p.next()) {
            order.push(p);
        }

        assert_eq!(order, vec![
            PickPhase::Grasp,
            PickPhase::Transport,
            PickPhase::Release,
            PickPhase::Return,
        ]);
    }

    #[test]
    fn test_grasp() {
        let calib = test_calibration();
        let mut h = harness(calib.clone());
        h.ctrl.estimator.reset(Axis::Lift, Duration::milliseconds(1000));

        let plan = PickPlan::new(h.ctrl.estimator.as_ref(), &calib);
        assert_eq!(plan, PickPlan { lift_ms: 1000, heading_ms: 0 });

        h.ctrl.pick_phase(&calib, PickPhase::Grasp, &plan);

        assert_eq!(h.transport.dems(), vec![
            ArmDems::new(0, -120, 0, false),
            ArmDems::new(0, 0, 0, true),
            ArmDems::new(0, 120, 0, true),
        ]);
        assert_eq!(h.clock.sleeps(), vec![ms(1000), ms(1000)]);
        assert_eq!(h.ctrl.estimate(Axis::Lift), Duration::milliseconds(1000));
    }

    #[test]
    fn test_full_sequence() {
        let calib = test_calibration();
        let mut h = harness(calib.clone());
        h.ctrl.home(&calib);
        h.transport.clear();

        // Two full revolutions from home
        h.ctrl.estimator.reset(Axis::Rotation, Duration::milliseconds(8000));

        h.ctrl.pick(&calib);

        assert_eq!(h.transport.dems(), vec![
            // Grasp
            ArmDems::new(0, -120, 0, false),
            ArmDems::new(0, 0, 0, true),
            ArmDems::new(0, 120, 0, true),
            // Transport
            ArmDems::new(-100, 0, 0, true),
            ArmDems::new(0, 0, 80, true),
            ArmDems::new(0, -120, 0, true),
            // Release
            ArmDems::new(0, 0, 0, false),
            ArmDems::new(0, 120, 0, false),
            // Return
            ArmDems::new(0, 0, -80, false),
            ArmDems::new(100, 0, 0, true),
            ArmDems::stop(),
        ]);

        // After the homing waits
        assert_eq!(h.clock.sleeps()[2..], [
            ms(1000), ms(1000),
            ms(2), ms(400), ms(1000),
            ms(1000),
            ms(400), ms(2),
        ]);

        assert_eq!(h.ctrl.estimate(Axis::Extension), Duration::milliseconds(400));
        assert_eq!(h.ctrl.estimate(Axis::Rotation), Duration::milliseconds(8000));
        assert_eq!(h.ctrl.estimate(Axis::Lift), Duration::milliseconds(1000));
        assert_eq!(h.ctrl.report().num_picks, 1);
        assert_eq!(h.ctrl.phase(), Phase::Auto(AutoPhase::Seeking));
    }
}
