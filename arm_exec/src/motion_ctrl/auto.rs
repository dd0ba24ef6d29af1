//! # Autonomous operation
//!
//! Each autonomous tick works from the latest detection on the telemetry bus:
//!
//! - a target within `max_deviation` of the pick-up point is picked,
//! - a target further away is steered towards by one step on rotation and extension,
//! - with no target the arm rotates to scan for one.
//!
//! Steering and scanning issue a single command which runs until the next tick replaces it. The
//! time spent issuing it is what gets added to the position estimate.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::Duration;
use log::{info, trace};

use comms_if::eqpt::arm::ArmDems;

use super::{AutoPhase, MotionCtrl, Phase};
use crate::{
    calib::Calibration,
    data_store::Target,
    pos_est::{signed_duration, Axis},
    vision::Point,
};

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MotionCtrl {
    pub(crate) fn auto_tick(&mut self, calib: &Calibration) {
        self.unwind_rotation(calib);

        let target = self.ds.target();

        let (centroid, pickup) = match (target.centroid, pickup_point(&target, calib)) {
            (Some(c), Some(p)) => (c, p),
            _ => {
                self.seek(calib);
                return;
            }
        };

        let distance = (centroid.x as f64 - pickup.0).hypot(centroid.y as f64 - pickup.1);
        trace!("Target at {:?}, {:.1} px from the pick-up point", centroid, distance);

        if distance <= calib.max_deviation {
            self.pick(calib);
        }
        else {
            self.approach(calib, centroid, pickup);
        }
    }

    /// Turn back by the excess if the arm has rotated past its limit.
    fn unwind_rotation(&mut self, calib: &Calibration) {
        let rotation_ms = self.estimator.read(Axis::Rotation).num_milliseconds();

        if calib.rotation_limit_ms <= 0 || rotation_ms <= calib.rotation_limit_ms {
            return;
        }

        let unwind_ms = calib.rotation_limit_ms % calib.rotation_revolution_ms.max(1);
        info!("Rotation limit exceeded ({} ms), unwinding {} ms", rotation_ms, unwind_ms);

        self.issue(calib, ArmDems::new(-calib.rotation_speed, 0, 0, true));
        self.wait_ms(unwind_ms);
        self.estimator.accumulate(Axis::Rotation, Duration::milliseconds(-unwind_ms));
        self.report.num_wraparounds += 1;
    }

    /// Steer one step towards the target.
    fn approach(&mut self, calib: &Calibration, centroid: Point, pickup: (f64, f64)) {
        self.set_phase(Phase::Auto(AutoPhase::Approaching));

        let dx = centroid.x as f64 - pickup.0;
        let dy = centroid.y as f64 - pickup.1;

        // A target right of the pick-up point needs a left turn
        let rotation = step(dx, calib.max_deviation) * -1;
        let extension = step(dy, calib.max_deviation);

        let elapsed = self.issue_timed(calib, ArmDems::new(
            rotation * calib.rotation_speed,
            0,
            extension * calib.extension_speed,
            false
        ));

        self.estimator.accumulate(Axis::Rotation, signed_duration(rotation, elapsed));
        self.estimator.accumulate(Axis::Extension, signed_duration(extension, elapsed));
    }

    /// Rotate forward to look for a target.
    fn seek(&mut self, calib: &Calibration) {
        self.set_phase(Phase::Auto(AutoPhase::Seeking));

        let elapsed = self.issue_timed(calib, ArmDems::new(calib.rotation_speed, 0, 0, false));
        self.estimator.accumulate(Axis::Rotation, signed_duration(1, elapsed));
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// The pixel targets are picked at, the frame centre shifted by the calibrated offset.
///
/// `None` before any frame has been seen.
fn pickup_point(target: &Target, calib: &Calibration) -> Option<(f64, f64)> {
    if target.frame_width == 0 || target.frame_height == 0 {
        return None;
    }

    Some((
        target.frame_width as f64 / 2.0 + calib.center_offset_x as f64,
        target.frame_height as f64 / 2.0 + calib.center_offset_y as f64,
    ))
}

/// Unit step towards an offset, zero if it is within the deadband.
fn step(offset: f64, deadband: f64) -> i32 {
    if offset.abs() > deadband {
        offset.signum() as i32
    }
    else {
        0
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
