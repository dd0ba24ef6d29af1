//! # Position Estimator
//!
//! The arm has no position sensors. Its position is instead estimated by integrating the time for
//! which each axis has been commanded to move, signed by the direction of the command. The
//! estimate is only as good as the actuators' respect for command timing, and is resynchronised
//! only at the points where the motion controller drives an axis to a known end stop.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::Duration;
use log::trace;
use std::fmt;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The three movable axes of the arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Rotation,
    Lift,
    Extension,
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A source of the arm's position.
pub trait PositionEstimator: Send {
    /// Add a signed movement duration to the axis' total.
    fn accumulate(&mut self, axis: Axis, duration: Duration);

    /// Current total for the axis.
    fn read(&self, axis: Axis) -> Duration;

    /// Overwrite the axis' total with a known value.
    fn reset(&mut self, axis: Axis, value: Duration);
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Dead reckoning estimator, keeping one running total per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadReckoning {
    rotation: Duration,
    lift: Duration,
    extension: Duration,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DeadReckoning {
    pub fn new() -> Self {
        Self {
            rotation: Duration::zero(),
            lift: Duration::zero(),
            extension: Duration::zero(),
        }
    }

    fn total_mut(&mut self, axis: Axis) -> &mut Duration {
        match axis {
            Axis::Rotation => &mut self.rotation,
            Axis::Lift => &mut self.lift,
            Axis::Extension => &mut self.extension,
        }
    }
}

impl Default for DeadReckoning {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionEstimator for DeadReckoning {
    fn accumulate(&mut self, axis: Axis, duration: Duration) {
        let total = self.total_mut(axis);
        *total = total.checked_add(&duration).unwrap_or(*total);

        trace!("{} += {} ms, now {} ms", axis, duration.num_milliseconds(), total.num_milliseconds());
    }

    fn read(&self, axis: Axis) -> Duration {
        match axis {
            Axis::Rotation => self.rotation,
            Axis::Lift => self.lift,
            Axis::Extension => self.extension,
        }
    }

    fn reset(&mut self, axis: Axis, value: Duration) {
        *self.total_mut(axis) = value;
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Rotation => write!(f, "rotation"),
            Axis::Lift => write!(f, "lift"),
            Axis::Extension => write!(f, "extension"),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Movement duration `t` signed by the direction of a command.
///
/// Only the sign of `direction` is used, so a zero direction gives a zero duration.
pub fn signed_duration(direction: i32, t: std::time::Duration) -> Duration {
    Duration::from_std(t).unwrap_or_else(|_| Duration::max_value()) * direction.signum()
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
