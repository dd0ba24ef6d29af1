//! # Arm Equipment Commands
//!
//! The physical arm controller accepts one request per movement decision. Each of the three axes
//! is driven by a pair of directional fields, only one of which is ever non-zero, and the gripper
//! by a single binary field.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Value of the grip field when the gripper is engaged.
pub const GRIP_ENGAGED: u8 = 255;

/// Value of the grip field when the gripper is released.
pub const GRIP_RELEASED: u8 = 0;

/// User agent sent with every request to the arm controller.
pub const USER_AGENT: &str = "arm_exec/0.1.0";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A movement intent for the arm.
///
/// Each axis value is a signed speed, positive being rotate right, raise, and extend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmDems {
    pub rotation: i32,
    pub lift: i32,
    pub extension: i32,
    pub grip: bool,
}

/// Wire representation of [`ArmDems`], as understood by the arm controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmDemsFields {
    /// Rotation forward (right)
    pub r1: u32,
    /// Rotation reverse (left)
    pub r2: u32,
    /// Lift up
    pub u1: u32,
    /// Lift down
    pub u2: u32,
    /// Extension forward
    pub e1: u32,
    /// Extension reverse
    pub e2: u32,
    /// Gripper, either [`GRIP_ENGAGED`] or [`GRIP_RELEASED`]
    pub g1: u8,
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl ArmDems {
    pub fn new(rotation: i32, lift: i32, extension: i32, grip: bool) -> Self {
        Self {
            rotation,
            lift,
            extension,
            grip
        }
    }

    /// All axes stopped and the gripper released.
    pub fn stop() -> Self {
        Self::default()
    }

    /// Encode these demands into their wire fields.
    ///
    /// Every axis is split on its own sign.
    pub fn encode(&self) -> ArmDemsFields {
        let (r1, r2) = split_axis(self.rotation);
        let (u1, u2) = split_axis(self.lift);
        let (e1, e2) = split_axis(self.extension);

        ArmDemsFields {
            r1,
            r2,
            u1,
            u2,
            e1,
            e2,
            g1: if self.grip { GRIP_ENGAGED } else { GRIP_RELEASED },
        }
    }
}

impl ArmDemsFields {
    /// The request headers carrying these fields, in a fixed order.
    pub fn headers(&self) -> [(&'static str, String); 7] {
        [
            ("R1", self.r1.to_string()),
            ("R2", self.r2.to_string()),
            ("U1", self.u1.to_string()),
            ("U2", self.u2.to_string()),
            ("E1", self.e1.to_string()),
            ("E2", self.e2.to_string()),
            ("G1", self.g1.to_string()),
        ]
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Split a signed axis value into its (positive, negative) magnitude fields.
fn split_axis(value: i32) -> (u32, u32) {
    if value > 0 {
        (value as u32, 0)
    }
    else if value < 0 {
        (0, value.unsigned_abs())
    }
    else {
        (0, 0)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_encode() {
        let fields = ArmDems::new(5, 0, -3, true).encode();

        assert_eq!(fields, ArmDemsFields {
            r1: 5,
            r2: 0,
            u1: 0,
            u2: 0,
            e1: 0,
            e2: 3,
            g1: GRIP_ENGAGED
        });
    }

    #[test]
    fn test_encode_uses_own_axis_sign() {
        // A negative rotation must not affect how lift and extension are split
        let fields = ArmDems::new(-7, 4, 2, false).encode();

        assert_eq!((fields.r1, fields.r2), (0, 7));
        assert_eq!((fields.u1, fields.u2), (4, 0));
        assert_eq!((fields.e1, fields.e2), (2, 0));
        assert_eq!(fields.g1, GRIP_RELEASED);

        let fields = ArmDems::new(0, -1, -9, false).encode();
        assert_eq!((fields.u1, fields.u2), (0, 1));
        assert_eq!((fields.e1, fields.e2), (0, 9));
    }

    #[test]
    fn test_stop() {
        let stop = ArmDems::stop();
        assert_eq!(stop.encode(), ArmDemsFields::default());

        let headers = stop.encode().headers();
        assert!(headers.iter().all(|(_, v)| v == "0"));
        assert_eq!(headers[6].0, "G1");
    }
}
