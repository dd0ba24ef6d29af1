//! # Telemetry module
//!
//! Telemetry is published as a set of named channels, each carrying only the latest value of one
//! measurement or command. On the wire each channel is a text message made of the channel's three
//! letter prefix followed by its content.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::tc::PREFIX_LEN;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Separator between device names on the camera list channel.
pub const CAM_LIST_SEPARATOR: &str = "|";

/// Value of the centroid channels when no target is detected.
pub const NO_TARGET: i32 = -1;

/// Value of the homing channel when the arm is not homing.
pub const NOT_HOMING: &str = "0";

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The closed set of telemetry channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TmChannel {
    /// Base64 encoded compressed camera frame
    CamImage,
    /// `|` joined camera device names
    CamList,
    /// Target centroid x in display pixels, `-1` for no target
    CentroidX,
    /// Target centroid y in display pixels, `-1` for no target
    CentroidY,
    /// `"0"` for autonomous operation, otherwise manual
    Mode,
    /// Index of the active camera, `-1` for none
    CamSelect,
    /// Pending manual command, empty if there is none
    ManualCmd,
    /// Homing status, `"0"` when not homing
    Homing,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TmParseError {
    #[error("Telemetry message is too short to contain a prefix")]
    TooShort,

    #[error("Telemetry message has an unrecognised prefix: {0:?}")]
    UnknownPrefix(String),
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// One telemetry channel value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TmMessage {
    pub channel: TmChannel,
    pub content: String,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TmChannel {
    /// All channels, in publishing order.
    pub const ALL: [TmChannel; 8] = [
        TmChannel::CamImage,
        TmChannel::CamList,
        TmChannel::CentroidX,
        TmChannel::CentroidY,
        TmChannel::Mode,
        TmChannel::CamSelect,
        TmChannel::ManualCmd,
        TmChannel::Homing,
    ];

    pub fn prefix(&self) -> &'static str {
        match self {
            TmChannel::CamImage => "CAM",
            TmChannel::CamList => "CAS",
            TmChannel::CentroidX => "CXD",
            TmChannel::CentroidY => "CYD",
            TmChannel::Mode => "MAN",
            TmChannel::CamSelect => "CON",
            TmChannel::ManualCmd => "CTR",
            TmChannel::Homing => "HOM",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.prefix() == prefix)
    }
}

impl TmMessage {
    pub fn new<S: Into<String>>(channel: TmChannel, content: S) -> Self {
        Self {
            channel,
            content: content.into()
        }
    }

    pub fn to_wire(&self) -> String {
        let mut s = String::with_capacity(PREFIX_LEN + self.content.len());
        s.push_str(self.channel.prefix());
        s.push_str(&self.content);
        s
    }

    pub fn from_wire(msg: &str) -> Result<Self, TmParseError> {
        let prefix = msg.get(..PREFIX_LEN).ok_or(TmParseError::TooShort)?;

        match TmChannel::from_prefix(prefix) {
            Some(channel) => Ok(Self::new(channel, &msg[PREFIX_LEN..])),
            None => Err(TmParseError::UnknownPrefix(prefix.into()))
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_prefixes_unique() {
        for (i, a) in TmChannel::ALL.iter().enumerate() {
            assert_eq!(a.prefix().len(), PREFIX_LEN);
            for b in TmChannel::ALL.iter().skip(i + 1) {
                assert_ne!(a.prefix(), b.prefix());
            }
        }
    }

    #[test]
    fn test_wire() {
        let msg = TmMessage::new(TmChannel::CentroidX, "-1");
        assert_eq!(msg.to_wire(), "CXD-1");
        assert_eq!(TmMessage::from_wire("CXD-1"), Ok(msg));

        assert_eq!(
            TmMessage::from_wire("CASUSB Camera|Integrated Webcam"),
            Ok(TmMessage::new(TmChannel::CamList, "USB Camera|Integrated Webcam"))
        );
        assert_eq!(TmMessage::from_wire("HOM"), Ok(TmMessage::new(TmChannel::Homing, "")));
        assert_eq!(TmMessage::from_wire("CX"), Err(TmParseError::TooShort));
        assert_eq!(
            TmMessage::from_wire("ABC12"),
            Err(TmParseError::UnknownPrefix("ABC".into()))
        );
    }
}
