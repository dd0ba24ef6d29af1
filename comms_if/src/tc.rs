//! # Telecommand module
//!
//! Telecommands are the instructions sent to the arm executable by operators. Each telecommand is
//! a short text message made of a three letter prefix followed by its content:
//!
//! - `CAM<index>` - select the active camera, `-1` deselects all cameras
//! - `MAN<mode>` - select autonomous (`0`) or manual (anything else) operation
//! - `CTR<cmd>` - a single manual jog command, one of `F`, `B`, `R`, `L`, `U`, `D`
//!
//! Operator clients perform no validation, so everything is checked here before it reaches the
//! telemetry bus.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Serialize, Deserialize};
use std::fmt;
use thiserror::Error;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Length of every telecommand prefix.
pub const PREFIX_LEN: usize = 3;

/// Prefix of the select camera telecommand.
pub const CAM_SELECT_PREFIX: &str = "CAM";

/// Prefix of the mode telecommand.
pub const MODE_PREFIX: &str = "MAN";

/// Prefix of the manual jog telecommand.
pub const MANUAL_PREFIX: &str = "CTR";

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A telecommand, i.e. an instruction sent to the arm by an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tc {
    SelectCamera(CamSelect),
    SetMode(ArmMode),
    Manual(ManualCmd),
}

/// Operating mode of the arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArmMode {
    /// Autonomous pick and place.
    Auto,

    /// Teleoperation with [`ManualCmd`]s.
    Manual,
}

/// The camera an operator wants to view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CamSelect {
    None,
    Index(usize),
}

/// A single manual jog of one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManualCmd {
    /// Extend the arm
    Forward,
    /// Retract the arm
    Back,
    /// Rotate right
    Right,
    /// Rotate left
    Left,
    /// Raise the arm
    Up,
    /// Lower the arm
    Down,
}

/// Response sent back to the operator for every telecommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TcResponse {
    /// The telecommand was accepted and written to the telemetry bus
    Ok,

    /// The telecommand could not be parsed and has been ignored
    Invalid,
}

/// Possible parsing errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TcParseError {
    #[error("TC is too short to contain a prefix: {0:?}")]
    TooShort(String),

    #[error("TC has an unrecognised prefix: {0:?}")]
    UnknownPrefix(String),

    #[error("{0:?} is not a valid camera index")]
    InvalidCamIndex(String),

    #[error("{0:?} is not a valid manual command")]
    InvalidManualCmd(String),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Tc {
    /// Parse a telecommand from it's wire representation.
    pub fn parse(msg: &str) -> Result<Self, TcParseError> {
        let prefix = match msg.get(..PREFIX_LEN) {
            Some(p) => p,
            None => return Err(TcParseError::TooShort(msg.into()))
        };
        let content = &msg[PREFIX_LEN..];

        match prefix {
            CAM_SELECT_PREFIX => CamSelect::from_wire(content).map(Tc::SelectCamera),
            MODE_PREFIX => Ok(Tc::SetMode(ArmMode::from_wire(content))),
            MANUAL_PREFIX => {
                let mut chars = content.chars();
                match (chars.next().and_then(ManualCmd::from_char), chars.next()) {
                    (Some(c), None) => Ok(Tc::Manual(c)),
                    _ => Err(TcParseError::InvalidManualCmd(content.into()))
                }
            },
            _ => Err(TcParseError::UnknownPrefix(prefix.into()))
        }
    }

    /// Get the wire representation of this telecommand.
    pub fn to_wire(&self) -> String {
        match self {
            Tc::SelectCamera(c) => format!("{}{}", CAM_SELECT_PREFIX, c.to_wire()),
            Tc::SetMode(m) => format!("{}{}", MODE_PREFIX, m.to_wire()),
            Tc::Manual(c) => format!("{}{}", MANUAL_PREFIX, c.as_char()),
        }
    }
}

impl ArmMode {
    /// Interpret the content of the mode channel.
    ///
    /// Only `"0"` selects autonomous operation, anything else is manual.
    pub fn from_wire(s: &str) -> Self {
        match s {
            "0" => ArmMode::Auto,
            _ => ArmMode::Manual
        }
    }

    pub fn to_wire(&self) -> &'static str {
        match self {
            ArmMode::Auto => "0",
            ArmMode::Manual => "1"
        }
    }
}

impl Default for ArmMode {
    fn default() -> Self {
        ArmMode::Manual
    }
}

impl CamSelect {
    /// Parse a camera index, where `-1` means no camera.
    pub fn from_wire(s: &str) -> Result<Self, TcParseError> {
        match s.trim().parse::<i64>() {
            Ok(-1) => Ok(CamSelect::None),
            Ok(i) if i >= 0 => Ok(CamSelect::Index(i as usize)),
            _ => Err(TcParseError::InvalidCamIndex(s.into()))
        }
    }

    pub fn to_wire(&self) -> String {
        match self {
            CamSelect::None => String::from("-1"),
            CamSelect::Index(i) => i.to_string()
        }
    }
}

impl Default for CamSelect {
    fn default() -> Self {
        CamSelect::Index(0)
    }
}

impl ManualCmd {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'F' => Some(ManualCmd::Forward),
            'B' => Some(ManualCmd::Back),
            'R' => Some(ManualCmd::Right),
            'L' => Some(ManualCmd::Left),
            'U' => Some(ManualCmd::Up),
            'D' => Some(ManualCmd::Down),
            _ => None
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            ManualCmd::Forward => 'F',
            ManualCmd::Back => 'B',
            ManualCmd::Right => 'R',
            ManualCmd::Left => 'L',
            ManualCmd::Up => 'U',
            ManualCmd::Down => 'D',
        }
    }
}

impl fmt::Display for ManualCmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_valid() {
        assert_eq!(Tc::parse("CAM2"), Ok(Tc::SelectCamera(CamSelect::Index(2))));
        assert_eq!(Tc::parse("CAM-1"), Ok(Tc::SelectCamera(CamSelect::None)));
        assert_eq!(Tc::parse("MAN0"), Ok(Tc::SetMode(ArmMode::Auto)));
        assert_eq!(Tc::parse("MAN1"), Ok(Tc::SetMode(ArmMode::Manual)));

        // Anything other than "0" selects manual operation
        assert_eq!(Tc::parse("MAN7"), Ok(Tc::SetMode(ArmMode::Manual)));
        assert_eq!(Tc::parse("MAN"), Ok(Tc::SetMode(ArmMode::Manual)));
        assert_eq!(Tc::parse("CTRU"), Ok(Tc::Manual(ManualCmd::Up)));
        assert_eq!(Tc::parse("CTRL"), Ok(Tc::Manual(ManualCmd::Left)));
    }

    #[test]
    fn test_parse_invalid() {
        assert_eq!(Tc::parse(""), Err(TcParseError::TooShort("".into())));
        assert_eq!(Tc::parse("CA"), Err(TcParseError::TooShort("CA".into())));
        assert_eq!(Tc::parse("XYZ1"), Err(TcParseError::UnknownPrefix("XYZ".into())));
        assert_eq!(Tc::parse("CAMtwo"), Err(TcParseError::InvalidCamIndex("two".into())));
        assert_eq!(Tc::parse("CAM-4"), Err(TcParseError::InvalidCamIndex("-4".into())));
        assert_eq!(Tc::parse("CTR"), Err(TcParseError::InvalidManualCmd("".into())));
        assert_eq!(Tc::parse("CTRUD"), Err(TcParseError::InvalidManualCmd("UD".into())));
        assert_eq!(Tc::parse("CTRx"), Err(TcParseError::InvalidManualCmd("x".into())));

        // Multi-byte characters must not panic on the prefix split
        assert_eq!(Tc::parse("éé"), Err(TcParseError::TooShort("éé".into())));
    }

    #[test]
    fn test_to_wire() {
        for tc in [
            Tc::SelectCamera(CamSelect::Index(11)),
            Tc::SelectCamera(CamSelect::None),
            Tc::SetMode(ArmMode::Auto),
            Tc::Manual(ManualCmd::Back)
        ].iter() {
            assert_eq!(Tc::parse(&tc.to_wire()), Ok(*tc));
        }
    }

    #[test]
    fn test_mode_from_wire() {
        assert_eq!(ArmMode::from_wire("0"), ArmMode::Auto);
        assert_eq!(ArmMode::from_wire("1"), ArmMode::Manual);
        assert_eq!(ArmMode::from_wire(""), ArmMode::Manual);
    }
}
