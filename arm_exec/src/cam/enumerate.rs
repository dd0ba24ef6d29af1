//! # Camera enumeration
//!
//! Lists cameras using `v4l2-ctl --list-devices`, whose output looks like:
//!
//! ```text
//! USB Camera: USB Camera (usb-0000:00:14.0-1):
//!     /dev/video2
//!     /dev/video3
//!
//! Integrated Camera: Integrated C (usb-0000:00:14.0-5):
//!     /dev/video0
//!     /dev/video1
//! ```
//!
//! Each unindented line names a device, and the first node listed under it gives the driver
//! index.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::warn;
use std::process::Command;

use super::{CamDevice, CamError};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

const LIST_COMMAND: &str = "v4l2-ctl";

const LIST_ARGS: [&str; 1] = ["--list-devices"];

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Run the listing command and parse its output.
pub fn list_devices() -> Result<Vec<CamDevice>, CamError> {
    let output = Command::new(LIST_COMMAND)
        .args(&LIST_ARGS)
        .output()
        .map_err(CamError::ListError)?;

    // v4l2-ctl exits non-zero when some devices can't be queried but still lists the rest, so
    // only give up if nothing was printed.
    if !output.status.success() && output.stdout.is_empty() {
        return Err(CamError::ListFailed(
            String::from_utf8_lossy(&output.stderr).trim().to_string()
        ));
    }

    Ok(parse_device_list(&String::from_utf8_lossy(&output.stdout)))
}

/// Parse the output of the listing command.
///
/// Devices whose node line has no trailing index are skipped.
pub fn parse_device_list(text: &str) -> Vec<CamDevice> {
    let lines: Vec<&str> = text.lines().collect();
    let mut devices = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        if line.is_empty() || line.starts_with('\t') || line.starts_with(' ') {
            continue;
        }

        let name = line.replace(':', "").trim().to_string();

        let node = match lines.get(i + 1) {
            Some(n) => n.trim(),
            None => {
                warn!("Camera {:?} has no device node", name);
                continue;
            }
        };

        match trailing_index(node) {
            Some(driver_index) => devices.push(CamDevice { name, driver_index }),
            None => warn!("Camera {:?} has an unrecognised device node {:?}", name, node)
        }
    }

    devices
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn trailing_index(node: &str) -> Option<u32> {
    let digits = node.len() - node.trim_end_matches(|c: char| c.is_ascii_digit()).len();

    node[node.len() - digits..].parse().ok()
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    const LISTING: &str = "USB Camera: USB Camera (usb-0000:00:14.0-1):\n\
        \t/dev/video2\n\
        \t/dev/video3\n\
        \n\
        Integrated Camera: Integrated C (usb-0000:00:14.0-5):\n\
        \t/dev/video10\n\
        \t/dev/video11\n\
        \n\
        Broken Device (platform:broken):\n\
        \t/dev/media\n";

    #[test]
    fn test_parse_device_list() {
        let devices = parse_device_list(LISTING);

        assert_eq!(devices, vec![
            CamDevice {
                name: "USB Camera USB Camera (usb-000000014.0-1)".into(),
                driver_index: 2,
            },
            CamDevice {
                name: "Integrated Camera Integrated C (usb-000000014.0-5)".into(),
                driver_index: 10,
            },
        ]);

        assert_eq!(devices[1].path(), "/dev/video10");
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_device_list("").is_empty());
        assert!(parse_device_list("Lonely Camera:").is_empty());
    }
}
