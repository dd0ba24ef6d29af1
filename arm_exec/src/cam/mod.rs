//! # Camera module
//!
//! Camera devices are listed with the system's V4L2 utilities and opened through `rscam`. The
//! acquisition loop in [`acq`] owns the only open camera handle.
//!
//! Operators select cameras by their position in the published camera list. That logical index
//! is mapped to the device's driver index, as found by [`enumerate`], and the device opened is
//! `/dev/video<driver index>`.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod acq;
pub mod enumerate;
pub mod v4l;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use image::RgbImage;

use crate::calib::Calibration;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Something which can list and open cameras.
pub trait CamOpener {
    /// List the available devices, in logical index order.
    fn list(&mut self) -> Result<Vec<CamDevice>, CamError>;

    /// Open and start the device.
    fn open(
        &mut self,
        device: &CamDevice,
        settings: &CamSettings
    ) -> Result<Box<dyn CamHandle>, CamError>;
}

/// An open camera. The device is released when the handle is dropped.
pub trait CamHandle {
    /// Block until the next frame is available.
    fn capture(&mut self) -> Result<RgbImage, CamError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A camera as listed by the system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CamDevice {
    /// Human readable name of the device
    pub name: String,

    /// Index of the video device node
    pub driver_index: u32,
}

/// Settings a camera is started with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CamSettings {
    pub fps: u32,
    pub resolution: (u32, u32),
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CamError {
    #[error("Could not run the device listing command: {0}")]
    ListError(std::io::Error),

    #[error("The device listing command failed: {0}")]
    ListFailed(String),

    #[error("Could not open camera {0}: {1}")]
    OpenError(String, std::io::Error),

    #[error("Could not start camera {0}: {1}")]
    StartError(String, rscam::Error),

    #[error("Could not capture a frame: {0}")]
    CaptureError(std::io::Error),

    #[error("Could not decode a frame: {0}")]
    DecodeError(image::ImageError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CamDevice {
    /// Path of the device node.
    pub fn path(&self) -> String {
        format!("/dev/video{}", self.driver_index)
    }
}

impl CamSettings {
    pub fn from_calibration(calib: &Calibration) -> Self {
        Self {
            fps: calib.camera_fps,
            resolution: (calib.camera_width, calib.camera_height),
        }
    }
}
