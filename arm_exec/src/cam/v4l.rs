//! # V4L2 cameras

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use image::RgbImage;
use log::debug;
use rscam::{Camera, Config};

use super::{enumerate, CamDevice, CamError, CamHandle, CamOpener, CamSettings};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Opens cameras through V4L2, streaming MJPEG.
#[derive(Debug, Default)]
pub struct V4lOpener;

struct V4lCam {
    camera: Camera,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CamOpener for V4lOpener {
    fn list(&mut self) -> Result<Vec<CamDevice>, CamError> {
        enumerate::list_devices()
    }

    fn open(
        &mut self,
        device: &CamDevice,
        settings: &CamSettings
    ) -> Result<Box<dyn CamHandle>, CamError> {
        let path = device.path();

        let mut camera = Camera::new(&path)
            .map_err(|e| CamError::OpenError(path.clone(), e))?;

        camera.start(&Config {
            interval: (1, settings.fps),
            resolution: settings.resolution,
            format: b"MJPG",
            ..Default::default()
        }).map_err(|e| CamError::StartError(path.clone(), e))?;

        debug!("Started {} ({:?}) with {:?}", path, device.name, settings);

        Ok(Box::new(V4lCam { camera }))
    }
}

impl CamHandle for V4lCam {
    fn capture(&mut self) -> Result<RgbImage, CamError> {
        let frame = self.camera.capture().map_err(CamError::CaptureError)?;

        image::load_from_memory_with_format(&frame[..], image::ImageFormat::Jpeg)
            .map(|i| i.to_rgb8())
            .map_err(CamError::DecodeError)
    }
}
