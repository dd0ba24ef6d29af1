//! # Camera acquisition loop
//!
//! Captures frames from the selected camera, runs the vision pipeline on them and publishes the
//! results on the telemetry bus. The loop is the sole owner of the open camera handle.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use image::{imageops, DynamicImage, RgbImage};
use log::{debug, info, trace, warn};
use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use comms_if::{eqpt::cam::encode_image_base64, tc::{ArmMode, CamSelect}};

use super::{CamDevice, CamHandle, CamOpener, CamSettings};
use crate::{
    calib::{CalibStore, Calibration},
    data_store::{DataStore, Target, VisionWriter},
    vision::{self, HlsBounds},
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Interval between refreshes of the camera list.
pub const LIST_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Wait between cycles while there is no camera to capture from.
const IDLE_WAIT: Duration = Duration::from_millis(20);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Camera acquisition state.
pub struct CamAcq<O: CamOpener> {
    opener: O,
    ds: DataStore,
    writer: VisionWriter,
    calib: Arc<CalibStore>,

    devices: Vec<CamDevice>,
    last_refresh: Option<Instant>,

    active: Option<ActiveCam>,

    /// The last selection acted upon, whether or not it succeeded.
    handled_select: Option<CamSelect>,
}

struct ActiveCam {
    index: usize,
    handle: Box<dyn CamHandle>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<O: CamOpener> CamAcq<O> {
    pub fn new(opener: O, ds: DataStore, writer: VisionWriter, calib: Arc<CalibStore>) -> Self {
        Self {
            opener,
            ds,
            writer,
            calib,
            devices: Vec::new(),
            last_refresh: None,
            active: None,
            handled_select: None,
        }
    }

    /// Run the acquisition loop forever.
    pub fn run(&mut self) {
        info!("Camera acquisition started");

        loop {
            if !self.step() {
                thread::sleep(IDLE_WAIT);
            }
        }
    }

    /// Logical index of the open camera.
    pub fn active_index(&self) -> Option<usize> {
        self.active.as_ref().map(|a| a.index)
    }

    /// Perform one acquisition cycle.
    ///
    /// Returns true if a frame was captured.
    pub fn step(&mut self) -> bool {
        let calib = self.calib.snapshot();

        self.refresh_devices();
        self.apply_selection(&calib);

        let active = match self.active.as_mut() {
            Some(a) => a,
            None => return false
        };

        // On failure the previous telemetry is left in place
        let frame = match active.handle.capture() {
            Ok(f) => f,
            Err(e) => {
                warn!("Camera {}: {}", active.index, e);
                return false;
            }
        };

        self.process(orient(frame, &calib), &calib);

        true
    }

    /// Refresh and publish the device list if it is due.
    fn refresh_devices(&mut self) {
        if let Some(t) = self.last_refresh {
            if t.elapsed() < LIST_REFRESH_INTERVAL {
                return;
            }
        }
        self.last_refresh = Some(Instant::now());

        match self.opener.list() {
            Ok(devices) => {
                if devices != self.devices {
                    debug!("Camera list changed: {:?}", devices);
                }

                self.writer.set_cam_list(devices.iter().map(|d| d.name.clone()).collect());
                self.devices = devices;

                // Retry a failed selection now the list may have changed
                if self.active.is_none() {
                    self.handled_select = None;
                }
            },
            Err(e) => warn!("Could not list cameras: {}", e)
        }
    }

    /// Open, switch, or release the camera to match the operator's selection.
    fn apply_selection(&mut self, calib: &Calibration) {
        let select = self.ds.cam_select();

        if self.handled_select == Some(select) {
            return;
        }
        self.handled_select = Some(select);

        let index = match select {
            CamSelect::None => {
                if let Some(a) = self.active.take() {
                    info!("Camera {} released", a.index);
                }
                return;
            },
            CamSelect::Index(i) => i
        };

        if self.active_index() == Some(index) {
            return;
        }

        let device = match self.devices.get(index) {
            Some(d) => d.clone(),
            None => {
                warn!(
                    "Camera index {} out of range, {} cameras available",
                    index,
                    self.devices.len()
                );
                return;
            }
        };

        // The previous device must be closed before another is opened
        if let Some(a) = self.active.take() {
            debug!("Releasing camera {}", a.index);
        }

        match self.opener.open(&device, &CamSettings::from_calibration(calib)) {
            Ok(handle) => {
                info!("Camera {} ({}) opened", index, device.name);
                self.active = Some(ActiveCam { index, handle });
            },
            Err(e) => warn!("Could not open camera {} ({}): {}", index, device.name, e)
        }
    }

    /// Run detection on a frame and publish the results.
    fn process(&mut self, frame: RgbImage, calib: &Calibration) {
        let (width, height) = frame.dimensions();

        let (published, centroid) = match self.ds.mode() {
            ArmMode::Auto => {
                let bounds = HlsBounds::new(calib.hue, calib.lightness, calib.saturation);
                let det = vision::locate(&frame, &bounds, calib.min_contour_points);

                match calib.show_mask {
                    true => (det.masked, det.centroid),
                    false => (det.frame, det.centroid)
                }
            },
            ArmMode::Manual => (frame, None)
        };

        let display = centroid.and_then(|c| c.scale(
            (width, height),
            (calib.resolution_x, calib.resolution_y)
        ));
        trace!("Centroid {:?}, display {:?}", centroid, display);

        match encode_image_base64(&DynamicImage::ImageRgb8(published), calib.tm_image_format) {
            Ok(b64) => self.writer.set_cam_image(b64),
            Err(e) => warn!("Could not encode frame: {}", e)
        }

        self.writer.set_target(
            Target {
                centroid,
                frame_width: width,
                frame_height: height,
            },
            display
        );
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Flip a frame according to the calibration.
///
/// Flipping about both axes is a half turn.
pub fn orient(frame: RgbImage, calib: &Calibration) -> RgbImage {
    match (calib.flip_x_axis, calib.flip_y_axis) {
        (true, true) => imageops::rotate180(&frame),
        (true, false) => imageops::flip_vertical(&frame),
        (false, true) => imageops::flip_horizontal(&frame),
        (false, false) => frame
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::{calib::test::test_calibration, cam::CamError};
    use image::Rgb;
    use std::sync::Mutex;

    type Events = Arc<Mutex<Vec<String>>>;

    struct FakeOpener {
        devices: Vec<CamDevice>,
        events: Events,
    }

    struct FakeCam {
        path: String,
        events: Events,
        frame: RgbImage,
    }

    impl CamOpener for FakeOpener {
        fn list(&mut self) -> Result<Vec<CamDevice>, CamError> {
            Ok(self.devices.clone())
        }

        fn open(
            &mut self,
            device: &CamDevice,
            _: &CamSettings
        ) -> Result<Box<dyn CamHandle>, CamError> {
            self.events.lock().unwrap().push(format!("open {}", device.path()));

            // Green square in the top left quadrant
            let frame = RgbImage::from_fn(160, 120, |x, y| match (x, y) {
                (20..=59, 20..=59) => Rgb([0, 255, 0]),
                _ => Rgb([0, 0, 0]),
            });

            Ok(Box::new(FakeCam {
                path: device.path(),
                events: self.events.clone(),
                frame,
            }))
        }
    }

    impl CamHandle for FakeCam {
        fn capture(&mut self) -> Result<RgbImage, CamError> {
            Ok(self.frame.clone())
        }
    }

    impl Drop for FakeCam {
        fn drop(&mut self) {
            self.events.lock().unwrap().push(format!("close {}", self.path));
        }
    }

    fn setup() -> (CamAcq<FakeOpener>, DataStore, crate::data_store::OperatorWriter, Events) {
        let events = Events::default();
        let opener = FakeOpener {
            devices: vec![
                CamDevice { name: "Front".into(), driver_index: 0 },
                CamDevice { name: "Wrist".into(), driver_index: 2 },
            ],
            events: events.clone(),
        };

        let mut calib = test_calibration();
        calib.min_contour_points = 20;
        let calib = Arc::new(CalibStore::with_calibration("calibration.toml", calib));

        let (ds, writers) = DataStore::new();
        let acq = CamAcq::new(opener, ds.clone(), writers.vision, calib);

        (acq, ds, writers.operator, events)
    }

    #[test]
    fn test_switch_releases_first() {
        let (mut acq, ds, operator, events) = setup();

        assert!(acq.step());
        assert_eq!(acq.active_index(), Some(0));
        assert_eq!(ds.cam_list(), vec!["Front".to_string(), "Wrist".to_string()]);

        operator.set_cam_select(CamSelect::Index(1));
        assert!(acq.step());
        assert_eq!(acq.active_index(), Some(1));

        assert_eq!(
            *events.lock().unwrap(),
            vec!["open /dev/video0", "close /dev/video0", "open /dev/video2"]
        );
    }

    #[test]
    fn test_out_of_range_keeps_handle() {
        let (mut acq, _ds, operator, events) = setup();

        acq.step();
        operator.set_cam_select(CamSelect::Index(7));

        assert!(acq.step());
        assert!(acq.step());
        assert_eq!(acq.active_index(), Some(0));
        assert_eq!(*events.lock().unwrap(), vec!["open /dev/video0"]);
    }

    #[test]
    fn test_deselect_releases() {
        let (mut acq, _ds, operator, events) = setup();

        acq.step();
        operator.set_cam_select(CamSelect::None);

        assert!(!acq.step());
        assert_eq!(acq.active_index(), None);
        assert_eq!(*events.lock().unwrap(), vec!["open /dev/video0", "close /dev/video0"]);
    }

    #[test]
    fn test_detection_only_in_auto() {
        let (mut acq, ds, operator, _events) = setup();

        acq.step();
        assert_eq!(ds.target().centroid, None);
        assert!(!ds.cam_image().is_empty());

        operator.set_mode(ArmMode::Auto);
        acq.step();

        let target = ds.target();
        let c = target.centroid.expect("Target not found");
        assert!((c.x - 39).abs() <= 1 && (c.y - 39).abs() <= 1, "{:?}", c);
        assert_eq!((target.frame_width, target.frame_height), (160, 120));

        // Display resolution is 640x480, four times the frame
        let d = ds.display_centroid().unwrap();
        assert_eq!(d, c.scale((160, 120), (640, 480)).unwrap());
        assert!(d.x >= 152 && d.x <= 160);
    }

    #[test]
    fn test_orient() {
        let frame = RgbImage::from_fn(2, 2, |x, y| Rgb([x as u8, y as u8, 0]));
        let mut calib = test_calibration();

        assert_eq!(orient(frame.clone(), &calib), frame);

        calib.flip_x_axis = true;
        assert_eq!(orient(frame.clone(), &calib).get_pixel(0, 0), &Rgb([0, 1, 0]));

        calib.flip_y_axis = true;
        assert_eq!(orient(frame.clone(), &calib).get_pixel(0, 0), &Rgb([1, 1, 0]));

        calib.flip_x_axis = false;
        assert_eq!(orient(frame, &calib).get_pixel(0, 0), &Rgb([1, 0, 0]));
    }
}
