//! # Calibration
//!
//! All tunable parameters of the arm executable live in a single [`Calibration`] document. The
//! [`CalibStore`] owns the active calibration and can replace it while the executable is running
//! when live reload is enabled.
//!
//! Consumers never hold on to the store's contents between cycles. Each loop takes one
//! [`CalibStore::snapshot`] at the start of its cycle and uses it for the whole cycle, so a reload
//! landing mid-cycle only takes effect from the next cycle.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, RwLock,
    },
};
use util::{params::{self, LoadError}, time::{self, Clock}};

use comms_if::eqpt::cam::ImageFormat;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the whole arm executable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Calibration {
    // ---- IMAGE ----

    /// Resolution in which centroids are published.
    ///
    /// Units: pixels
    pub resolution_x: u32,
    pub resolution_y: u32,

    /// Flip frames about the x axis (upside down).
    pub flip_x_axis: bool,

    /// Flip frames about the y axis (mirror).
    pub flip_y_axis: bool,

    /// Format of the frames published on the image channel.
    #[serde(default)]
    pub tm_image_format: ImageFormat,

    // ---- DETECTION ----

    /// Accepted hue range.
    ///
    /// Units: degrees, 0-360
    pub hue: [f64; 2],

    /// Accepted saturation range.
    ///
    /// Units: percent
    pub saturation: [f64; 2],

    /// Accepted lightness range.
    ///
    /// Units: percent
    pub lightness: [f64; 2],

    /// Smallest number of boundary points a contour needs to count as a target.
    #[serde(default = "default_min_contour_points")]
    pub min_contour_points: usize,

    /// Publish the masked working frame rather than the annotated camera frame.
    #[serde(default)]
    pub show_mask: bool,

    // ---- SENSITIVITY ----

    /// Offset of the pick-up point from the frame centre.
    ///
    /// Units: pixels
    pub center_offset_x: i32,
    pub center_offset_y: i32,

    /// Distance from the pick-up point within which a target is grabbed.
    ///
    /// Units: pixels
    pub max_deviation: f64,

    // ---- NETWORKING ----

    /// URL of the arm controller.
    pub arm_endpoint: String,

    /// Timeout of a single request to the arm controller.
    ///
    /// Units: milliseconds
    #[serde(default = "default_arm_timeout_ms")]
    pub arm_timeout_ms: u64,

    /// zmq endpoint the telemetry server binds to.
    pub tm_endpoint: String,

    /// zmq endpoint the telecommand server binds to.
    pub tc_endpoint: String,

    /// Interval between telemetry publications.
    ///
    /// Units: milliseconds
    #[serde(default = "default_tm_period_ms")]
    pub tm_period_ms: u64,

    // ---- RELOAD ----

    /// Reload the calibration file periodically.
    pub live_reload: bool,

    /// Units: milliseconds
    pub reload_interval_ms: u64,

    // ---- SPEEDS ----

    pub rotation_speed: i32,
    pub lift_speed: i32,
    pub extension_speed: i32,

    // ---- LIMITS ----

    /// Accumulated rotation beyond which the arm unwinds, zero or less disables the check.
    ///
    /// Units: milliseconds
    pub rotation_limit_ms: i64,

    /// Time taken for one full revolution at `rotation_speed`.
    ///
    /// Units: milliseconds
    pub rotation_revolution_ms: i64,

    /// Time taken to travel the full lift range at `lift_speed`.
    ///
    /// Units: milliseconds
    pub lift_limit_ms: i64,

    /// Time taken to travel the full extension range at `extension_speed`.
    ///
    /// Units: milliseconds
    pub extension_limit_ms: i64,

    /// Duration of a single manual jog.
    ///
    /// Units: milliseconds
    pub manual_interval_ms: u64,

    // ---- CAMERA ----

    #[serde(default = "default_camera_fps")]
    pub camera_fps: u32,

    #[serde(default = "default_camera_width")]
    pub camera_width: u32,

    #[serde(default = "default_camera_height")]
    pub camera_height: u32,
}

/// Owner of the active calibration.
#[derive(Debug)]
pub struct CalibStore {
    path: PathBuf,
    current: RwLock<Arc<Calibration>>,
    version: AtomicU64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CalibError {
    #[error("Could not load the calibration file: {0}")]
    LoadError(LoadError),

    #[error("Invalid calibration: {0}")]
    Invalid(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Calibration {
    /// Load and validate a calibration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CalibError> {
        let calib: Self = params::load_path(path).map_err(CalibError::LoadError)?;
        calib.validate()?;
        Ok(calib)
    }

    /// Parse and validate a calibration document.
    pub fn parse(s: &str) -> Result<Self, CalibError> {
        let calib: Self = params::parse(s).map_err(CalibError::LoadError)?;
        calib.validate()?;
        Ok(calib)
    }

    /// Check the values which would otherwise break the controller at runtime.
    pub fn validate(&self) -> Result<(), CalibError> {
        if self.rotation_revolution_ms <= 0 {
            return Err(CalibError::Invalid(format!(
                "rotation_revolution_ms must be positive, found {}",
                self.rotation_revolution_ms
            )));
        }

        for (name, limit) in [
            ("lift_limit_ms", self.lift_limit_ms),
            ("extension_limit_ms", self.extension_limit_ms),
        ].iter() {
            if *limit < 0 {
                return Err(CalibError::Invalid(format!(
                    "{} must not be negative, found {}", name, limit
                )));
            }
        }

        for (name, range) in [
            ("hue", self.hue),
            ("saturation", self.saturation),
            ("lightness", self.lightness),
        ].iter() {
            if range[0] > range[1] {
                return Err(CalibError::Invalid(format!(
                    "{} range is inverted: [{}, {}]", name, range[0], range[1]
                )));
            }
        }

        if self.camera_fps == 0 || self.camera_width == 0 || self.camera_height == 0 {
            return Err(CalibError::Invalid(format!(
                "camera settings must be non-zero, found {} fps at {}x{}",
                self.camera_fps, self.camera_width, self.camera_height
            )));
        }

        if self.max_deviation < 0.0 {
            return Err(CalibError::Invalid(format!(
                "max_deviation must not be negative, found {}", self.max_deviation
            )));
        }

        Ok(())
    }
}

impl CalibStore {
    /// Load the calibration at `path` for the first time.
    ///
    /// Failure here is fatal to the executable, as nothing can run without a calibration.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CalibError> {
        let calib = Calibration::load(path.as_ref())?;

        Ok(Self::with_calibration(path, calib))
    }

    /// Create a store with an already loaded calibration, later reloads read from `path`.
    pub fn with_calibration<P: AsRef<Path>>(path: P, calib: Calibration) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            current: RwLock::new(Arc::new(calib)),
            version: AtomicU64::new(1),
        }
    }

    /// Get the current calibration.
    ///
    /// The returned snapshot never changes, later reloads swap in a new snapshot instead.
    pub fn snapshot(&self) -> Arc<Calibration> {
        match self.current.read() {
            Ok(c) => c.clone(),
            Err(e) => e.into_inner().clone(),
        }
    }

    /// Version of the current calibration, incremented on every swap.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Replace the current calibration, returning the new version.
    pub fn swap(&self, calib: Calibration) -> u64 {
        let mut current = match self.current.write() {
            Ok(c) => c,
            Err(e) => e.into_inner(),
        };
        *current = Arc::new(calib);

        self.version.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Reload the calibration file.
    ///
    /// On error the current calibration is kept.
    pub fn reload(&self) -> Result<u64, CalibError> {
        let calib = Calibration::load(&self.path)?;
        Ok(self.swap(calib))
    }

    /// Calibration reload loop.
    ///
    /// While the current calibration has `live_reload` set the file is reloaded every
    /// `reload_interval_ms`, waiting on `clock`. Once it is unset the loop returns.
    pub fn watch(&self, clock: &dyn Clock) {
        loop {
            let calib = self.snapshot();

            if !calib.live_reload {
                info!("Calibration loaded in non-live mode (version {})", self.version());
                break;
            }

            clock.sleep(time::millis(calib.reload_interval_ms as i64));

            match self.reload() {
                Ok(v) => debug!("Calibration reloaded, now version {}", v),
                Err(e) => warn!(
                    "Calibration reload failed, keeping version {}: {}",
                    self.version(),
                    e
                ),
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn default_min_contour_points() -> usize {
    100
}

fn default_arm_timeout_ms() -> u64 {
    1000
}

fn default_tm_period_ms() -> u64 {
    40
}

fn default_camera_fps() -> u32 {
    60
}

fn default_camera_width() -> u32 {
    640
}

fn default_camera_height() -> u32 {
    480
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use std::{collections::VecDeque, sync::Mutex};
    use util::time::SimClock;

    /// A complete calibration document used throughout the crate's tests.
    pub(crate) const TEST_CALIBRATION: &str = r#"
        resolution_x = 640
        resolution_y = 480
        flip_x_axis = false
        flip_y_axis = false

        hue = [100.0, 140.0]
        saturation = [50.0, 100.0]
        lightness = [20.0, 80.0]
        min_contour_points = 20

        center_offset_x = 0
        center_offset_y = 0
        max_deviation = 10.0

        arm_endpoint = "http://127.0.0.1:9/"
        tm_endpoint = "tcp://*:5020"
        tc_endpoint = "tcp://*:5021"

        live_reload = false
        reload_interval_ms = 1000

        rotation_speed = 100
        lift_speed = 120
        extension_speed = 80

        rotation_limit_ms = 0
        rotation_revolution_ms = 4000
        lift_limit_ms = 1000
        extension_limit_ms = 800
        manual_interval_ms = 200
    "#;

    pub(crate) fn test_calibration() -> Calibration {
        Calibration::parse(TEST_CALIBRATION).unwrap()
    }

    #[test]
    fn test_parse_defaults() {
        let calib = test_calibration();

        assert_eq!(calib.min_contour_points, 20);
        assert_eq!(calib.camera_fps, 60);
        assert_eq!(calib.tm_image_format, ImageFormat::Png);
        assert!(!calib.show_mask);
        assert_eq!(calib.extension_limit_ms, 800);
    }

    #[test]
    fn test_validate() {
        let mut calib = test_calibration();
        calib.rotation_revolution_ms = 0;
        assert!(matches!(calib.validate(), Err(CalibError::Invalid(_))));

        let mut calib = test_calibration();
        calib.hue = [140.0, 100.0];
        assert!(matches!(calib.validate(), Err(CalibError::Invalid(_))));

        let mut calib = test_calibration();
        calib.camera_fps = 0;
        assert!(matches!(calib.validate(), Err(CalibError::Invalid(_))));

        assert!(matches!(
            Calibration::parse(&TEST_CALIBRATION.replace(
                "manual_interval_ms = 200",
                "manual_interval_ms = 200\ncamera_height = 0"
            )),
            Err(CalibError::Invalid(_))
        ));

        assert!(matches!(
            Calibration::parse("resolution_x = 3"),
            Err(CalibError::LoadError(_))
        ));
    }

    #[test]
    fn test_shipped_calibration() {
        let calib = Calibration::parse(include_str!("../../params/calibration.toml")).unwrap();

        assert_eq!(calib.tm_image_format, ImageFormat::Jpeg(80));
        assert!(calib.live_reload);
    }

    #[test]
    fn test_snapshot_swap() {
        let store = CalibStore::with_calibration("calibration.toml", test_calibration());
        assert_eq!(store.version(), 1);

        let before = store.snapshot();

        let mut next = test_calibration();
        next.rotation_speed = 5;
        assert_eq!(store.swap(next), 2);

        // Snapshots taken before the swap are untouched
        assert_eq!(before.rotation_speed, 100);
        assert_eq!(store.snapshot().rotation_speed, 5);
    }

    #[test]
    fn test_failed_reload_keeps_calibration() {
        let path = std::env::temp_dir().join("arm_exec_calib_test_missing.toml");
        let store = CalibStore::with_calibration(&path, test_calibration());

        assert!(store.reload().is_err());
        assert_eq!(store.version(), 1);
        assert_eq!(store.snapshot().rotation_speed, 100);
    }

    #[test]
    fn test_reload_from_file() {
        let path = std::env::temp_dir().join(format!(
            "arm_exec_calib_test_{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, TEST_CALIBRATION.replace("lift_speed = 120", "lift_speed = 7"))
            .unwrap();

        let store = CalibStore::with_calibration(&path, test_calibration());
        assert_eq!(store.reload().unwrap(), 2);
        assert_eq!(store.snapshot().lift_speed, 7);

        std::fs::remove_file(&path).ok();
    }

    /// Clock which applies the next edit to the calibration file every time it is slept on.
    ///
    /// `None` removes the file.
    struct EditingClock {
        inner: SimClock,
        path: PathBuf,
        edits: Mutex<VecDeque<Option<String>>>,
    }

    impl Clock for EditingClock {
        fn now(&self) -> std::time::Duration {
            self.inner.now()
        }

        fn sleep(&self, duration: std::time::Duration) {
            self.inner.sleep(duration);

            match self.edits.lock().unwrap().pop_front() {
                Some(Some(contents)) => std::fs::write(&self.path, contents).unwrap(),
                Some(None) => {
                    std::fs::remove_file(&self.path).ok();
                },
                None => panic!("Reloaded more often than expected"),
            }
        }
    }

    fn live_calibration(interval_ms: u64) -> String {
        TEST_CALIBRATION
            .replace("live_reload = false", "live_reload = true")
            .replace("reload_interval_ms = 1000", &format!("reload_interval_ms = {}", interval_ms))
    }

    #[test]
    fn test_watch_not_live() {
        let clock = SimClock::new();
        let store = CalibStore::with_calibration("calibration.toml", test_calibration());

        store.watch(&clock);

        assert_eq!(store.version(), 1);
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn test_watch_live() {
        let path = std::env::temp_dir().join(format!(
            "arm_exec_calib_watch_{}.toml",
            std::process::id()
        ));

        let clock = EditingClock {
            inner: SimClock::new(),
            path: path.clone(),
            edits: Mutex::new(vec![
                // Unreadable, then missing, both keep the current version
                Some("live_reload = [".to_string()),
                None,
                Some(live_calibration(500)),
                Some(TEST_CALIBRATION.to_string()),
            ].into()),
        };

        let store = CalibStore::with_calibration(
            &path,
            Calibration::parse(&live_calibration(1000)).unwrap()
        );

        store.watch(&clock);

        assert_eq!(store.version(), 3);
        assert!(!store.snapshot().live_reload);
        assert!(clock.edits.lock().unwrap().is_empty());
        assert_eq!(
            clock.inner.sleeps(),
            vec![
                std::time::Duration::from_millis(1000),
                std::time::Duration::from_millis(1000),
                std::time::Duration::from_millis(1000),
                std::time::Duration::from_millis(500),
            ]
        );

        std::fs::remove_file(&path).ok();
    }
}
