//! # Data Store
//!
//! The data store is the telemetry bus shared between the vision loop, the motion controller and
//! the network servers. It holds only the latest value of each [`TmChannel`].
//!
//! Every channel is locked on its own, so a single read or write is never torn, but nothing is
//! promised across channels: a reader may see a new camera image alongside an older centroid.
//! The centroid and the size of the frame it was found in are one value so that they always agree.
//!
//! Writes go through handles that are created exactly once, together with the store, in
//! [`DataStore::new`]. Each handle owns the channels of one producer:
//!
//! | Handle             | Channels                                            |
//! |--------------------|-----------------------------------------------------|
//! | [`VisionWriter`]   | camera image, camera list, target, display centroid |
//! | [`OperatorWriter`] | mode, camera selector, manual command               |
//! | [`CtrlWriter`]     | homing status, consumes the manual command          |

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, MutexGuard,
};

use comms_if::{
    tc::{ArmMode, CamSelect, ManualCmd},
    tm::{TmChannel, TmMessage, CAM_LIST_SEPARATOR, NOT_HOMING, NO_TARGET},
};

use crate::vision::Point;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Content of the homing channel while homing is in progress.
pub const HOMING: &str = "1";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Read handle to the telemetry bus.
///
/// Cloning the store gives another handle to the same channels.
#[derive(Clone)]
pub struct DataStore {
    channels: Arc<Channels>,
}

/// The latest detection result, in the pixel space of the frame it was found in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Target {
    /// Centroid of the target, `None` if no target was found.
    pub centroid: Option<Point>,

    /// Size of the frame the detection ran on.
    ///
    /// Units: pixels
    pub frame_width: u32,
    pub frame_height: u32,
}

/// Write handle for the camera acquisition loop.
pub struct VisionWriter {
    channels: Arc<Channels>,
}

/// Write handle for the telecommand server.
pub struct OperatorWriter {
    channels: Arc<Channels>,
}

/// Write handle for the motion controller.
pub struct CtrlWriter {
    channels: Arc<Channels>,
}

/// All write handles of one store.
pub struct Writers {
    pub vision: VisionWriter,
    pub operator: OperatorWriter,
    pub ctrl: CtrlWriter,
}

#[derive(Default)]
struct Channels {
    cam_image: Mutex<Arc<String>>,
    cam_list: Mutex<Vec<String>>,
    target: Mutex<Target>,
    display_centroid: Mutex<Option<Point>>,
    mode: Mutex<ArmMode>,
    cam_select: Mutex<CamSelect>,
    manual_cmd: Mutex<Option<ManualCmd>>,
    homing: AtomicBool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DataStore {
    /// Create a new bus with every channel at its default, along with its only write handles.
    ///
    /// The default mode is manual and the default camera is the first one.
    pub fn new() -> (Self, Writers) {
        let channels = Arc::new(Channels::default());

        let writers = Writers {
            vision: VisionWriter { channels: channels.clone() },
            operator: OperatorWriter { channels: channels.clone() },
            ctrl: CtrlWriter { channels: channels.clone() },
        };

        (Self { channels }, writers)
    }

    /// Base64 encoded camera frame, empty until the first frame is published.
    pub fn cam_image(&self) -> Arc<String> {
        lock(&self.channels.cam_image).clone()
    }

    pub fn cam_list(&self) -> Vec<String> {
        lock(&self.channels.cam_list).clone()
    }

    pub fn target(&self) -> Target {
        *lock(&self.channels.target)
    }

    /// Centroid scaled to the display resolution.
    pub fn display_centroid(&self) -> Option<Point> {
        *lock(&self.channels.display_centroid)
    }

    pub fn mode(&self) -> ArmMode {
        *lock(&self.channels.mode)
    }

    pub fn cam_select(&self) -> CamSelect {
        *lock(&self.channels.cam_select)
    }

    /// Pending manual command, without consuming it.
    pub fn manual_cmd(&self) -> Option<ManualCmd> {
        *lock(&self.channels.manual_cmd)
    }

    pub fn homing(&self) -> bool {
        self.channels.homing.load(Ordering::Acquire)
    }

    /// Render the current value of one channel.
    pub fn tm_message(&self, channel: TmChannel) -> TmMessage {
        let content = match channel {
            TmChannel::CamImage => self.cam_image().as_ref().clone(),
            TmChannel::CamList => self.cam_list().join(CAM_LIST_SEPARATOR),
            TmChannel::CentroidX => self.display_centroid()
                .map(|p| p.x)
                .unwrap_or(NO_TARGET)
                .to_string(),
            TmChannel::CentroidY => self.display_centroid()
                .map(|p| p.y)
                .unwrap_or(NO_TARGET)
                .to_string(),
            TmChannel::Mode => self.mode().to_wire().to_string(),
            TmChannel::CamSelect => self.cam_select().to_wire(),
            TmChannel::ManualCmd => self.manual_cmd()
                .map(|c| c.to_string())
                .unwrap_or_default(),
            TmChannel::Homing => match self.homing() {
                true => HOMING.to_string(),
                false => NOT_HOMING.to_string()
            },
        };

        TmMessage::new(channel, content)
    }

    /// Render every channel, in publishing order.
    pub fn tm_messages(&self) -> Vec<TmMessage> {
        TmChannel::ALL.iter().map(|c| self.tm_message(*c)).collect()
    }
}

impl VisionWriter {
    pub fn set_cam_image(&self, b64: String) {
        *lock(&self.channels.cam_image) = Arc::new(b64);
    }

    pub fn set_cam_list(&self, names: Vec<String>) {
        *lock(&self.channels.cam_list) = names;
    }

    /// Publish a detection result along with its display-scaled centroid.
    pub fn set_target(&self, target: Target, display_centroid: Option<Point>) {
        *lock(&self.channels.target) = target;
        *lock(&self.channels.display_centroid) = display_centroid;
    }
}

impl OperatorWriter {
    pub fn set_mode(&self, mode: ArmMode) {
        *lock(&self.channels.mode) = mode;
    }

    pub fn set_cam_select(&self, cam: CamSelect) {
        *lock(&self.channels.cam_select) = cam;
    }

    /// Queue a manual command, replacing any command not yet consumed.
    pub fn set_manual_cmd(&self, cmd: ManualCmd) {
        *lock(&self.channels.manual_cmd) = Some(cmd);
    }
}

impl CtrlWriter {
    pub fn set_homing(&self, homing: bool) {
        self.channels.homing.store(homing, Ordering::Release);
    }

    /// Read and clear the pending manual command in one step.
    pub fn take_manual_cmd(&self) -> Option<ManualCmd> {
        lock(&self.channels.manual_cmd).take()
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Lock a channel, ignoring poisoning as every write is a single assignment.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
