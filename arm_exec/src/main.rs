//! Main arm executable entry point.
//!
//! # Architecture
//!
//! The executable runs a fixed set of tasks, each on its own thread:
//!
//!     - Camera acquisition: captures frames, locates the target and publishes both
//!     - Calibration reload: replaces the calibration when the file changes, if enabled
//!     - Motion control: homes the arm, then runs autonomous or manual operation
//!     - Telemetry server: publishes the telemetry bus
//!     - Telecommand server: writes operator commands into the telemetry bus
//!
//! The tasks share only the telemetry bus and the calibration store.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::{eyre, WrapErr}, Report};
use log::{info, warn};
use std::{path::PathBuf, sync::Arc, thread};
use structopt::StructOpt;

// Internal
use arm_lib::{
    arm_client::ArmClient,
    calib::CalibStore,
    cam::{acq::CamAcq, v4l::V4lOpener},
    data_store::DataStore,
    motion_ctrl::MotionCtrl,
    pos_est::DeadReckoning,
    tc_server::TcServer,
    tm_server::TmServer,
};
use comms_if::net::zmq;
use util::{
    logger::{logger_init, LevelFilter},
    session::Session,
    time::SystemClock,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Calibration file, relative to the parameters directory.
const CALIBRATION_FILE: &str = "calibration.toml";

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Camera guided arm control.
#[derive(Debug, StructOpt)]
#[structopt(name = "arm_exec")]
struct Opt {
    /// Path to the calibration file, by default `$ARM_SW_ROOT/params/calibration.toml`
    #[structopt(long, parse(from_os_str))]
    calib: Option<PathBuf>,

    /// Lowest level of log messages recorded, one of info, debug, or trace
    #[structopt(long, default_value = "debug")]
    log_level: LevelFilter,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new(
        "arm_exec",
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(opt.log_level, &session)
        .wrap_err("Failed to initialise logging")?;

    info!("Arm Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD CALIBRATION ----

    let calib_path = match opt.calib {
        Some(p) => p,
        None => util::params::param_file_path(CALIBRATION_FILE)
            .wrap_err("Could not locate the calibration file")?
    };

    let calib_store = Arc::new(
        CalibStore::load(&calib_path)
            .wrap_err_with(|| format!("Could not load the calibration from {:?}", calib_path))?
    );
    let calib = calib_store.snapshot();

    info!("Calibration loaded from {:?}", calib_path);

    // ---- INITIALISE NETWORK ----

    let (ds, writers) = DataStore::new();
    let zmq_ctx = zmq::Context::new();

    let mut tm_server = TmServer::new(&zmq_ctx, &calib.tm_endpoint)
        .wrap_err("Failed to initialise the TM server")?;
    info!("TmServer bound to {}", calib.tm_endpoint);

    let mut tc_server = TcServer::new(&zmq_ctx, &calib.tc_endpoint, writers.operator)
        .wrap_err("Failed to initialise the TC server")?;
    info!("TcServer bound to {}", calib.tc_endpoint);

    // ---- INITIALISE MOTION CONTROL ----

    let arm_client = ArmClient::new()
        .wrap_err("Failed to initialise the arm client")?;

    let mut motion_ctrl = MotionCtrl::new(
        Box::new(arm_client),
        Box::new(DeadReckoning::new()),
        Arc::new(SystemClock::new()),
        ds.clone(),
        writers.ctrl,
        calib_store.clone(),
    );

    info!("Initialisation complete\n");

    // ---- START TASKS ----

    let mut handles = Vec::new();

    let store = calib_store.clone();
    handles.push(("calibration reload", spawn("calib", move || {
        store.watch(&SystemClock::new())
    })?));

    let acq_ds = ds.clone();
    let acq_store = calib_store.clone();
    let vision = writers.vision;
    handles.push(("camera acquisition", spawn("cam_acq", move || {
        CamAcq::new(V4lOpener, acq_ds, vision, acq_store).run()
    })?));

    handles.push(("motion control", spawn("motion_ctrl", move || motion_ctrl.run())?));

    let tm_ds = ds.clone();
    let tm_store = calib_store.clone();
    handles.push(("telemetry server", spawn("tm_server", move || tm_server.run(&tm_ds, &tm_store))?));

    handles.push(("telecommand server", spawn("tc_server", move || tc_server.run())?));

    // ---- WAIT ----

    // Only the calibration reload task is expected to finish
    for (name, handle) in handles {
        match handle.join() {
            Ok(()) if name == "calibration reload" => continue,
            Ok(()) => warn!("The {} task stopped", name),
            Err(_) => return Err(eyre!("The {} task panicked", name))
        }
    }

    Ok(())
}

/// Spawn a named task thread.
fn spawn<F>(name: &str, f: F) -> Result<thread::JoinHandle<()>, Report>
where
    F: FnOnce() + Send + 'static
{
    thread::Builder::new()
        .name(name.into())
        .spawn(f)
        .wrap_err_with(|| format!("Failed to start the {} thread", name))
}
