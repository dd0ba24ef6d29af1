//! # Arm library.
//!
//! This library allows other crates in the workspace, and the benchmarks, to access items defined
//! inside the arm crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Arm client - sends movement demands to the arm controller
pub mod arm_client;

/// Calibration - the tunable parameters of the executable, reloadable at runtime
pub mod calib;

/// Camera module - lists, opens and captures from cameras
pub mod cam;

/// Data store - the telemetry bus shared between all tasks
pub mod data_store;

/// Motion control - decides how the arm moves
pub mod motion_ctrl;

/// Position estimator - dead reckoning of the arm's axes
pub mod pos_est;

/// Telecommand server - recieves operator commands
pub mod tc_server;

/// Telemetry server - publishes the telemetry bus
pub mod tm_server;

/// Vision - locates the target in camera frames
pub mod vision;
