//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the arm software: the telemetry channels
//! published by the arm executable, the telecommands it accepts from operators, and the demands
//! sent to the arm's actuator controller.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod tc;

pub mod tm;

/// Command and response definitions for equipment (the arm controller and cameras)
pub mod eqpt;

/// Network module
pub mod net;
