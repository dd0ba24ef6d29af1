//! # TM Server
//!
//! Publishes every telemetry channel on a zmq PUB socket. Each channel is sent as its own text
//! message, `<prefix><content>`, so subscribers may filter on the prefix.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{info, warn};
use std::{sync::Arc, thread};

use comms_if::net::{zmq, MonitoredSocket, MonitoredSocketError, SocketOptions};

use crate::{calib::CalibStore, data_store::DataStore};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Telemetry server
pub struct TmServer {
    socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TmServerError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not send telemetry: {0}")]
    SendError(zmq::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TmServer {
    /// Create a new instance of the TM Server bound to `endpoint`.
    ///
    /// This function will not block until a subscriber connects.
    pub fn new(ctx: &zmq::Context, endpoint: &str) -> Result<Self, TmServerError> {
        let socket_options = SocketOptions {
            block_on_first_connect: false,
            bind: true,
            heartbeat_ivl: 500,
            heartbeat_ttl: 1000,
            heartbeat_timeout: 1000,
            linger: 1,
            send_timeout: 10,
            // Only the latest values matter, so don't build up a backlog for slow subscribers
            send_hwm: 64,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(ctx, zmq::PUB, socket_options, endpoint)
            .map_err(TmServerError::SocketError)?;

        Ok(Self { socket })
    }

    /// Publish the current value of every channel.
    pub fn send(&mut self, ds: &DataStore) -> Result<(), TmServerError> {
        for msg in ds.tm_messages() {
            self.socket.send(&msg.to_wire(), 0).map_err(TmServerError::SendError)?;
        }

        Ok(())
    }

    /// Publish forever, once every `tm_period_ms`.
    pub fn run(&mut self, ds: &DataStore, calib: &Arc<CalibStore>) {
        info!("Telemetry server started");

        let mut connected = false;

        loop {
            if self.socket.connected() != connected {
                connected = !connected;
                match connected {
                    true => info!("Telemetry subscriber connected"),
                    false => info!("Telemetry subscriber disconnected")
                }
            }

            if let Err(e) = self.send(ds) {
                warn!("{}", e);
            }

            thread::sleep(util::time::millis(calib.snapshot().tm_period_ms as i64));
        }
    }
}
