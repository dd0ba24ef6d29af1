//! # TC Server
//!
//! Receives operator telecommands on a zmq REP socket. Every request is validated before being
//! written to the telemetry bus and answered with a JSON [`TcResponse`]. Invalid requests leave
//! the bus untouched.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, info, warn};

use comms_if::{
    net::{zmq, MonitoredSocket, MonitoredSocketError, SocketOptions},
    tc::{Tc, TcResponse},
};

use crate::data_store::OperatorWriter;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Telecommand server
pub struct TcServer {
    socket: MonitoredSocket,
    writer: OperatorWriter,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TcServerError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not recieve a message from the client: {0}")]
    RecvError(zmq::Error),

    #[error("Could not send the response: {0}")]
    SendError(zmq::Error),

    #[error("Could not serialize the response: {0}")]
    SerializationError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TcServer {
    /// Create a new instance of the TC Server bound to `endpoint`.
    ///
    /// This function will not block until a client connects.
    pub fn new(
        ctx: &zmq::Context,
        endpoint: &str,
        writer: OperatorWriter
    ) -> Result<Self, TcServerError> {
        let socket_options = SocketOptions {
            block_on_first_connect: false,
            bind: true,
            heartbeat_ivl: 500,
            heartbeat_ttl: 1000,
            heartbeat_timeout: 1000,
            linger: 1,
            recv_timeout: 100,
            send_timeout: 100,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(ctx, zmq::REP, socket_options, endpoint)
            .map_err(TcServerError::SocketError)?;

        Ok(Self { socket, writer })
    }

    /// Serve telecommands forever.
    pub fn run(&mut self) {
        info!("Telecommand server started");

        loop {
            if let Err(e) = self.serve_one() {
                warn!("{}", e);
            }
        }
    }

    /// Handle at most one telecommand.
    ///
    /// Returns the response sent, or `None` if no request arrived before the receive timeout.
    pub fn serve_one(&mut self) -> Result<Option<TcResponse>, TcServerError> {
        let response = match self.socket.recv_string(0) {
            Ok(Ok(s)) => apply(&s, &self.writer),
            Ok(Err(_)) => {
                warn!("Telecommand is not valid UTF-8");
                TcResponse::Invalid
            },
            Err(zmq::Error::EAGAIN) => return Ok(None),
            Err(e) => return Err(TcServerError::RecvError(e))
        };

        let response_str = serde_json::to_string(&response)
            .map_err(TcServerError::SerializationError)?;

        self.socket.send(&response_str, 0)
            .map_err(TcServerError::SendError)?;

        Ok(Some(response))
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Validate a telecommand and write it to the bus.
pub fn apply(msg: &str, writer: &OperatorWriter) -> TcResponse {
    let tc = match Tc::parse(msg) {
        Ok(t) => t,
        Err(e) => {
            warn!("Rejected telecommand: {}", e);
            return TcResponse::Invalid;
        }
    };

    debug!("Telecommand: {:?}", tc);

    match tc {
        Tc::SelectCamera(c) => writer.set_cam_select(c),
        Tc::SetMode(m) => writer.set_mode(m),
        Tc::Manual(c) => writer.set_manual_cmd(c),
    }

    TcResponse::Ok
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
