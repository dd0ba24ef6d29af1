//! # Arm Client
//!
//! Sends [`ArmDems`] to the physical arm controller. Each demand is one HTTP POST to the
//! controller's endpoint, carrying the encoded axis fields as request headers. The call blocks
//! until the controller answers or the request times out.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::trace;
use reqwest::blocking::Client;
use std::time::Duration;

use comms_if::eqpt::arm::{ArmDems, USER_AGENT};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Body sent with every demand, the controller reads only the headers.
const REQUEST_BODY: &str = "{}";

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A way of delivering demands to the arm.
pub trait ArmTransport: Send {
    /// Deliver the demands, returning once the arm has confirmed them.
    fn send(
        &mut self,
        endpoint: &str,
        timeout: Duration,
        dems: &ArmDems
    ) -> Result<(), ArmClientError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// HTTP client for the arm controller.
pub struct ArmClient {
    client: Client,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ArmClientError {
    #[error("Could not build the HTTP client: {0}")]
    BuildError(reqwest::Error),

    #[error("Could not send demands to the arm: {0}")]
    TransportError(reqwest::Error),

    #[error("The arm rejected the demands with status {0}")]
    NonSuccess(u16),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ArmClient {
    pub fn new() -> Result<Self, ArmClientError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(ArmClientError::BuildError)?;

        Ok(Self { client })
    }
}

impl ArmTransport for ArmClient {
    fn send(
        &mut self,
        endpoint: &str,
        timeout: Duration,
        dems: &ArmDems
    ) -> Result<(), ArmClientError> {
        let fields = dems.encode();
        trace!("Sending {:?} to {}", fields, endpoint);

        let mut request = self.client
            .post(endpoint)
            .timeout(timeout)
            .body(REQUEST_BODY);

        for (name, value) in fields.headers().iter() {
            request = request.header(*name, value.as_str());
        }

        let response = request.send().map_err(ArmClientError::TransportError)?;

        match response.status() {
            s if s.is_success() => Ok(()),
            s => Err(ArmClientError::NonSuccess(s.as_u16()))
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use std::{
        io::{Read, Write},
        net::TcpListener,
        sync::{Arc, Mutex},
        thread,
    };
    use util::time::{Clock, SimClock};
    use comms_if::tc::ManualCmd;

    use crate::data_store::DataStore;

    /// Transport which records every demand along with the virtual time it was sent at.
    ///
    /// Each send advances the clock by `latency`. If a store is attached the pending manual
    /// command is also recorded at every send.
    #[derive(Clone)]
    pub(crate) struct RecordingTransport {
        clock: Arc<SimClock>,
        pub(crate) sent: Arc<Mutex<Vec<(Duration, ArmDems)>>>,
        pub(crate) pending_manual: Arc<Mutex<Vec<Option<ManualCmd>>>>,
        pub(crate) store: Option<DataStore>,
        latency: Arc<Mutex<Duration>>,
        pub(crate) fail: bool,
    }

    impl RecordingTransport {
        pub(crate) fn new(clock: Arc<SimClock>) -> Self {
            Self {
                clock,
                sent: Arc::new(Mutex::new(Vec::new())),
                pending_manual: Arc::new(Mutex::new(Vec::new())),
                store: None,
                latency: Arc::new(Mutex::new(Duration::from_millis(0))),
                fail: false,
            }
        }

        pub(crate) fn dems(&self) -> Vec<ArmDems> {
            self.sent.lock().unwrap().iter().map(|(_, d)| *d).collect()
        }

        pub(crate) fn times_ms(&self) -> Vec<u128> {
            self.sent.lock().unwrap().iter().map(|(t, _)| t.as_millis()).collect()
        }

        /// Set the latency of every clone of this transport.
        pub(crate) fn set_latency(&self, latency: Duration) {
            *self.latency.lock().unwrap() = latency;
        }

        pub(crate) fn clear(&self) {
            self.sent.lock().unwrap().clear();
            self.pending_manual.lock().unwrap().clear();
        }
    }

    impl ArmTransport for RecordingTransport {
        fn send(&mut self, _: &str, _: Duration, dems: &ArmDems) -> Result<(), ArmClientError> {
            self.sent.lock().unwrap().push((self.clock.now(), *dems));

            if let Some(ds) = &self.store {
                self.pending_manual.lock().unwrap().push(ds.manual_cmd());
            }

            self.clock.advance(*self.latency.lock().unwrap());

            match self.fail {
                true => Err(ArmClientError::NonSuccess(503)),
                false => Ok(())
            }
        }
    }

    /// Serve one request with the given status line, returning the raw request text.
    fn serve_once(status: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = format!("http://{}/", listener.local_addr().unwrap());

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];

            loop {
                let n = stream.read(&mut chunk).unwrap();
                buf.extend_from_slice(&chunk[..n]);

                let text = String::from_utf8_lossy(&buf);
                if let Some(pos) = text.find("\r\n\r\n") {
                    if buf.len() >= pos + 4 + REQUEST_BODY.len() {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }

            write!(
                stream,
                "HTTP/1.1 {}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
                status
            ).unwrap();

            String::from_utf8_lossy(&buf).to_lowercase()
        });

        (endpoint, handle)
    }

    #[test]
    fn test_send_headers() {
        let (endpoint, server) = serve_once("200 OK");
        let mut client = ArmClient::new().unwrap();

        client.send(
            &endpoint,
            Duration::from_secs(5),
            &ArmDems::new(5, 0, -3, true)
        ).unwrap();

        let request = server.join().unwrap();
        assert!(request.starts_with("post /"));
        for header in ["r1: 5", "r2: 0", "u1: 0", "u2: 0", "e1: 0", "e2: 3", "g1: 255"].iter() {
            assert!(request.contains(header), "missing {} in {}", header, request);
        }
        assert!(request.contains(&format!("user-agent: {}", USER_AGENT)));
        assert!(request.ends_with(REQUEST_BODY));
    }

    #[test]
    fn test_non_success() {
        let (endpoint, server) = serve_once("500 Internal Server Error");
        let mut client = ArmClient::new().unwrap();

        match client.send(&endpoint, Duration::from_secs(5), &ArmDems::stop()) {
            Err(ArmClientError::NonSuccess(500)) => (),
            r => panic!("Expected a non-success error, got {:?}", r)
        }

        server.join().unwrap();
    }

    #[test]
    fn test_transport_failure() {
        // Bind then drop to get a port nothing listens on
        let endpoint = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            format!("http://{}/", listener.local_addr().unwrap())
        };
        let mut client = ArmClient::new().unwrap();

        match client.send(&endpoint, Duration::from_secs(5), &ArmDems::stop()) {
            Err(ArmClientError::TransportError(_)) => (),
            r => panic!("Expected a transport error, got {:?}", r)
        }
    }
}
