//! Relay over turmoil's simulated TCP.

use std::time::Duration;

use async_trait::async_trait;
use cipherpost_proto::{
    DEFAULT_MAX_FRAME_SIZE, Relay, Request, Response, TransportError, frame,
};
use tokio::sync::Mutex;
use turmoil::net::TcpStream;

use crate::DIRECTORY_PORT;

/// Deadline for one simulated connect or exchange, in virtual time.
pub const SIM_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Relay reaching a simulated directory host by name.
///
/// Connects on first use and redials after any failed or timed-out exchange.
pub struct SimRelay {
    host: String,
    request_timeout: Duration,
    stream: Mutex<Option<TcpStream>>,
}

impl SimRelay {
    /// Relay to the directory running on `host`.
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into(), request_timeout: SIM_REQUEST_TIMEOUT, stream: Mutex::new(None) }
    }

    /// Replace the per-connect and per-exchange deadline.
    #[must_use]
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }
}

#[async_trait]
impl Relay for SimRelay {
    async fn call(&self, request: Request) -> Result<Response, TransportError> {
        let after = self.request_timeout;
        let mut guard = self.stream.lock().await;

        if guard.is_none() {
            let connect = TcpStream::connect((self.host.as_str(), DIRECTORY_PORT));
            let stream = match tokio::time::timeout(after, connect).await {
                Ok(stream) => stream.map_err(TransportError::Connect)?,
                Err(_) => return Err(TransportError::Timeout { after }),
            };
            *guard = Some(stream);
        }
        let Some(stream) = guard.as_mut() else {
            return Err(TransportError::Closed);
        };

        let result = tokio::time::timeout(after, exchange(stream, &request))
            .await
            .unwrap_or(Err(TransportError::Timeout { after }));
        if result.is_err() {
            *guard = None;
        }
        result
    }
}

async fn exchange(stream: &mut TcpStream, request: &Request) -> Result<Response, TransportError> {
    frame::write_frame(stream, request, DEFAULT_MAX_FRAME_SIZE).await?;
    frame::read_frame(stream, DEFAULT_MAX_FRAME_SIZE).await?.ok_or(TransportError::Closed)
}
