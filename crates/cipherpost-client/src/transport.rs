//! TCP relay transport.
//!
//! [`TcpRelay`] speaks the length-prefixed CBOR framing to a
//! `cipherpost-server`. One connection carries one exchange at a time;
//! concurrent callers queue on the connection lock.
//!
//! Connecting and each request/response exchange run under a deadline, so a
//! stalled relay holds the lock for at most that long.

use std::{future::Future, time::Duration};

use async_trait::async_trait;
use cipherpost_proto::{
    DEFAULT_MAX_FRAME_SIZE, Relay, Request, Response, TransportError, frame,
};
use tokio::{net::TcpStream, sync::Mutex};

use crate::DEFAULT_REQUEST_TIMEOUT;

/// Relay reached over TCP.
///
/// Connects on first use. Any failed or timed-out exchange drops the
/// connection so the next call dials again.
#[derive(Debug)]
pub struct TcpRelay {
    addr: String,
    max_frame_size: usize,
    request_timeout: Duration,
    stream: Mutex<Option<TcpStream>>,
}

impl TcpRelay {
    /// Relay at `addr` (e.g., "127.0.0.1:50051").
    pub fn new(addr: impl Into<String>) -> Self {
        Self::with_max_frame_size(addr, DEFAULT_MAX_FRAME_SIZE)
    }

    /// Relay at `addr` accepting replies up to `max_frame_size` bytes.
    pub fn with_max_frame_size(addr: impl Into<String>, max_frame_size: usize) -> Self {
        Self {
            addr: addr.into(),
            max_frame_size,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            stream: Mutex::new(None),
        }
    }

    /// Replace the per-connect and per-exchange deadline.
    #[must_use]
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Address this relay dials.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Deadline applied to each connect and each exchange.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

#[async_trait]
impl Relay for TcpRelay {
    async fn call(&self, request: Request) -> Result<Response, TransportError> {
        let mut guard = self.stream.lock().await;

        if guard.is_none() {
            let stream = deadline(self.request_timeout, async {
                TcpStream::connect(&self.addr).await.map_err(TransportError::Connect)
            })
            .await?;
            stream.set_nodelay(true)?;
            tracing::debug!(addr = %self.addr, "connected to relay");
            *guard = Some(stream);
        }
        let Some(stream) = guard.as_mut() else {
            return Err(TransportError::Closed);
        };

        let result =
            deadline(self.request_timeout, exchange(stream, &request, self.max_frame_size)).await;
        if let Err(e) = &result {
            tracing::debug!(addr = %self.addr, request = request.name(), "relay call failed: {}", e);
            *guard = None;
        }
        result
    }
}

/// Run `operation`, failing with [`TransportError::Timeout`] after `after`.
pub(crate) async fn deadline<T, F>(after: Duration, operation: F) -> Result<T, TransportError>
where
    F: Future<Output = Result<T, TransportError>>,
{
    tokio::time::timeout(after, operation)
        .await
        .unwrap_or(Err(TransportError::Timeout { after }))
}

async fn exchange(
    stream: &mut TcpStream,
    request: &Request,
    max_frame_size: usize,
) -> Result<Response, TransportError> {
    frame::write_frame(stream, request, max_frame_size).await?;
    frame::read_frame(stream, max_frame_size).await?.ok_or(TransportError::Closed)
}
