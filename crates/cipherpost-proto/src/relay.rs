//! Transport-agnostic relay contract.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{Request, Response, TransportError};

/// Anything that can answer directory/relay calls.
///
/// Each call is independently atomic; there are no multi-call transactions.
/// An `Err` means the call never got an answer (connectivity, framing). A
/// directory that answered "no" returns `Ok` with `success = false`.
#[async_trait]
pub trait Relay: Send + Sync {
    /// Perform one request/response exchange.
    async fn call(&self, request: Request) -> Result<Response, TransportError>;
}

#[async_trait]
impl<R: Relay + ?Sized> Relay for Arc<R> {
    async fn call(&self, request: Request) -> Result<Response, TransportError> {
        (**self).call(request).await
    }
}
