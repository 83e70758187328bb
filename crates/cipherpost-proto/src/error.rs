//! Protocol error types.

use thiserror::Error;

/// Errors from encoding or decoding frames.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Frame exceeds the configured maximum.
    #[error("frame too large: {size} bytes (max {max})")]
    TooLarge {
        /// Declared or encoded body size.
        size: usize,
        /// Configured limit.
        max: usize,
    },

    /// Buffer ended before the declared body.
    #[error("truncated frame: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Bytes the header promised.
        expected: usize,
        /// Bytes available.
        actual: usize,
    },

    /// CBOR body could not be encoded.
    #[error("encode error: {reason}")]
    Encode {
        /// Serializer message.
        reason: String,
    },

    /// CBOR body could not be decoded.
    #[error("decode error: {reason}")]
    Decode {
        /// Deserializer message.
        reason: String,
    },

    /// Algorithm tag is not one of the literal strings.
    #[error("unknown algorithm: {tag:?}")]
    UnknownAlgorithm {
        /// The rejected tag.
        tag: String,
    },
}

/// Hard failures talking to a relay.
///
/// Domain failures (unknown user, duplicate registration) are not transport
/// errors; they arrive as `success = false` replies.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Could not reach the relay.
    #[error("connection failed: {0}")]
    Connect(#[source] std::io::Error),

    /// Stream failed mid-exchange.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Peer sent an undecodable or oversized frame.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Peer closed the stream before replying.
    #[error("connection closed by peer")]
    Closed,

    /// No answer within the request deadline.
    #[error("no response within {}ms", .after.as_millis())]
    Timeout {
        /// Deadline that elapsed.
        after: std::time::Duration,
    },

    /// Reply does not match the request that was sent.
    #[error("unexpected response to {request}")]
    UnexpectedResponse {
        /// Name of the request.
        request: &'static str,
    },
}
