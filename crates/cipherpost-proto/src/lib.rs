//! Cipherpost wire protocol.
//!
//! Defines the directory/relay call surface independent of any transport:
//!
//! - [`Request`] / [`Response`]: the six relay calls and their replies
//! - [`Relay`]: anything that can answer a [`Request`] (in-process directory,
//!   TCP connection, test double)
//! - [`frame`]: length-prefixed CBOR framing for byte-stream transports
//!
//! # Wire Format
//!
//! ```text
//! +----------------+-----------------------------+
//! | length (u32 BE)| CBOR-encoded Request/Response|
//! +----------------+-----------------------------+
//! ```
//!
//! Algorithm tags serialize as the literal strings `"RSA"` and `"ElGamal"`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod algorithm;
mod error;
pub mod frame;
mod messages;
mod relay;

pub use algorithm::Algorithm;
pub use error::{FrameError, TransportError};
pub use frame::{DEFAULT_MAX_FRAME_SIZE, LENGTH_PREFIX_SIZE};
pub use messages::{Envelope, PublicKeyReply, Request, Response, StatusReply, UserSummary};
pub use relay::Relay;
