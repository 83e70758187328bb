//! Cipherpost client.
//!
//! Everything a participant needs on top of a [`Relay`](cipherpost_proto::Relay):
//!
//! - [`RsaProvider`] / [`ElGamalProvider`]: derive the local key pair from
//!   caller-supplied decimal parameters and encrypt/decrypt with keys held in
//!   a [`KeyStore`](cipherpost_core::KeyStore)
//! - [`Client`]: registration, key publication, cached key lookup, send,
//!   single-shot mailbox poll
//! - [`Poller`]: background task draining the mailbox on an interval
//! - [`TcpRelay`]: the relay over TCP
//!
//! # Example
//!
//! ```no_run
//! # async fn demo() -> Result<(), cipherpost_client::ClientError> {
//! use cipherpost_client::{Client, ClientConfig, Encryption, TcpRelay};
//!
//! let bob = Client::connect("bob", "127.0.0.1:50051", ClientConfig::default());
//! bob.register("Bob").await?;
//! bob.send_message("alice", b"HI", &Encryption::Rsa).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod config;
mod error;
mod poller;
pub mod provider;
mod transport;

pub use client::{Client, DeliveredMessage, Encryption};
pub use config::{
    ClientConfig, DEFAULT_POLL_INTERVAL, DEFAULT_REQUEST_TIMEOUT, DEFAULT_SUGGESTION_COUNT,
};
pub use error::ClientError;
pub use poller::{DELIVERY_CHANNEL_CAPACITY, Poller};
pub use provider::{ElGamalProvider, RsaProvider};
pub use transport::TcpRelay;
