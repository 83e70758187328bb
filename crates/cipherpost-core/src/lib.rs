//! Cipherpost core abstractions.
//!
//! - [`env`]: time and sleeping behind a trait, so the directory's timestamps
//!   and the client's poll interval can be driven by tests
//! - [`keystore`]: the [`KeyStore`] capability and its two variants
//!
//! # Key Custody
//!
//! ```text
//!  ClientKeyStore                 DirectoryKeyStore
//!  ├─ private keys (per algo)     ├─ private keys: OperationNotSupported
//!  └─ public keys (user, algo)    └─ public keys (user, algo)
//! ```
//!
//! Private material only ever lives in a `ClientKeyStore`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod env;
mod error;
pub mod keystore;

pub use cipherpost_proto::Algorithm;
pub use error::KeyStoreError;
pub use keystore::{ClientKeyStore, DirectoryKeyStore, KeyStore};
