//! Client error types.

use cipherpost_core::KeyStoreError;
use cipherpost_crypto::CryptoError;
use cipherpost_proto::TransportError;
use thiserror::Error;

/// Errors from client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Key derivation, encryption or decryption failed.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Local key store lookup failed.
    #[error("key store error: {0}")]
    KeyStore(#[from] KeyStoreError),

    /// The relay call never got an answer.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The directory answered the call with `success = false`.
    #[error("rejected by directory: {message}")]
    Rejected {
        /// Directory's explanation.
        message: String,
    },

    /// Key bytes held for a user are not valid UTF-8 text.
    #[error("key for {user_id} is not valid text")]
    MalformedKey {
        /// Key owner.
        user_id: String,
    },
}

impl ClientError {
    /// Returns true if retrying the same call later may succeed.
    ///
    /// Only transport failures qualify. Rejections, key problems and crypto
    /// failures repeat identically until the caller changes something.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Crypto(_) | Self::KeyStore(_) | Self::Rejected { .. } | Self::MalformedKey { .. } => {
                false
            },
        }
    }
}
