//! Key store error types.

use thiserror::Error;

use crate::Algorithm;

/// Errors from [`KeyStore`](crate::KeyStore) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyStoreError {
    /// No public key stored for this user and algorithm.
    #[error("no {algorithm} public key found for user {user_id}")]
    PublicKeyNotFound {
        /// Key owner.
        user_id: String,
        /// Requested algorithm.
        algorithm: Algorithm,
    },

    /// No private key stored for this algorithm.
    #[error("no {algorithm} private key found")]
    PrivateKeyNotFound {
        /// Requested algorithm.
        algorithm: Algorithm,
    },

    /// This key store never holds private material.
    #[error("operation not supported: {operation}")]
    OperationNotSupported {
        /// The refused operation.
        operation: &'static str,
    },
}

impl KeyStoreError {
    /// Returns true for either not-found variant.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::PublicKeyNotFound { .. } | Self::PrivateKeyNotFound { .. })
    }
}
