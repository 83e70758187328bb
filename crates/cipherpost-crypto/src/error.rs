//! Cryptographic error types.

use thiserror::Error;

/// Errors from key derivation, encryption, decryption and key encoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Caller-supplied key parameters are missing or unusable.
    #[error("invalid key material: {reason}")]
    InvalidKeyMaterial {
        /// What was wrong with the parameters.
        reason: String,
    },

    /// Encoded key string is not in canonical decimal form.
    #[error("invalid key encoding: {reason}")]
    InvalidKeyEncoding {
        /// What was wrong with the encoding.
        reason: String,
    },

    /// Message integer does not fit under the modulus.
    #[error("message too large: {bits} bits, modulus has {modulus_bits} bits")]
    MessageTooLarge {
        /// Bit length of the message integer.
        bits: u64,
        /// Bit length of the modulus.
        modulus_bits: u64,
    },

    /// ElGamal ephemeral key outside `0 < k < p`.
    #[error("invalid ephemeral key: k must satisfy 0 < k < p")]
    InvalidEphemeralKey,

    /// Ciphertext cannot be decrypted under this key.
    #[error("invalid ciphertext: {reason}")]
    InvalidCiphertext {
        /// What was wrong with the ciphertext.
        reason: String,
    },

    /// A value needed during decryption has no inverse modulo p.
    #[error("no modular inverse exists")]
    NoModularInverse,
}

impl CryptoError {
    pub(crate) fn key_material(reason: impl Into<String>) -> Self {
        Self::InvalidKeyMaterial { reason: reason.into() }
    }

    pub(crate) fn key_encoding(reason: impl Into<String>) -> Self {
        Self::InvalidKeyEncoding { reason: reason.into() }
    }

    pub(crate) fn ciphertext(reason: impl Into<String>) -> Self {
        Self::InvalidCiphertext { reason: reason.into() }
    }
}
