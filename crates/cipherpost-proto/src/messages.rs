//! Relay requests and replies.
//!
//! One [`Request`] variant per relay call. Every call gets exactly one
//! [`Response`]; the variant is fixed by the request kind (see
//! [`Request::name`] for the pairing).

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::Algorithm;

/// A call on the directory/relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    /// Create an identity. Answered with [`Response::Status`].
    RegisterUser {
        /// Unique user ID
        user_id: String,
        /// Display name
        name: String,
    },

    /// List identities. Answered with [`Response::Users`].
    GetUsers,

    /// Publish a public key. Answered with [`Response::Status`].
    RegisterPublicKey {
        /// Owner of the key
        user_id: String,
        /// Cryptosystem of the key
        algorithm: Algorithm,
        /// Canonical key encoding
        key_bytes: Bytes,
    },

    /// Look up a public key. Answered with [`Response::PublicKey`].
    GetPublicKey {
        /// Owner of the key
        user_id: String,
        /// Cryptosystem of the key
        algorithm: Algorithm,
    },

    /// Queue ciphertext for a recipient. Answered with [`Response::Status`].
    SendMessage {
        /// Sending identity
        sender_id: String,
        /// Receiving identity
        recipient_id: String,
        /// Opaque ciphertext
        ciphertext: Bytes,
        /// Cryptosystem the ciphertext was produced with
        algorithm: Algorithm,
    },

    /// Drain the caller's mailbox. Answered with [`Response::Messages`].
    GetMessages {
        /// Mailbox owner
        user_id: String,
    },
}

impl Request {
    /// Call name, used in logs and error messages.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::RegisterUser { .. } => "RegisterUser",
            Self::GetUsers => "GetUsers",
            Self::RegisterPublicKey { .. } => "RegisterPublicKey",
            Self::GetPublicKey { .. } => "GetPublicKey",
            Self::SendMessage { .. } => "SendMessage",
            Self::GetMessages { .. } => "GetMessages",
        }
    }
}

/// Reply to a [`Request`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    /// Outcome of a mutating call
    Status(StatusReply),
    /// All known identities
    Users(Vec<UserSummary>),
    /// Public key lookup result
    PublicKey(PublicKeyReply),
    /// Drained mailbox contents, oldest first
    Messages(Vec<Envelope>),
}

/// `{success, message}` outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReply {
    /// Whether the call took effect
    pub success: bool,
    /// Human-readable outcome
    pub message: String,
}

impl StatusReply {
    /// Successful outcome.
    pub fn ok(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into() }
    }

    /// Failed outcome.
    pub fn failed(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into() }
    }
}

/// One identity as seen by other users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    /// Unique user ID
    pub user_id: String,
    /// Display name
    pub name: String,
    /// Presence flag
    pub online: bool,
}

/// `{success, message, key_bytes}` lookup result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyReply {
    /// Whether a key was found
    pub success: bool,
    /// Human-readable outcome
    pub message: String,
    /// Key bytes exactly as registered; empty on failure
    pub key_bytes: Bytes,
}

impl PublicKeyReply {
    /// Key found.
    pub fn found(key_bytes: Bytes) -> Self {
        Self { success: true, message: "public key retrieved".to_string(), key_bytes }
    }

    /// Lookup failed.
    pub fn failed(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into(), key_bytes: Bytes::new() }
    }
}

/// A queued encrypted message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Sending identity
    pub sender_id: String,
    /// Opaque ciphertext
    pub ciphertext: Bytes,
    /// Cryptosystem the ciphertext was produced with
    pub algorithm: Algorithm,
    /// Server receive time, unix seconds
    pub timestamp: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cbor_round_trip<T: Serialize + for<'de> Deserialize<'de>>(value: &T) -> T {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf).unwrap();
        ciborium::from_reader(buf.as_slice()).unwrap()
    }

    #[test]
    fn request_names() {
        assert_eq!(Request::GetUsers.name(), "GetUsers");
        assert_eq!(Request::GetMessages { user_id: "a".into() }.name(), "GetMessages");
    }

    #[test]
    fn send_message_preserves_ciphertext_bytes() {
        let request = Request::SendMessage {
            sender_id: "bob".into(),
            recipient_id: "alice".into(),
            ciphertext: Bytes::from_static(&[0, 1, 2, 0xff]),
            algorithm: Algorithm::ElGamal,
        };
        assert_eq!(cbor_round_trip(&request), request);
    }

    #[test]
    fn messages_response_preserves_order() {
        let envelopes: Vec<Envelope> = (0..3u8)
            .map(|i| Envelope {
                sender_id: format!("user-{i}"),
                ciphertext: Bytes::from(vec![i]),
                algorithm: Algorithm::Rsa,
                timestamp: 1_700_000_000 + u64::from(i),
            })
            .collect();
        let response = Response::Messages(envelopes.clone());
        assert_eq!(cbor_round_trip(&response), Response::Messages(envelopes));
    }

    #[test]
    fn failed_key_reply_is_empty() {
        let reply = PublicKeyReply::failed("user not found");
        assert!(!reply.success);
        assert!(reply.key_bytes.is_empty());
    }
}
