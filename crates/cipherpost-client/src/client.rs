//! Client orchestration
//!
//! Ties the providers and the local key store to a [`Relay`]:
//!
//! ```text
//! create key ──► derive ──► RegisterPublicKey ──ok──► KeyStore (private + own public)
//! send       ──► KeyStore cache ──miss──► GetPublicKey ──► encrypt ──► SendMessage
//! poll       ──► GetMessages ──► decrypt per envelope algorithm
//! ```
//!
//! Every method maps `success = false` replies to [`ClientError::Rejected`]
//! and a reply of the wrong shape to `TransportError::UnexpectedResponse`.

use std::sync::Arc;

use bytes::Bytes;
use cipherpost_core::{Algorithm, ClientKeyStore, KeyStore};
use cipherpost_crypto::{BigUint, elgamal::ElGamalPublicKey, rsa::RsaPublicKey};
use cipherpost_proto::{Envelope, Relay, Request, Response, TransportError, UserSummary};

use crate::{
    ClientConfig, ClientError, TcpRelay,
    provider::{ElGamalProvider, RsaProvider},
};

/// How to encrypt an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Encryption {
    /// Textbook RSA under the recipient's `n,e`.
    Rsa,
    /// ElGamal under the recipient's `Y,P,G` with ephemeral key `k` (decimal).
    ElGamal {
        /// Caller-chosen ephemeral key, `0 < k < P`
        k: String,
    },
}

impl Encryption {
    /// Algorithm tag carried on the wire.
    pub const fn algorithm(&self) -> Algorithm {
        match self {
            Self::Rsa => Algorithm::Rsa,
            Self::ElGamal { .. } => Algorithm::ElGamal,
        }
    }
}

/// A received envelope after decryption.
#[derive(Debug)]
pub struct DeliveredMessage {
    /// Who sent it
    pub sender_id: String,
    /// Algorithm the sender used
    pub algorithm: Algorithm,
    /// Directory enqueue time, unix seconds
    pub timestamp: u64,
    /// Decrypted bytes, or why decryption failed
    pub plaintext: Result<Vec<u8>, ClientError>,
}

impl DeliveredMessage {
    /// Plaintext as text, replacing invalid UTF-8.
    pub fn text(&self) -> Option<String> {
        self.plaintext.as_ref().ok().map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }
}

/// One identity's view of the directory.
pub struct Client<R>
where
    R: Relay,
{
    user_id: String,
    relay: R,
    keys: Arc<ClientKeyStore>,
    rsa: RsaProvider,
    elgamal: ElGamalProvider,
    config: ClientConfig,
}

impl<R> Client<R>
where
    R: Relay,
{
    /// Create a client for `user_id` talking to `relay`.
    ///
    /// Nothing is sent until [`Client::register`] is called.
    pub fn new(user_id: impl Into<String>, relay: R, config: ClientConfig) -> Self {
        let user_id = user_id.into();
        let keys = Arc::new(ClientKeyStore::new(user_id.clone()));
        let rsa = RsaProvider::new(user_id.clone(), keys.clone());
        let elgamal = ElGamalProvider::new(user_id.clone(), keys.clone());

        Self { user_id, relay, keys, rsa, elgamal, config }
    }

    /// Local identity.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Active configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Local key store.
    pub fn key_store(&self) -> &ClientKeyStore {
        &self.keys
    }

    /// Register the local identity under `name`.
    pub async fn register(&self, name: &str) -> Result<(), ClientError> {
        let request = Request::RegisterUser { user_id: self.user_id.clone(), name: name.to_string() };
        self.call_status(request).await?;

        tracing::info!(user_id = %self.user_id, "registered with directory");
        Ok(())
    }

    /// Every identity the directory knows, with presence.
    pub async fn list_users(&self) -> Result<Vec<UserSummary>, ClientError> {
        match self.relay.call(Request::GetUsers).await? {
            Response::Users(users) => Ok(users),
            _ => Err(unexpected("GetUsers")),
        }
    }

    /// Candidate RSA private exponents for decimal `p` and `q`.
    ///
    /// Returns [`ClientConfig::suggestion_count`] values.
    pub fn suggest_rsa_exponents(&self, p: &str, q: &str) -> Result<Vec<BigUint>, ClientError> {
        RsaProvider::suggest_private_exponents(p, q, self.config.suggestion_count)
    }

    /// Derive an RSA pair, publish the public half, then keep the pair.
    ///
    /// If publishing fails the previous local key stays in place, so the
    /// directory never advertises a key this client cannot decrypt for.
    pub async fn create_rsa_key(
        &self,
        p: &str,
        q: &str,
        d: &str,
    ) -> Result<RsaPublicKey, ClientError> {
        let pair = RsaProvider::derive_key_pair(p, q, d)?;
        let public = pair.public_key().clone();

        self.publish_key(Algorithm::Rsa, public.encode()).await?;
        self.rsa.install(&pair)?;
        Ok(public)
    }

    /// Derive an ElGamal pair, publish the public half, then keep the pair.
    ///
    /// Same ordering as [`Client::create_rsa_key`].
    pub async fn create_elgamal_key(
        &self,
        p: &str,
        g: &str,
        x: &str,
    ) -> Result<ElGamalPublicKey, ClientError> {
        let pair = ElGamalProvider::derive_key_pair(p, g, x)?;
        let public = pair.public_key().clone();

        self.publish_key(Algorithm::ElGamal, public.encode()).await?;
        self.elgamal.install(&pair)?;
        Ok(public)
    }

    /// A user's public key, from the local cache or the directory.
    ///
    /// Directory answers are cached; later lookups do not hit the network.
    pub async fn fetch_public_key(
        &self,
        user_id: &str,
        algorithm: Algorithm,
    ) -> Result<Vec<u8>, ClientError> {
        match self.keys.public_key(user_id, algorithm) {
            Ok(key) => return Ok(key),
            Err(e) if e.is_not_found() => {},
            Err(e) => return Err(e.into()),
        }

        let request = Request::GetPublicKey { user_id: user_id.to_string(), algorithm };
        let reply = match self.relay.call(request).await? {
            Response::PublicKey(reply) => reply,
            _ => return Err(unexpected("GetPublicKey")),
        };
        if !reply.success {
            return Err(ClientError::Rejected { message: reply.message });
        }

        self.keys.store_public_key(user_id, algorithm, &reply.key_bytes)?;
        tracing::debug!(user_id, %algorithm, "public key cached");
        Ok(reply.key_bytes.to_vec())
    }

    /// Encrypt `plaintext` for `recipient_id` and hand it to the directory.
    ///
    /// Success means the directory queued the envelope.
    pub async fn send_message(
        &self,
        recipient_id: &str,
        plaintext: &[u8],
        encryption: &Encryption,
    ) -> Result<(), ClientError> {
        let algorithm = encryption.algorithm();
        self.fetch_public_key(recipient_id, algorithm).await?;

        let ciphertext = match encryption {
            Encryption::Rsa => self.rsa.encrypt(recipient_id, plaintext)?,
            Encryption::ElGamal { k } => self.elgamal.encrypt(recipient_id, plaintext, k)?,
        };

        let request = Request::SendMessage {
            sender_id: self.user_id.clone(),
            recipient_id: recipient_id.to_string(),
            ciphertext: Bytes::from(ciphertext),
            algorithm,
        };
        self.call_status(request).await?;

        tracing::info!(sender_id = %self.user_id, recipient_id, %algorithm, "message sent");
        Ok(())
    }

    /// Decrypt one envelope with the local private key for its algorithm.
    pub fn decrypt_envelope(&self, envelope: &Envelope) -> Result<Vec<u8>, ClientError> {
        match envelope.algorithm {
            Algorithm::Rsa => self.rsa.decrypt(&envelope.ciphertext),
            Algorithm::ElGamal => self.elgamal.decrypt(&envelope.ciphertext),
        }
    }

    /// Drain the mailbox once and decrypt everything in it, oldest first.
    ///
    /// A relay failure is an error; a single undecryptable envelope is not,
    /// it is delivered with its decryption error.
    pub async fn poll_once(&self) -> Result<Vec<DeliveredMessage>, ClientError> {
        let request = Request::GetMessages { user_id: self.user_id.clone() };
        let envelopes = match self.relay.call(request).await? {
            Response::Messages(envelopes) => envelopes,
            _ => return Err(unexpected("GetMessages")),
        };

        Ok(envelopes
            .into_iter()
            .map(|envelope| {
                let plaintext = self.decrypt_envelope(&envelope);
                if let Err(e) = &plaintext {
                    tracing::warn!(
                        sender_id = %envelope.sender_id,
                        algorithm = %envelope.algorithm,
                        "failed to decrypt message: {}",
                        e
                    );
                }
                DeliveredMessage {
                    sender_id: envelope.sender_id,
                    algorithm: envelope.algorithm,
                    timestamp: envelope.timestamp,
                    plaintext,
                }
            })
            .collect())
    }

    async fn publish_key(&self, algorithm: Algorithm, encoded: String) -> Result<(), ClientError> {
        let request = Request::RegisterPublicKey {
            user_id: self.user_id.clone(),
            algorithm,
            key_bytes: Bytes::from(encoded),
        };
        self.call_status(request).await?;

        tracing::info!(user_id = %self.user_id, %algorithm, "public key published");
        Ok(())
    }

    async fn call_status(&self, request: Request) -> Result<(), ClientError> {
        let name = request.name();
        match self.relay.call(request).await? {
            Response::Status(status) if status.success => Ok(()),
            Response::Status(status) => Err(ClientError::Rejected { message: status.message }),
            _ => Err(unexpected(name)),
        }
    }
}

impl Client<TcpRelay> {
    /// Client for `user_id` talking to the relay at `addr` over TCP.
    ///
    /// The relay uses [`ClientConfig::request_timeout`] as its deadline.
    pub fn connect(user_id: impl Into<String>, addr: impl Into<String>, config: ClientConfig) -> Self {
        let relay = TcpRelay::new(addr).with_request_timeout(config.request_timeout);
        Self::new(user_id, relay, config)
    }
}

impl<R> std::fmt::Debug for Client<R>
where
    R: Relay,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("user_id", &self.user_id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn unexpected(request: &'static str) -> ClientError {
    ClientError::Transport(TransportError::UnexpectedResponse { request })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use cipherpost_proto::{PublicKeyReply, StatusReply};

    use super::*;

    /// Relay that answers from a script and records every request.
    #[derive(Default)]
    struct ScriptedRelay {
        replies: Mutex<Vec<Response>>,
        seen: Mutex<Vec<Request>>,
    }

    impl ScriptedRelay {
        fn new(mut replies: Vec<Response>) -> Self {
            replies.reverse();
            Self { replies: Mutex::new(replies), seen: Mutex::default() }
        }

        fn seen(&self) -> Vec<Request> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Relay for ScriptedRelay {
        async fn call(&self, request: Request) -> Result<Response, TransportError> {
            self.seen.lock().unwrap().push(request);
            self.replies.lock().unwrap().pop().ok_or(TransportError::Closed)
        }
    }

    #[tokio::test]
    async fn rejection_is_surfaced() {
        let relay = ScriptedRelay::new(vec![Response::Status(StatusReply::failed("taken"))]);
        let client = Client::new("alice", relay, ClientConfig::default());

        let err = client.register("Alice").await.unwrap_err();
        assert!(matches!(err, ClientError::Rejected { ref message } if message == "taken"));
    }

    #[tokio::test]
    async fn mismatched_reply_is_unexpected_response() {
        let relay = ScriptedRelay::new(vec![Response::Users(Vec::new())]);
        let client = Client::new("alice", relay, ClientConfig::default());

        let err = client.register("Alice").await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Transport(TransportError::UnexpectedResponse { request: "RegisterUser" })
        ));
    }

    #[tokio::test]
    async fn fetched_keys_are_cached() {
        let relay = ScriptedRelay::new(vec![Response::PublicKey(PublicKeyReply::found(
            Bytes::from_static(b"3233,17"),
        ))]);
        let client = Client::new("alice", relay, ClientConfig::default());

        let first = client.fetch_public_key("bob", Algorithm::Rsa).await.unwrap();
        let second = client.fetch_public_key("bob", Algorithm::Rsa).await.unwrap();

        assert_eq!(first, b"3233,17");
        assert_eq!(second, first);
        assert_eq!(client.relay.seen().len(), 1);
    }

    #[tokio::test]
    async fn key_creation_publishes_public_half_only() {
        let relay = ScriptedRelay::new(vec![Response::Status(StatusReply::ok("ok"))]);
        let client = Client::new("alice", relay, ClientConfig::default());

        let public = client.create_rsa_key("61", "53", "2753").await.unwrap();
        assert_eq!(public.encode(), "3233,17");

        let seen = client.relay.seen();
        assert_eq!(seen, [Request::RegisterPublicKey {
            user_id: "alice".into(),
            algorithm: Algorithm::Rsa,
            key_bytes: Bytes::from_static(b"3233,17"),
        }]);
    }

    #[tokio::test]
    async fn rejected_publish_keeps_previous_key() {
        let relay = ScriptedRelay::new(vec![
            Response::Status(StatusReply::ok("ok")),
            Response::Status(StatusReply::failed("user not found: alice")),
        ]);
        let client = Client::new("alice", relay, ClientConfig::default());

        client.create_rsa_key("61", "53", "2753").await.unwrap();
        let err = client.create_rsa_key("1009", "1013", "5").await.unwrap_err();
        assert!(matches!(err, ClientError::Rejected { .. }));

        assert_eq!(client.key_store().private_key(Algorithm::Rsa).unwrap(), b"3233,2753");
        assert_eq!(client.key_store().public_key("alice", Algorithm::Rsa).unwrap(), b"3233,17");
        assert_eq!(client.rsa.decrypt(&2790u16.to_be_bytes()).unwrap(), [65]);
    }

    #[tokio::test]
    async fn failed_publish_installs_nothing() {
        let client = Client::new("alice", ScriptedRelay::default(), ClientConfig::default());

        let err = client.create_elgamal_key("23", "5", "6").await.unwrap_err();
        assert!(err.is_transient());
        assert!(client.key_store().private_key(Algorithm::ElGamal).is_err());
        assert!(client.elgamal.key_pair().is_none());
    }

    #[tokio::test]
    async fn invalid_key_material_sends_nothing() {
        let relay = ScriptedRelay::new(Vec::new());
        let client = Client::new("alice", relay, ClientConfig::default());

        assert!(client.create_rsa_key("61", "61", "7").await.is_err());
        assert!(client.create_elgamal_key("24", "5", "6").await.is_err());
        assert!(client.relay.seen().is_empty());
    }

    #[test]
    fn suggestion_count_comes_from_config() {
        let config = ClientConfig { suggestion_count: 4, ..ClientConfig::default() };
        let client = Client::new("alice", ScriptedRelay::default(), config);

        let suggestions = client.suggest_rsa_exponents("61", "53").unwrap();
        assert_eq!(suggestions.len(), 4);
    }
}
