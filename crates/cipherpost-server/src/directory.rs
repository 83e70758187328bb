//! Directory
//!
//! Registry of identities and their public keys, plus one mailbox per
//! recipient.
//!
//! ## Responsibilities
//!
//! - Identity Lifecycle: `Unregistered → Registered`, never deleted
//! - Key Distribution: last-write-wins public keys per (user, algorithm)
//! - Relay: FIFO mailboxes, drained wholesale by their owner
//!
//! ## Design
//!
//! - One lock: every check-then-act sequence (register, enqueue, drain plus
//!   presence refresh) runs under the same mutex, so concurrent callers see
//!   each call as atomic
//! - Typed results: methods return `DirectoryError`; [`Directory::handle`]
//!   turns them into `success = false` replies instead of failing the call
//! - No private material: keys go through a [`DirectoryKeyStore`]

use std::{
    collections::{HashMap, VecDeque},
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use cipherpost_core::{DirectoryKeyStore, KeyStore, KeyStoreError, env::Environment};
use cipherpost_proto::{
    Algorithm, Envelope, PublicKeyReply, Relay, Request, Response, StatusReply, TransportError,
    UserSummary,
};

/// Directory tuning.
#[derive(Debug, Clone, Default)]
pub struct DirectoryConfig {
    /// Report an identity offline once it has not polled for this long.
    ///
    /// `None` reports the stored presence flag unchanged.
    pub presence_timeout: Option<Duration>,
}

/// A registered identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Unique user ID
    pub user_id: String,
    /// Display name
    pub name: String,
    /// Presence flag, set on registration and on every mailbox poll
    pub online: bool,
    /// Last registration or poll, unix seconds
    pub last_seen: u64,
}

/// Domain failures reported back to callers as `success = false`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectoryError {
    /// Registration attempted for an ID that is already taken.
    #[error("user ID already exists: {user_id}")]
    UserAlreadyExists {
        /// The duplicate ID
        user_id: String,
    },

    /// Identity is not registered.
    #[error("user not found: {user_id}")]
    UserNotFound {
        /// The unknown ID
        user_id: String,
    },

    /// Identity has no key for this algorithm.
    #[error("no {algorithm} key registered for user {user_id}")]
    KeyNotFound {
        /// Key owner
        user_id: String,
        /// Requested algorithm
        algorithm: Algorithm,
    },

    /// Message sender is not registered.
    #[error("sender not found: {user_id}")]
    SenderNotFound {
        /// The unknown sender
        user_id: String,
    },

    /// Message recipient is not registered.
    #[error("recipient not found: {user_id}")]
    RecipientNotFound {
        /// The unknown recipient
        user_id: String,
    },

    /// Backing key store refused the operation.
    #[error("key store error: {0}")]
    KeyStore(#[from] KeyStoreError),
}

#[derive(Debug, Default)]
struct DirectoryState {
    identities: HashMap<String, Identity>,
    mailboxes: HashMap<String, VecDeque<Envelope>>,
}

/// Shared identity, key and mailbox store.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct Directory<E>
where
    E: Environment,
{
    env: E,
    config: DirectoryConfig,
    state: Mutex<DirectoryState>,
    keys: DirectoryKeyStore,
}

impl<E> Directory<E>
where
    E: Environment,
{
    /// Create an empty directory.
    pub fn new(env: E, config: DirectoryConfig) -> Self {
        Self {
            env,
            config,
            state: Mutex::new(DirectoryState::default()),
            keys: DirectoryKeyStore::new(),
        }
    }

    /// Register a new identity, marking it online.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::UserAlreadyExists` if the ID is taken; the
    /// existing identity is left untouched.
    pub fn register_user(&self, user_id: &str, name: &str) -> Result<(), DirectoryError> {
        let mut state = self.state();
        if state.identities.contains_key(user_id) {
            tracing::debug!(user_id, "duplicate registration rejected");
            return Err(DirectoryError::UserAlreadyExists { user_id: user_id.to_string() });
        }

        let identity = Identity {
            user_id: user_id.to_string(),
            name: name.to_string(),
            online: true,
            last_seen: self.env.unix_time(),
        };
        state.identities.insert(user_id.to_string(), identity);

        tracing::info!(user_id, name, "user registered");
        Ok(())
    }

    /// Check if an identity is registered.
    pub fn has_user(&self, user_id: &str) -> bool {
        self.state().identities.contains_key(user_id)
    }

    /// Snapshot of one identity.
    pub fn identity(&self, user_id: &str) -> Option<Identity> {
        self.state().identities.get(user_id).cloned()
    }

    /// All identities with their presence, sorted by user ID.
    pub fn users(&self) -> Vec<UserSummary> {
        let now = self.env.unix_time();
        let state = self.state();

        let mut users: Vec<UserSummary> = state
            .identities
            .values()
            .map(|identity| UserSummary {
                user_id: identity.user_id.clone(),
                name: identity.name.clone(),
                online: self.is_present(identity, now),
            })
            .collect();
        users.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        users
    }

    /// Publish or replace a public key.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::UserNotFound` if the owner is not registered.
    pub fn register_public_key(
        &self,
        user_id: &str,
        algorithm: Algorithm,
        key: &[u8],
    ) -> Result<(), DirectoryError> {
        let state = self.state();
        if !state.identities.contains_key(user_id) {
            return Err(DirectoryError::UserNotFound { user_id: user_id.to_string() });
        }

        self.keys.store_public_key(user_id, algorithm, key)?;

        tracing::info!(user_id, %algorithm, "public key registered");
        Ok(())
    }

    /// Look up a public key, returned exactly as registered.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::UserNotFound` or `DirectoryError::KeyNotFound`.
    pub fn public_key(&self, user_id: &str, algorithm: Algorithm) -> Result<Vec<u8>, DirectoryError> {
        let state = self.state();
        if !state.identities.contains_key(user_id) {
            return Err(DirectoryError::UserNotFound { user_id: user_id.to_string() });
        }

        self.keys.public_key(user_id, algorithm).map_err(|e| match e {
            KeyStoreError::PublicKeyNotFound { user_id, algorithm } => {
                DirectoryError::KeyNotFound { user_id, algorithm }
            },
            other => DirectoryError::KeyStore(other),
        })
    }

    /// Append a timestamped envelope to the recipient's mailbox.
    ///
    /// Success means the envelope was queued, not that it was read.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::SenderNotFound` or
    /// `DirectoryError::RecipientNotFound` if either side is unregistered.
    pub fn send_message(
        &self,
        sender_id: &str,
        recipient_id: &str,
        ciphertext: Bytes,
        algorithm: Algorithm,
    ) -> Result<(), DirectoryError> {
        let mut state = self.state();
        if !state.identities.contains_key(sender_id) {
            return Err(DirectoryError::SenderNotFound { user_id: sender_id.to_string() });
        }
        if !state.identities.contains_key(recipient_id) {
            return Err(DirectoryError::RecipientNotFound { user_id: recipient_id.to_string() });
        }

        let envelope = Envelope {
            sender_id: sender_id.to_string(),
            ciphertext,
            algorithm,
            timestamp: self.env.unix_time(),
        };
        let mailbox = state.mailboxes.entry(recipient_id.to_string()).or_default();
        mailbox.push_back(envelope);

        tracing::info!(sender_id, recipient_id, %algorithm, queued = mailbox.len(), "message queued");
        Ok(())
    }

    /// Drain the caller's mailbox, oldest first.
    ///
    /// Unregistered callers get an empty list. Registered callers are marked
    /// online with a fresh last-seen time in the same critical section as the
    /// drain. Delivery is at-most-once: drained envelopes are gone.
    pub fn take_messages(&self, user_id: &str) -> Vec<Envelope> {
        let now = self.env.unix_time();
        let mut state = self.state();

        let Some(identity) = state.identities.get_mut(user_id) else {
            return Vec::new();
        };
        identity.online = true;
        identity.last_seen = now;

        let drained: Vec<Envelope> = state
            .mailboxes
            .get_mut(user_id)
            .map(|mailbox| std::mem::take(mailbox).into())
            .unwrap_or_default();

        if !drained.is_empty() {
            tracing::info!(user_id, count = drained.len(), "mailbox drained");
        }
        drained
    }

    /// Number of envelopes waiting for `user_id`.
    pub fn pending_messages(&self, user_id: &str) -> usize {
        self.state().mailboxes.get(user_id).map_or(0, VecDeque::len)
    }

    /// Dump of the public keys held by the directory.
    pub fn display_keys(&self) -> String {
        self.keys.display()
    }

    /// Answer one relay call.
    ///
    /// Domain failures become `success = false` replies; this never errors.
    pub fn handle(&self, request: Request) -> Response {
        match request {
            Request::RegisterUser { user_id, name } => {
                Response::Status(match self.register_user(&user_id, &name) {
                    Ok(()) => StatusReply::ok("user registered successfully"),
                    Err(e) => StatusReply::failed(e.to_string()),
                })
            },
            Request::GetUsers => Response::Users(self.users()),
            Request::RegisterPublicKey { user_id, algorithm, key_bytes } => {
                Response::Status(match self.register_public_key(&user_id, algorithm, &key_bytes) {
                    Ok(()) => StatusReply::ok("public key registered successfully"),
                    Err(e) => StatusReply::failed(e.to_string()),
                })
            },
            Request::GetPublicKey { user_id, algorithm } => {
                Response::PublicKey(match self.public_key(&user_id, algorithm) {
                    Ok(key) => PublicKeyReply::found(Bytes::from(key)),
                    Err(e) => PublicKeyReply::failed(e.to_string()),
                })
            },
            Request::SendMessage { sender_id, recipient_id, ciphertext, algorithm } => {
                Response::Status(
                    match self.send_message(&sender_id, &recipient_id, ciphertext, algorithm) {
                        Ok(()) => StatusReply::ok("message sent successfully"),
                        Err(e) => StatusReply::failed(e.to_string()),
                    },
                )
            },
            Request::GetMessages { user_id } => Response::Messages(self.take_messages(&user_id)),
        }
    }

    fn is_present(&self, identity: &Identity, now: u64) -> bool {
        match self.config.presence_timeout {
            Some(timeout) => {
                identity.online && now.saturating_sub(identity.last_seen) <= timeout.as_secs()
            },
            None => identity.online,
        }
    }

    fn state(&self) -> MutexGuard<'_, DirectoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl<E> Relay for Directory<E>
where
    E: Environment,
{
    async fn call(&self, request: Request) -> Result<Response, TransportError> {
        Ok(self.handle(request))
    }
}

impl<E> std::fmt::Debug for Directory<E>
where
    E: Environment,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("Directory")
            .field("user_count", &state.identities.len())
            .field("mailbox_count", &state.mailboxes.len())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    };

    use super::*;

    #[derive(Clone, Default)]
    struct FixedClock(Arc<AtomicU64>);

    impl Environment for FixedClock {
        fn unix_time(&self) -> u64 {
            self.0.load(Ordering::SeqCst)
        }

        fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
            tokio::time::sleep(duration)
        }
    }

    #[test]
    fn duplicate_registration_keeps_original_identity() {
        let clock = FixedClock::default();
        clock.0.store(100, Ordering::SeqCst);
        let directory = Directory::new(clock.clone(), DirectoryConfig::default());

        directory.register_user("alice", "Alice").unwrap();
        clock.0.store(200, Ordering::SeqCst);

        let err = directory.register_user("alice", "Mallory").unwrap_err();
        assert_eq!(err, DirectoryError::UserAlreadyExists { user_id: "alice".to_string() });

        let identity = directory.identity("alice").unwrap();
        assert_eq!(identity.name, "Alice");
        assert_eq!(identity.last_seen, 100);
    }

    #[test]
    fn presence_timeout_reports_stale_users_offline() {
        let clock = FixedClock::default();
        clock.0.store(1_000, Ordering::SeqCst);
        let config = DirectoryConfig { presence_timeout: Some(Duration::from_secs(30)) };
        let directory = Directory::new(clock.clone(), config);

        directory.register_user("alice", "Alice").unwrap();
        assert!(directory.users()[0].online);

        clock.0.store(1_031, Ordering::SeqCst);
        assert!(!directory.users()[0].online);

        directory.take_messages("alice");
        assert!(directory.users()[0].online);
    }

    #[test]
    fn key_lookup_distinguishes_user_and_key_errors() {
        let directory = Directory::new(FixedClock::default(), DirectoryConfig::default());
        directory.register_user("alice", "Alice").unwrap();

        assert!(matches!(
            directory.public_key("bob", Algorithm::Rsa),
            Err(DirectoryError::UserNotFound { .. })
        ));
        assert!(matches!(
            directory.public_key("alice", Algorithm::Rsa),
            Err(DirectoryError::KeyNotFound { .. })
        ));
    }

    #[test]
    fn handle_reports_failures_as_replies() {
        let directory = Directory::new(FixedClock::default(), DirectoryConfig::default());

        let response = directory.handle(Request::RegisterPublicKey {
            user_id: "ghost".into(),
            algorithm: Algorithm::Rsa,
            key_bytes: Bytes::from_static(b"3233,17"),
        });
        assert_eq!(response, Response::Status(StatusReply::failed("user not found: ghost")));

        let response =
            directory.handle(Request::GetPublicKey { user_id: "ghost".into(), algorithm: Algorithm::Rsa });
        let Response::PublicKey(reply) = response else {
            panic!("expected PublicKey response, got {response:?}");
        };
        assert!(!reply.success);
        assert!(reply.key_bytes.is_empty());
    }
}
