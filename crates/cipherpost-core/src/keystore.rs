//! Key Store
//!
//! Capability for storing and retrieving key material.
//!
//! ## Variants
//!
//! - [`ClientKeyStore`]: the local identity's private keys (one per
//!   algorithm) plus a cache of public keys, its own and its peers'
//! - [`DirectoryKeyStore`]: public keys only; private-key calls fail with
//!   `OperationNotSupported`
//!
//! Both share [`PublicKeyTable`] for the public half. Stores are last-write-wins
//! with no versioning. Each store carries its own lock, so a key store can be
//! shared between the interactive path and the background poller.

use std::{
    collections::BTreeMap,
    fmt::{self, Write as _},
    sync::{Mutex, MutexGuard, PoisonError},
};

use crate::{Algorithm, KeyStoreError};

/// Storage for public and private key material.
///
/// Keys are opaque bytes in their canonical encodings; stores never parse
/// them.
pub trait KeyStore: Send + Sync {
    /// Store or overwrite the public key for `(user_id, algorithm)`.
    fn store_public_key(
        &self,
        user_id: &str,
        algorithm: Algorithm,
        key: &[u8],
    ) -> Result<(), KeyStoreError>;

    /// Fetch the public key for `(user_id, algorithm)`.
    fn public_key(&self, user_id: &str, algorithm: Algorithm) -> Result<Vec<u8>, KeyStoreError>;

    /// Store or overwrite the local identity's private key for `algorithm`.
    fn store_private_key(&self, algorithm: Algorithm, key: &[u8]) -> Result<(), KeyStoreError>;

    /// Fetch the local identity's private key for `algorithm`.
    fn private_key(&self, algorithm: Algorithm) -> Result<Vec<u8>, KeyStoreError>;

    /// Human-readable dump of the store's contents.
    fn display(&self) -> String;
}

/// Public keys indexed by `(user_id, algorithm)`.
#[derive(Debug, Clone, Default)]
pub struct PublicKeyTable {
    keys: BTreeMap<(String, Algorithm), Vec<u8>>,
}

impl PublicKeyTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a key.
    pub fn insert(&mut self, user_id: &str, algorithm: Algorithm, key: &[u8]) {
        self.keys.insert((user_id.to_string(), algorithm), key.to_vec());
    }

    /// Look up a key.
    pub fn get(&self, user_id: &str, algorithm: Algorithm) -> Result<Vec<u8>, KeyStoreError> {
        self.keys.get(&(user_id.to_string(), algorithm)).cloned().ok_or_else(|| {
            KeyStoreError::PublicKeyNotFound { user_id: user_id.to_string(), algorithm }
        })
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn render(&self, out: &mut String) {
        let mut current_user: Option<&str> = None;
        for ((user_id, algorithm), key) in &self.keys {
            if current_user != Some(user_id.as_str()) {
                let _ = writeln!(out, "User {user_id}:");
                current_user = Some(user_id.as_str());
            }
            let _ = writeln!(out, "  {algorithm}: {}", render_key(key));
        }
    }
}

/// Key store for one client identity.
pub struct ClientKeyStore {
    user_id: String,
    keys: Mutex<ClientKeys>,
}

#[derive(Default)]
struct ClientKeys {
    private: BTreeMap<Algorithm, Vec<u8>>,
    public: PublicKeyTable,
}

impl ClientKeyStore {
    /// Create an empty store for `user_id`.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), keys: Mutex::new(ClientKeys::default()) }
    }

    /// The identity whose private keys this store holds.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Returns true if a public key for `(user_id, algorithm)` is cached.
    pub fn has_public_key(&self, user_id: &str, algorithm: Algorithm) -> bool {
        lock(&self.keys).public.get(user_id, algorithm).is_ok()
    }

    fn keys(&self) -> MutexGuard<'_, ClientKeys> {
        lock(&self.keys)
    }
}

impl KeyStore for ClientKeyStore {
    fn store_public_key(
        &self,
        user_id: &str,
        algorithm: Algorithm,
        key: &[u8],
    ) -> Result<(), KeyStoreError> {
        self.keys().public.insert(user_id, algorithm, key);
        tracing::debug!(user_id, %algorithm, "cached public key");
        Ok(())
    }

    fn public_key(&self, user_id: &str, algorithm: Algorithm) -> Result<Vec<u8>, KeyStoreError> {
        self.keys().public.get(user_id, algorithm)
    }

    fn store_private_key(&self, algorithm: Algorithm, key: &[u8]) -> Result<(), KeyStoreError> {
        self.keys().private.insert(algorithm, key.to_vec());
        tracing::debug!(user_id = %self.user_id, %algorithm, "stored private key");
        Ok(())
    }

    fn private_key(&self, algorithm: Algorithm) -> Result<Vec<u8>, KeyStoreError> {
        self.keys()
            .private
            .get(&algorithm)
            .cloned()
            .ok_or(KeyStoreError::PrivateKeyNotFound { algorithm })
    }

    fn display(&self) -> String {
        let keys = self.keys();
        let mut out = String::from("Your private keys:\n");
        if keys.private.is_empty() {
            out.push_str("No private keys found.\n");
        }
        for (algorithm, key) in &keys.private {
            let _ = writeln!(out, "{algorithm}: {}", render_key(key));
        }

        out.push_str("Known public keys:\n");
        if keys.public.is_empty() {
            out.push_str("No public keys found.\n");
        }
        keys.public.render(&mut out);
        out
    }
}

impl fmt::Debug for ClientKeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys = self.keys();
        f.debug_struct("ClientKeyStore")
            .field("user_id", &self.user_id)
            .field("private_algorithms", &keys.private.keys().collect::<Vec<_>>())
            .field("public_key_count", &keys.public.len())
            .finish()
    }
}

/// Key store held by the directory: public keys only.
#[derive(Debug, Default)]
pub struct DirectoryKeyStore {
    public: Mutex<PublicKeyTable>,
}

impl DirectoryKeyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyStore for DirectoryKeyStore {
    fn store_public_key(
        &self,
        user_id: &str,
        algorithm: Algorithm,
        key: &[u8],
    ) -> Result<(), KeyStoreError> {
        lock(&self.public).insert(user_id, algorithm, key);
        Ok(())
    }

    fn public_key(&self, user_id: &str, algorithm: Algorithm) -> Result<Vec<u8>, KeyStoreError> {
        lock(&self.public).get(user_id, algorithm)
    }

    fn store_private_key(&self, _algorithm: Algorithm, _key: &[u8]) -> Result<(), KeyStoreError> {
        Err(KeyStoreError::OperationNotSupported { operation: "store_private_key" })
    }

    fn private_key(&self, _algorithm: Algorithm) -> Result<Vec<u8>, KeyStoreError> {
        Err(KeyStoreError::OperationNotSupported { operation: "private_key" })
    }

    fn display(&self) -> String {
        let table = lock(&self.public);
        let mut out = String::from("Public keys stored in directory:\n");
        table.render(&mut out);
        out
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn render_key(key: &[u8]) -> String {
    if key.is_empty() { "[unset]".to_string() } else { String::from_utf8_lossy(key).into_owned() }
}
