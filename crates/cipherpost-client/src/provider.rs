//! Key providers
//!
//! A provider binds one algorithm's arithmetic to a [`KeyStore`]: it derives
//! the local identity's key pair, keeps the private half in the store, and
//! encrypts or decrypts using whatever keys the store holds.
//!
//! Providers never talk to the directory. Publishing a new public key and
//! fetching a peer's key on a cache miss are the [`crate::Client`]'s job.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use cipherpost_core::{Algorithm, KeyStore};
use cipherpost_crypto::{
    BigUint, CryptoError,
    arith::parse_decimal,
    elgamal::{self, ElGamalKeyPair, ElGamalPrivateKey, ElGamalPublicKey},
    rsa::{self, RsaKeyPair, RsaPrivateKey, RsaPublicKey},
};

use crate::ClientError;

/// RSA bound to a key store.
pub struct RsaProvider {
    user_id: String,
    store: Arc<dyn KeyStore>,
    cached: Mutex<Option<RsaKeyPair>>,
}

impl RsaProvider {
    /// Create a provider for `user_id` backed by `store`.
    pub fn new(user_id: impl Into<String>, store: Arc<dyn KeyStore>) -> Self {
        Self { user_id: user_id.into(), store, cached: Mutex::new(None) }
    }

    /// Derive a key pair from decimal `p`, `q` and `d` and install it.
    ///
    /// The private key replaces any previous RSA private key in the store and
    /// the public key is cached under the local user ID.
    pub fn create_key_pair(&self, p: &str, q: &str, d: &str) -> Result<RsaKeyPair, ClientError> {
        let pair = Self::derive_key_pair(p, q, d)?;
        self.install(&pair)?;
        Ok(pair)
    }

    /// Derive a key pair from decimal `p`, `q` and `d` without touching the store.
    pub fn derive_key_pair(p: &str, q: &str, d: &str) -> Result<RsaKeyPair, ClientError> {
        let p = required("p", p)?;
        let q = required("q", q)?;
        let d = required("d", d)?;

        Ok(rsa::derive_key_pair(&p, &q, &d, &mut rand::thread_rng())?)
    }

    /// Make `pair` the local RSA identity.
    pub fn install(&self, pair: &RsaKeyPair) -> Result<(), ClientError> {
        self.store.store_private_key(Algorithm::Rsa, pair.private_key().encode().as_bytes())?;
        self.store.store_public_key(
            &self.user_id,
            Algorithm::Rsa,
            pair.public_key().encode().as_bytes(),
        )?;
        *lock(&self.cached) = Some(pair.clone());

        tracing::info!(
            user_id = %self.user_id,
            modulus_bits = pair.public_key().modulus().bits(),
            "RSA key pair installed"
        );
        Ok(())
    }

    /// The first `count` usable private exponents for decimal `p` and `q`.
    pub fn suggest_private_exponents(
        p: &str,
        q: &str,
        count: usize,
    ) -> Result<Vec<BigUint>, ClientError> {
        let p = required("p", p)?;
        let q = required("q", q)?;
        Ok(rsa::suggest_private_exponents(&p, &q, count)?)
    }

    /// Most recently created key pair, if any.
    pub fn key_pair(&self) -> Option<RsaKeyPair> {
        lock(&self.cached).clone()
    }

    /// Encrypt for `recipient_id` using the public key held in the store.
    pub fn encrypt(&self, recipient_id: &str, message: &[u8]) -> Result<Vec<u8>, ClientError> {
        let encoded = key_text(recipient_id, self.store.public_key(recipient_id, Algorithm::Rsa)?)?;
        let public = RsaPublicKey::decode(&encoded)?;
        Ok(public.encrypt(message)?)
    }

    /// Decrypt with the local RSA private key.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, ClientError> {
        if let Some(pair) = lock(&self.cached).as_ref() {
            return Ok(pair.private_key().decrypt(ciphertext)?);
        }

        let encoded = key_text(&self.user_id, self.store.private_key(Algorithm::Rsa)?)?;
        let private = RsaPrivateKey::decode(&encoded)?;
        Ok(private.decrypt(ciphertext)?)
    }
}

/// ElGamal bound to a key store.
pub struct ElGamalProvider {
    user_id: String,
    store: Arc<dyn KeyStore>,
    cached: Mutex<Option<ElGamalKeyPair>>,
}

impl ElGamalProvider {
    /// Create a provider for `user_id` backed by `store`.
    pub fn new(user_id: impl Into<String>, store: Arc<dyn KeyStore>) -> Self {
        Self { user_id: user_id.into(), store, cached: Mutex::new(None) }
    }

    /// Derive a key pair from decimal `p`, `g` and `x` and install it.
    pub fn create_key_pair(&self, p: &str, g: &str, x: &str) -> Result<ElGamalKeyPair, ClientError> {
        let pair = Self::derive_key_pair(p, g, x)?;
        self.install(&pair)?;
        Ok(pair)
    }

    /// Derive a key pair from decimal `p`, `g` and `x` without touching the store.
    pub fn derive_key_pair(p: &str, g: &str, x: &str) -> Result<ElGamalKeyPair, ClientError> {
        let p = required("p", p)?;
        let g = required("g", g)?;
        let x = required("x", x)?;

        Ok(elgamal::derive_key_pair(&p, &g, &x, &mut rand::thread_rng())?)
    }

    /// Make `pair` the local ElGamal identity.
    ///
    /// The own public key is stored alongside the private key: decryption
    /// rebuilds the private key from both.
    pub fn install(&self, pair: &ElGamalKeyPair) -> Result<(), ClientError> {
        self.store.store_private_key(Algorithm::ElGamal, pair.private_key().encode().as_bytes())?;
        self.store.store_public_key(
            &self.user_id,
            Algorithm::ElGamal,
            pair.public_key().encode().as_bytes(),
        )?;
        *lock(&self.cached) = Some(pair.clone());

        tracing::info!(
            user_id = %self.user_id,
            prime_bits = pair.public_key().prime().bits(),
            "ElGamal key pair installed"
        );
        Ok(())
    }

    /// Most recently created key pair, if any.
    pub fn key_pair(&self) -> Option<ElGamalKeyPair> {
        lock(&self.cached).clone()
    }

    /// Encrypt for `recipient_id` with ephemeral key `k` (decimal).
    pub fn encrypt(&self, recipient_id: &str, message: &[u8], k: &str) -> Result<Vec<u8>, ClientError> {
        let k = required("k", k)?;
        let encoded =
            key_text(recipient_id, self.store.public_key(recipient_id, Algorithm::ElGamal)?)?;
        let public = ElGamalPublicKey::decode(&encoded)?;
        Ok(public.encrypt(message, &k)?)
    }

    /// Decrypt with the local ElGamal private key.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, ClientError> {
        if let Some(pair) = lock(&self.cached).as_ref() {
            return Ok(pair.private_key().decrypt(ciphertext)?);
        }

        let public = self.store.public_key(&self.user_id, Algorithm::ElGamal)?;
        let public = ElGamalPublicKey::decode(&key_text(&self.user_id, public)?)?;
        let x = key_text(&self.user_id, self.store.private_key(Algorithm::ElGamal)?)?;
        let private = ElGamalPrivateKey::decode(&x, &public)?;
        Ok(private.decrypt(ciphertext)?)
    }
}

/// Parse a caller-supplied decimal parameter. Blank input counts as missing.
fn required(field: &str, value: &str) -> Result<BigUint, CryptoError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CryptoError::InvalidKeyMaterial { reason: format!("{field} is required") });
    }
    parse_decimal(field, value)
}

fn key_text(user_id: &str, bytes: Vec<u8>) -> Result<String, ClientError> {
    String::from_utf8(bytes).map_err(|_| ClientError::MalformedKey { user_id: user_id.to_string() })
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
