//! Textbook ElGamal over `Z_p*`.
//!
//! Key derivation takes the group parameters `(p, g)` and the secret `x` from
//! the caller; encryption takes the ephemeral `k` from the caller as well.
//!
//! # Ciphertext layout
//!
//! ```text
//! +------------------+------------------+
//! | a = g^k mod p    | b = y^k * m mod p|
//! | len(p) bytes, BE | len(p) bytes, BE |
//! +------------------+------------------+
//! ```
//!
//! Both halves are left-padded to the byte length of `p`, so splitting at the
//! midpoint always recovers `(a, b)`.

use std::fmt;

use num_bigint::BigUint;
use num_traits::{One, Zero};
use rand::Rng;

use crate::{
    CryptoError, PRIMALITY_ROUNDS,
    arith::{
        byte_len, from_bytes, is_probable_prime, mod_inverse, parse_decimal, to_fixed_bytes,
        to_minimal_bytes,
    },
};

/// ElGamal public key: `y = g^x mod p` with the group parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElGamalPublicKey {
    y: BigUint,
    p: BigUint,
    g: BigUint,
}

/// ElGamal private key: the secret `x` and the prime it lives under.
#[derive(Clone, PartialEq, Eq)]
pub struct ElGamalPrivateKey {
    p: BigUint,
    x: BigUint,
}

/// A derived key pair.
#[derive(Debug, Clone)]
pub struct ElGamalKeyPair {
    public: ElGamalPublicKey,
    private: ElGamalPrivateKey,
}

impl fmt::Debug for ElGamalPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElGamalPrivateKey")
            .field("p", &self.p)
            .field("x", &format_args!("<redacted {} bits>", self.x.bits()))
            .finish()
    }
}

/// Derive a key pair from a prime `p`, a generator `g` and a secret `x`.
///
/// # Errors
///
/// `InvalidKeyMaterial` if `p` fails the primality test, `g` is outside
/// `1 < g < p`, or `x` is outside `0 < x < p`.
pub fn derive_key_pair<R: Rng + ?Sized>(
    p: &BigUint,
    g: &BigUint,
    x: &BigUint,
    rng: &mut R,
) -> Result<ElGamalKeyPair, CryptoError> {
    if !is_probable_prime(p, PRIMALITY_ROUNDS, rng) {
        return Err(CryptoError::key_material("p is not prime"));
    }
    if *g <= BigUint::one() || g >= p {
        return Err(CryptoError::key_material("g must satisfy 1 < g < p"));
    }
    if x.is_zero() || x >= p {
        return Err(CryptoError::key_material("x must satisfy 0 < x < p"));
    }

    let y = g.modpow(x, p);
    Ok(ElGamalKeyPair {
        public: ElGamalPublicKey { y, p: p.clone(), g: g.clone() },
        private: ElGamalPrivateKey { p: p.clone(), x: x.clone() },
    })
}

impl ElGamalKeyPair {
    /// Public half.
    pub fn public_key(&self) -> &ElGamalPublicKey {
        &self.public
    }

    /// Private half.
    pub fn private_key(&self) -> &ElGamalPrivateKey {
        &self.private
    }
}

impl ElGamalPublicKey {
    /// Public value `y`.
    pub fn y(&self) -> &BigUint {
        &self.y
    }

    /// Prime modulus `p`.
    pub fn prime(&self) -> &BigUint {
        &self.p
    }

    /// Generator `g`.
    pub fn generator(&self) -> &BigUint {
        &self.g
    }

    /// Encrypt with the caller-supplied ephemeral key `k`.
    ///
    /// # Errors
    ///
    /// `InvalidEphemeralKey` unless `0 < k < p`; `MessageTooLarge` unless the
    /// message integer is below `p`.
    pub fn encrypt(&self, message: &[u8], k: &BigUint) -> Result<Vec<u8>, CryptoError> {
        if k.is_zero() || *k >= self.p {
            return Err(CryptoError::InvalidEphemeralKey);
        }

        let m = from_bytes(message);
        if m >= self.p {
            return Err(CryptoError::MessageTooLarge { bits: m.bits(), modulus_bits: self.p.bits() });
        }

        let a = self.g.modpow(k, &self.p);
        let b = (self.y.modpow(k, &self.p) * m) % &self.p;

        let width = byte_len(&self.p);
        let mut ciphertext = to_fixed_bytes(&a, width);
        ciphertext.extend_from_slice(&to_fixed_bytes(&b, width));
        Ok(ciphertext)
    }

    /// Canonical `Y,P,G` decimal encoding.
    pub fn encode(&self) -> String {
        format!("{},{},{}", self.y, self.p, self.g)
    }

    /// Parse the canonical `Y,P,G` encoding.
    pub fn decode(encoded: &str) -> Result<Self, CryptoError> {
        let fields: Vec<&str> = encoded.split(',').collect();
        let [y, p, g] = fields.as_slice() else {
            return Err(CryptoError::key_encoding("ElGamal public key must have three fields"));
        };

        let y = parse_decimal("Y", y)?;
        let p = parse_decimal("P", p)?;
        let g = parse_decimal("G", g)?;
        if p < BigUint::from(2u8) {
            return Err(CryptoError::key_encoding("P must be at least 2"));
        }

        Ok(Self { y, p, g })
    }
}

impl ElGamalPrivateKey {
    /// Prime modulus `p`.
    pub fn prime(&self) -> &BigUint {
        &self.p
    }

    /// Decrypt an `a || b` ciphertext.
    ///
    /// # Errors
    ///
    /// `InvalidCiphertext` if the ciphertext is empty, has odd length, or
    /// either half is not below `p`. `NoModularInverse` if the shared secret
    /// is not invertible.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if ciphertext.is_empty() || ciphertext.len() % 2 != 0 {
            return Err(CryptoError::ciphertext("ciphertext must have even, non-zero length"));
        }

        let (a, b) = ciphertext.split_at(ciphertext.len() / 2);
        let a = from_bytes(a);
        let b = from_bytes(b);
        if a >= self.p || b >= self.p {
            return Err(CryptoError::ciphertext("ciphertext components must be below p"));
        }

        let s = a.modpow(&self.x, &self.p);
        let s_inv = mod_inverse(&s, &self.p).ok_or(CryptoError::NoModularInverse)?;
        let m = (b * s_inv) % &self.p;

        Ok(to_minimal_bytes(&m))
    }

    /// Canonical encoding: the bare decimal `X`.
    pub fn encode(&self) -> String {
        self.x.to_string()
    }

    /// Parse a bare decimal `X` and bind it to the owner's public key, which
    /// supplies `p`.
    pub fn decode(encoded: &str, public: &ElGamalPublicKey) -> Result<Self, CryptoError> {
        let x = parse_decimal("X", encoded)?;
        if x.is_zero() || x >= public.p {
            return Err(CryptoError::key_encoding("X must satisfy 0 < X < P"));
        }

        Ok(Self { p: public.p.clone(), x })
    }
}
