//! Textbook RSA with a caller-chosen private exponent.
//!
//! The usual convention fixes `e` and derives `d`. Here the caller picks `d`
//! and `e` is derived as `d^-1 mod φ(n)`. [`suggest_private_exponents`] helps
//! pick a `d` that has an inverse.
//!
//! Messages are a single block: the plaintext bytes are read as a big-endian
//! integer `m` with `0 <= m < n`. Leading zero bytes of the plaintext do not
//! survive the round trip.

use std::fmt;

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::Rng;

use crate::{
    CryptoError, PRIMALITY_ROUNDS,
    arith::{from_bytes, is_probable_prime, mod_inverse, parse_decimal, to_minimal_bytes, totient},
};

/// RSA public key `(n, e)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaPublicKey {
    n: BigUint,
    e: BigUint,
}

/// RSA private key `(n, d)`.
#[derive(Clone, PartialEq, Eq)]
pub struct RsaPrivateKey {
    n: BigUint,
    d: BigUint,
}

/// A derived key pair, including the primes it came from.
#[derive(Clone)]
pub struct RsaKeyPair {
    public: RsaPublicKey,
    private: RsaPrivateKey,
    p: BigUint,
    q: BigUint,
}

impl fmt::Debug for RsaPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaPrivateKey")
            .field("n", &self.n)
            .field("d", &format_args!("<redacted {} bits>", self.d.bits()))
            .finish()
    }
}

impl fmt::Debug for RsaKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaKeyPair")
            .field("public", &self.public)
            .field("private", &self.private)
            .finish_non_exhaustive()
    }
}

/// Derive a key pair from two primes and a chosen private exponent.
///
/// Both primes are checked with [`PRIMALITY_ROUNDS`] rounds of Miller-Rabin
/// using witnesses from `rng`.
///
/// # Errors
///
/// `InvalidKeyMaterial` if an input is zero, a prime fails the primality
/// test, `p == q`, or `d` has no inverse modulo `φ(n)`.
pub fn derive_key_pair<R: Rng + ?Sized>(
    p: &BigUint,
    q: &BigUint,
    d: &BigUint,
    rng: &mut R,
) -> Result<RsaKeyPair, CryptoError> {
    if p.is_zero() || q.is_zero() || d.is_zero() {
        return Err(CryptoError::key_material("p, q and d must all be provided"));
    }
    if !is_probable_prime(p, PRIMALITY_ROUNDS, rng) {
        return Err(CryptoError::key_material("p is not prime"));
    }
    if !is_probable_prime(q, PRIMALITY_ROUNDS, rng) {
        return Err(CryptoError::key_material("q is not prime"));
    }
    if p == q {
        return Err(CryptoError::key_material("p and q must be distinct"));
    }

    let n = p * q;
    let phi = totient(p, q);
    let e = mod_inverse(d, &phi)
        .ok_or_else(|| CryptoError::key_material("d has no inverse modulo phi(n)"))?;

    Ok(RsaKeyPair {
        public: RsaPublicKey { n: n.clone(), e },
        private: RsaPrivateKey { n, d: d.clone() },
        p: p.clone(),
        q: q.clone(),
    })
}

/// The first `count` odd integers from 3 upward that are invertible modulo
/// `φ(p, q)`, in increasing order.
///
/// Pure and deterministic. No primality check is made here; callers pass the
/// same primes they will later hand to [`derive_key_pair`].
///
/// # Errors
///
/// `InvalidKeyMaterial` if `φ(p, q) < 3`, where no odd candidate can qualify.
pub fn suggest_private_exponents(
    p: &BigUint,
    q: &BigUint,
    count: usize,
) -> Result<Vec<BigUint>, CryptoError> {
    let one = BigUint::one();
    if *p <= one || *q <= one {
        return Err(CryptoError::key_material("p and q must be greater than 1"));
    }

    let phi = totient(p, q);
    if phi < BigUint::from(3u8) {
        return Err(CryptoError::key_material("phi(n) too small to suggest exponents"));
    }

    let two = BigUint::from(2u8);
    let mut candidates = Vec::with_capacity(count);
    let mut d = BigUint::from(3u8);
    while candidates.len() < count {
        if d.gcd(&phi).is_one() && mod_inverse(&d, &phi).is_some() {
            candidates.push(d.clone());
        }
        d += &two;
    }

    Ok(candidates)
}

impl RsaKeyPair {
    /// Public half.
    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    /// Private half.
    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private
    }

    /// The primes `(p, q)` the pair was derived from.
    pub fn primes(&self) -> (&BigUint, &BigUint) {
        (&self.p, &self.q)
    }
}

impl RsaPublicKey {
    /// Modulus `n`.
    pub fn modulus(&self) -> &BigUint {
        &self.n
    }

    /// Public exponent `e`.
    pub fn exponent(&self) -> &BigUint {
        &self.e
    }

    /// `c = m^e mod n`, serialized as minimal big-endian bytes.
    ///
    /// # Errors
    ///
    /// `MessageTooLarge` if the message integer is not below `n`.
    pub fn encrypt(&self, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let m = from_bytes(message);
        if m >= self.n {
            return Err(CryptoError::MessageTooLarge { bits: m.bits(), modulus_bits: self.n.bits() });
        }

        Ok(to_minimal_bytes(&m.modpow(&self.e, &self.n)))
    }

    /// Canonical `n,e` decimal encoding.
    pub fn encode(&self) -> String {
        format!("{},{}", self.n, self.e)
    }

    /// Parse the canonical `n,e` encoding.
    pub fn decode(encoded: &str) -> Result<Self, CryptoError> {
        let (n, e) = split_pair(encoded, "RSA public key")?;
        let n = parse_modulus("n", n)?;
        let e = parse_decimal("e", e)?;
        Ok(Self { n, e })
    }
}

impl RsaPrivateKey {
    /// Modulus `n`.
    pub fn modulus(&self) -> &BigUint {
        &self.n
    }

    /// `m = c^d mod n`, returned as minimal big-endian bytes.
    ///
    /// # Errors
    ///
    /// `InvalidCiphertext` if the ciphertext integer is not below `n`.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let c = from_bytes(ciphertext);
        if c >= self.n {
            return Err(CryptoError::ciphertext("ciphertext is not below the modulus"));
        }

        Ok(to_minimal_bytes(&c.modpow(&self.d, &self.n)))
    }

    /// Canonical `n,d` decimal encoding.
    pub fn encode(&self) -> String {
        format!("{},{}", self.n, self.d)
    }

    /// Parse the canonical `n,d` encoding.
    pub fn decode(encoded: &str) -> Result<Self, CryptoError> {
        let (n, d) = split_pair(encoded, "RSA private key")?;
        let n = parse_modulus("n", n)?;
        let d = parse_decimal("d", d)?;
        Ok(Self { n, d })
    }
}

fn split_pair<'a>(encoded: &'a str, what: &str) -> Result<(&'a str, &'a str), CryptoError> {
    let mut parts = encoded.split(',');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(a), Some(b), None) => Ok((a, b)),
        _ => Err(CryptoError::key_encoding(format!("{what} must have exactly two fields"))),
    }
}

fn parse_modulus(field: &str, value: &str) -> Result<BigUint, CryptoError> {
    let n = parse_decimal(field, value)?;
    if n < BigUint::from(2u8) {
        return Err(CryptoError::key_encoding(format!("{field} must be at least 2")));
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;

    fn big(n: u64) -> BigUint {
        BigUint::from(n)
    }

    fn rng() -> ChaCha20Rng {
        ChaCha20Rng::seed_from_u64(42)
    }

    fn textbook_pair() -> RsaKeyPair {
        derive_key_pair(&big(61), &big(53), &big(2753), &mut rng()).unwrap()
    }

    #[test]
    fn derive_computes_textbook_exponent() {
        let pair = textbook_pair();
        assert_eq!(pair.public_key().modulus(), &big(3233));
        assert_eq!(pair.public_key().exponent(), &big(17));
        assert_eq!(pair.primes(), (&big(61), &big(53)));
    }

    #[test]
    fn derive_rejects_composite_prime() {
        let result = derive_key_pair(&big(60), &big(53), &big(7), &mut rng());
        assert!(matches!(result, Err(CryptoError::InvalidKeyMaterial { .. })));

        let result = derive_key_pair(&big(61), &big(91), &big(7), &mut rng());
        assert!(matches!(result, Err(CryptoError::InvalidKeyMaterial { .. })));
    }

    #[test]
    fn derive_rejects_missing_input() {
        let result = derive_key_pair(&big(61), &big(53), &big(0), &mut rng());
        assert!(matches!(result, Err(CryptoError::InvalidKeyMaterial { .. })));
    }

    #[test]
    fn derive_rejects_equal_primes() {
        let result = derive_key_pair(&big(61), &big(61), &big(7), &mut rng());
        assert!(matches!(result, Err(CryptoError::InvalidKeyMaterial { .. })));
    }

    #[test]
    fn derive_rejects_non_invertible_d() {
        // phi = 3120, gcd(15, 3120) = 15
        let result = derive_key_pair(&big(61), &big(53), &big(15), &mut rng());
        assert!(matches!(result, Err(CryptoError::InvalidKeyMaterial { .. })));
    }

    #[test]
    fn encrypt_decrypt_textbook_value() {
        let pair = textbook_pair();
        let c = pair.public_key().encrypt(&[65]).unwrap();
        // 65^17 mod 3233 = 2790
        assert_eq!(from_bytes(&c), big(2790));
        assert_eq!(pair.private_key().decrypt(&c).unwrap(), vec![65]);
    }

    #[test]
    fn encrypt_rejects_message_at_modulus() {
        let pair = textbook_pair();
        let m = to_minimal_bytes(&big(3233));
        let result = pair.public_key().encrypt(&m);
        assert!(matches!(result, Err(CryptoError::MessageTooLarge { .. })));
    }

    #[test]
    fn leading_zero_bytes_are_lost() {
        let pair = textbook_pair();
        let c = pair.public_key().encrypt(&[0, 0, 7]).unwrap();
        assert_eq!(pair.private_key().decrypt(&c).unwrap(), vec![7]);
    }

    #[test]
    fn empty_message_round_trips() {
        let pair = textbook_pair();
        let c = pair.public_key().encrypt(&[]).unwrap();
        assert!(c.is_empty());
        assert!(pair.private_key().decrypt(&c).unwrap().is_empty());
    }

    #[test]
    fn decrypt_rejects_oversized_ciphertext() {
        let pair = textbook_pair();
        let result = pair.private_key().decrypt(&[0xff, 0xff]);
        assert!(matches!(result, Err(CryptoError::InvalidCiphertext { .. })));
    }

    #[test]
    fn encodings_are_canonical() {
        let pair = textbook_pair();
        assert_eq!(pair.public_key().encode(), "3233,17");
        assert_eq!(pair.private_key().encode(), "3233,2753");

        assert_eq!(RsaPublicKey::decode("3233,17").unwrap(), *pair.public_key());
        assert_eq!(RsaPrivateKey::decode("3233,2753").unwrap(), *pair.private_key());
    }

    #[test]
    fn decode_rejects_malformed_input() {
        for bad in ["", "3233", "3233,17,1", "3233,", ",17", "32a3,17", "3233, 17", "1,17"] {
            assert!(
                matches!(RsaPublicKey::decode(bad), Err(CryptoError::InvalidKeyEncoding { .. })),
                "{bad:?} should be rejected"
            );
        }
        assert!(matches!(
            RsaPrivateKey::decode("0,5"),
            Err(CryptoError::InvalidKeyEncoding { .. })
        ));
    }

    #[test]
    fn suggestions_match_known_sequence() {
        // phi(61, 53) = 3120 = 2^4 * 3 * 5 * 13
        let ds = suggest_private_exponents(&big(61), &big(53), 5).unwrap();
        assert_eq!(ds, vec![big(7), big(11), big(17), big(19), big(23)]);
    }

    #[test]
    fn suggestions_reject_degenerate_primes() {
        let result = suggest_private_exponents(&big(2), &big(3), 3);
        assert!(matches!(result, Err(CryptoError::InvalidKeyMaterial { .. })));
    }

    #[test]
    fn suggestions_are_usable() {
        let p = big(1009);
        let q = big(1013);
        for d in suggest_private_exponents(&p, &q, 10).unwrap() {
            assert!(derive_key_pair(&p, &q, &d, &mut rng()).is_ok());
        }
    }

    #[test]
    fn private_key_debug_redacts_exponent() {
        let pair = textbook_pair();
        let debug = format!("{:?}", pair.private_key());
        assert!(!debug.contains("2753"));
        assert!(debug.contains("redacted"));
    }
}
