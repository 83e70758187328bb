//! Big-integer helpers shared by both cryptosystems.
//!
//! Byte conversions are big-endian throughout. "Minimal" means no leading zero
//! bytes, with zero itself encoding as the empty string.

use num_bigint::{BigInt, BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::Rng;

use crate::CryptoError;

/// Primes used for trial division before Miller-Rabin.
const SMALL_PRIMES: [u32; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];

/// Multiplicative inverse of `a` modulo `m`.
///
/// Returns `None` when `gcd(a, m) != 1` or `m < 2`.
pub fn mod_inverse(a: &BigUint, m: &BigUint) -> Option<BigUint> {
    if *m < BigUint::from(2u8) {
        return None;
    }

    let modulus = BigInt::from(m.clone());
    let value = BigInt::from(a % m);
    let egcd = value.extended_gcd(&modulus);
    if !egcd.gcd.is_one() {
        return None;
    }

    egcd.x.mod_floor(&modulus).to_biguint()
}

/// Euler's totient for two distinct primes: `(p - 1)(q - 1)`.
pub fn totient(p: &BigUint, q: &BigUint) -> BigUint {
    let one = BigUint::one();
    (p - &one) * (q - &one)
}

/// Miller-Rabin probabilistic primality test.
///
/// Composite inputs pass with probability at most `4^-rounds`. Witnesses are
/// drawn from `rng`.
pub fn is_probable_prime<R: Rng + ?Sized>(n: &BigUint, rounds: usize, rng: &mut R) -> bool {
    let two = BigUint::from(2u8);
    if *n < two {
        return false;
    }

    for small in SMALL_PRIMES {
        let small = BigUint::from(small);
        if *n == small {
            return true;
        }
        if (n % &small).is_zero() {
            return false;
        }
    }

    let one = BigUint::one();
    let n_minus_one = n - &one;

    // n - 1 = d * 2^s with d odd
    let s = n_minus_one.trailing_zeros().unwrap_or(0);
    let d = &n_minus_one >> s;

    'witness: for _ in 0..rounds {
        // a in [2, n - 2]
        let a = rng.gen_biguint_range(&two, &n_minus_one);
        let mut x = a.modpow(&d, n);
        if x == one || x == n_minus_one {
            continue;
        }

        for _ in 1..s {
            x = x.modpow(&two, n);
            if x == n_minus_one {
                continue 'witness;
            }
            if x == one {
                return false;
            }
        }

        return false;
    }

    true
}

/// Parse a canonical ASCII-decimal integer.
///
/// Only digits are accepted: no sign, whitespace or separators.
pub fn parse_decimal(field: &str, value: &str) -> Result<BigUint, CryptoError> {
    if value.is_empty() {
        return Err(CryptoError::key_encoding(format!("{field} is empty")));
    }
    if !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CryptoError::key_encoding(format!("{field} is not a decimal integer")));
    }

    BigUint::parse_bytes(value.as_bytes(), 10)
        .ok_or_else(|| CryptoError::key_encoding(format!("{field} is not a decimal integer")))
}

/// Interpret bytes as a big-endian unsigned integer.
pub fn from_bytes(bytes: &[u8]) -> BigUint {
    BigUint::from_bytes_be(bytes)
}

/// Minimal big-endian encoding. Zero encodes as an empty vector.
pub fn to_minimal_bytes(value: &BigUint) -> Vec<u8> {
    if value.is_zero() { Vec::new() } else { value.to_bytes_be() }
}

/// Big-endian encoding left-padded with zeros to `width` bytes.
///
/// Values wider than `width` are returned unpadded.
pub fn to_fixed_bytes(value: &BigUint, width: usize) -> Vec<u8> {
    let bytes = to_minimal_bytes(value);
    if bytes.len() >= width {
        return bytes;
    }

    let mut padded = vec![0u8; width - bytes.len()];
    padded.extend_from_slice(&bytes);
    padded
}

/// Number of bytes in the minimal encoding of `value`.
pub fn byte_len(value: &BigUint) -> usize {
    usize::try_from(value.bits().div_ceil(8)).unwrap_or(usize::MAX)
}
