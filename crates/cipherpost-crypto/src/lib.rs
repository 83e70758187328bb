//! Cipherpost Cryptographic Primitives
//!
//! Textbook RSA and ElGamal over arbitrary-precision integers, built from
//! caller-supplied parameters.
//!
//! # Design
//!
//! All functions in this crate are pure. Anything that needs randomness (the
//! Miller-Rabin witnesses, the ElGamal ephemeral key) takes it from the
//! caller, which keeps tests deterministic under a seeded RNG.
//!
//! # Security Properties
//!
//! None worth relying on. There is no padding, messages are a single block
//! interpreted as a big-endian integer, and RSA uses a caller-chosen private
//! exponent. The crate exists to demonstrate the arithmetic.
//!
//! # Encodings
//!
//! Keys travel as ASCII decimal:
//!
//! | Key             | Encoding  |
//! |-----------------|-----------|
//! | RSA public      | `n,e`     |
//! | RSA private     | `n,d`     |
//! | ElGamal public  | `Y,P,G`   |
//! | ElGamal private | `X`       |

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod arith;
pub mod elgamal;
mod error;
pub mod rsa;

pub use error::CryptoError;
pub use num_bigint::BigUint;

/// Number of Miller-Rabin rounds applied to every caller-supplied prime.
pub const PRIMALITY_ROUNDS: usize = 20;
