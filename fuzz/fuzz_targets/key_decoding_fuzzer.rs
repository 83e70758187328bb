//! Fuzz target for canonical key decoding
//!
//! Keys arrive from the directory verbatim, so any string may reach the
//! decoders.
//!
//! # Invariants
//!
//! - NEVER panic on malformed input
//! - A decoded key survives an encode/decode round trip unchanged
//! - Decryption under any decoded key either succeeds or returns an error

#![no_main]

use arbitrary::Arbitrary;
use cipherpost_crypto::{
    elgamal::{ElGamalPrivateKey, ElGamalPublicKey},
    rsa::{RsaPrivateKey, RsaPublicKey},
};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    public: String,
    private: String,
    ciphertext: Vec<u8>,
}

fuzz_target!(|input: FuzzInput| {
    // Keep modular exponentiation cheap.
    if input.public.len() > 256 || input.private.len() > 256 {
        return;
    }

    if let Ok(key) = RsaPublicKey::decode(&input.public) {
        assert_eq!(RsaPublicKey::decode(&key.encode()), Ok(key.clone()));
        let _ = key.encrypt(&input.ciphertext);
    }

    if let Ok(key) = RsaPrivateKey::decode(&input.private) {
        assert_eq!(RsaPrivateKey::decode(&key.encode()), Ok(key.clone()));
        let _ = key.decrypt(&input.ciphertext);
    }

    if let Ok(public) = ElGamalPublicKey::decode(&input.public) {
        assert_eq!(ElGamalPublicKey::decode(&public.encode()), Ok(public.clone()));

        if let Ok(private) = ElGamalPrivateKey::decode(&input.private, &public) {
            assert_eq!(ElGamalPrivateKey::decode(&private.encode(), &public), Ok(private.clone()));
            let _ = private.decrypt(&input.ciphertext);
        }
    }
});
