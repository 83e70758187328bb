//! Fuzz target for length-prefixed CBOR frame decoding
//!
//! # Invariants
//!
//! - NEVER panic on arbitrary bytes
//! - Consumed length never exceeds the buffer
//! - A decoded request re-encodes and decodes to the same value

#![no_main]

use cipherpost_proto::{Request, Response, frame};
use libfuzzer_sys::fuzz_target;

const MAX: usize = 64 * 1024;

fuzz_target!(|data: &[u8]| {
    if let Ok((request, consumed)) = frame::decode::<Request>(data, MAX) {
        assert!(consumed <= data.len());

        let mut buf = Vec::new();
        frame::encode(&request, &mut buf, MAX).expect("decoded request must re-encode");
        let (again, used) =
            frame::decode::<Request>(&buf, MAX).expect("re-encoded request must decode");
        assert_eq!(again, request);
        assert_eq!(used, buf.len());
    }

    if let Ok((_, consumed)) = frame::decode::<Response>(data, MAX) {
        assert!(consumed <= data.len());
    }
});
