//! Fuzz target for [`Directory`] request handling
//!
//! # Strategy
//!
//! - Operation sequences over a small user ID space so collisions are common
//! - Interleaved sends and drains across several mailboxes
//! - Clock advances between operations
//!
//! # Invariants
//!
//! - Duplicate registration never changes the stored name
//! - Drains return exactly the envelopes a model queue holds, in order
//! - Public key lookups return the last registered bytes
//! - NEVER panic on any request

#![no_main]

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use arbitrary::Arbitrary;
use bytes::Bytes;
use cipherpost_core::env::Environment;
use cipherpost_proto::{Algorithm, Request, Response};
use cipherpost_server::{Directory, DirectoryConfig};
use libfuzzer_sys::fuzz_target;

#[derive(Clone, Default)]
struct FuzzEnv(Arc<AtomicU64>);

impl Environment for FuzzEnv {
    fn unix_time(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    fn sleep(&self, _duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        std::future::ready(())
    }
}

#[derive(Debug, Arbitrary)]
enum Op {
    Register { user: u8, name: u8 },
    RegisterKey { user: u8, rsa: bool, key: Vec<u8> },
    GetKey { user: u8, rsa: bool },
    Send { from: u8, to: u8, payload: Vec<u8> },
    Drain { user: u8 },
    Advance { secs: u8 },
}

fn user(id: u8) -> String {
    format!("user-{}", id % 4)
}

fn algorithm(rsa: bool) -> Algorithm {
    if rsa { Algorithm::Rsa } else { Algorithm::ElGamal }
}

fuzz_target!(|ops: Vec<Op>| {
    let env = FuzzEnv::default();
    let directory = Directory::new(env.clone(), DirectoryConfig::default());

    let mut names: HashMap<String, String> = HashMap::new();
    let mut keys: HashMap<(String, Algorithm), Vec<u8>> = HashMap::new();
    let mut queues: HashMap<String, VecDeque<Vec<u8>>> = HashMap::new();

    for op in ops {
        match op {
            Op::Register { user: id, name } => {
                let id = user(id);
                let name = name.to_string();
                let request = Request::RegisterUser { user_id: id.clone(), name: name.clone() };
                let response = directory.handle(request);
                let Response::Status(status) = response else { panic!("wrong response") };
                assert_eq!(status.success, !names.contains_key(&id));
                names.entry(id).or_insert(name);
            },
            Op::RegisterKey { user: id, rsa, key } => {
                let id = user(id);
                let registered = names.contains_key(&id);
                let result = directory.register_public_key(&id, algorithm(rsa), &key);
                assert_eq!(result.is_ok(), registered);
                if registered {
                    keys.insert((id, algorithm(rsa)), key);
                }
            },
            Op::GetKey { user: id, rsa } => {
                let id = user(id);
                let expected = keys.get(&(id.clone(), algorithm(rsa)));
                assert_eq!(directory.public_key(&id, algorithm(rsa)).ok().as_ref(), expected);
            },
            Op::Send { from, to, payload } => {
                let (from, to) = (user(from), user(to));
                let ok = names.contains_key(&from) && names.contains_key(&to);
                let result =
                    directory.send_message(&from, &to, Bytes::from(payload.clone()), Algorithm::Rsa);
                assert_eq!(result.is_ok(), ok);
                if ok {
                    queues.entry(to).or_default().push_back(payload);
                }
            },
            Op::Drain { user: id } => {
                let id = user(id);
                let got: Vec<Vec<u8>> = directory
                    .take_messages(&id)
                    .into_iter()
                    .map(|e| e.ciphertext.to_vec())
                    .collect();
                let expected: Vec<Vec<u8>> = queues.remove(&id).map(Vec::from).unwrap_or_default();
                assert_eq!(got, expected);
            },
            Op::Advance { secs } => {
                env.0.fetch_add(u64::from(secs), Ordering::SeqCst);
            },
        }
    }

    for user in directory.users() {
        assert_eq!(names.get(&user.user_id), Some(&user.name));
    }
});
