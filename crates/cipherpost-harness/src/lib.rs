//! Deterministic simulation harness for Cipherpost.
//!
//! This crate provides Turmoil-based implementations of the `Environment`
//! and `Relay` traits plus a simulated directory host, so whole conversations
//! (registration, key publication, sends, background polling) run under
//! injected latency and packet loss with reproducible results.
//!
//! # Example
//!
//! ```rust,ignore
//! use cipherpost_harness::{SimEnv, SimRelay, run_directory};
//!
//! let mut sim = turmoil::Builder::new().build();
//! sim.host("server", || run_directory(SimEnv::new()));
//! sim.client("alice", async {
//!     let relay = SimRelay::new("server");
//!     // Client logic...
//!     Ok(())
//! });
//! sim.run().unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod sim_env;
mod sim_relay;
mod sim_server;

pub use sim_env::{SIM_EPOCH, SimEnv};
pub use sim_relay::{SIM_REQUEST_TIMEOUT, SimRelay};
pub use sim_server::{DIRECTORY_PORT, run_directory, serve_directory};
