//! Simulated environment driven by turmoil's virtual clock.

use std::time::Duration;

use cipherpost_core::env::Environment;

/// Unix time at the start of every simulation (2023-11-14T22:13:20Z).
pub const SIM_EPOCH: u64 = 1_700_000_000;

/// Environment for code running inside a turmoil host.
///
/// Time is [`SIM_EPOCH`] plus the simulated time elapsed so far; sleeping
/// advances virtual time only.
#[derive(Clone, Default)]
pub struct SimEnv;

impl SimEnv {
    /// Create a new simulated environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SimEnv {
    fn unix_time(&self) -> u64 {
        SIM_EPOCH + turmoil::sim_elapsed().unwrap_or_default().as_secs()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}
