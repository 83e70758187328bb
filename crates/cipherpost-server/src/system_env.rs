//! Production Environment implementation using the system clock.
//!
//! This module provides `SystemEnv`, the production implementation of the
//! `Environment` trait backed by wall-clock time and tokio timers.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use cipherpost_core::env::Environment;

/// Production environment using system time.
///
/// This implementation:
/// - Uses `SystemTime::now()` for unix timestamps
/// - Uses `tokio::time::sleep()` for async sleeping
#[derive(Clone, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    fn unix_time(&self) -> u64 {
        // A clock set before 1970 reports the epoch rather than panicking.
        SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |elapsed| elapsed.as_secs())
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_env_reports_current_unix_time() {
        let env = SystemEnv::new();

        // 2020-01-01T00:00:00Z
        assert!(env.unix_time() > 1_577_836_800, "Clock should be past 2020");
    }

    #[test]
    fn system_env_time_never_goes_backwards() {
        let env = SystemEnv::new();

        let t1 = env.unix_time();
        std::thread::sleep(Duration::from_millis(10));
        let t2 = env.unix_time();

        assert!(t2 >= t1, "Time should not go backwards");
    }

    #[tokio::test]
    async fn system_env_sleep_works() {
        let env = SystemEnv::new();

        let start = std::time::Instant::now();
        env.sleep(Duration::from_millis(50)).await;

        assert!(start.elapsed() >= Duration::from_millis(50), "Sleep should wait at least 50ms");
    }
}
