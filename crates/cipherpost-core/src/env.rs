//! Environment abstraction for deterministic testing.
//!
//! The `Environment` trait decouples directory and client logic from the
//! system clock. Production code uses wall-clock time and tokio timers; tests
//! substitute a manually advanced clock.
//!
//! # Invariants
//!
//! - Monotonicity: `unix_time()` must never go backwards within one
//!   environment
//! - Isolation: Implementations must not share global state

use std::time::Duration;

/// Abstract environment providing wall-clock time and async sleeping.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Current time as whole seconds since the unix epoch.
    ///
    /// Used for envelope timestamps and presence tracking.
    fn unix_time(&self) -> u64;

    /// Sleeps for the specified duration.
    ///
    /// Only driver code (the background poller) sleeps; directory and key
    /// store logic never does.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;
}
