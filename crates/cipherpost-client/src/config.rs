//! Client configuration.

use std::time::Duration;

/// Default delay between mailbox polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default number of private exponent suggestions offered.
pub const DEFAULT_SUGGESTION_COUNT: usize = 10;

/// Default deadline for one relay connect or request/response exchange.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client tuning.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Delay between background mailbox polls
    pub poll_interval: Duration,
    /// How many RSA private exponents [`crate::Client::suggest_rsa_exponents`] returns
    pub suggestion_count: usize,
    /// Deadline for each relay connect and each request/response exchange
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            suggestion_count: DEFAULT_SUGGESTION_COUNT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}
