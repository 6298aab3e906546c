//! Client configuration

use pail_core::{AttemptStrategy, Region, TransportOptions, US_EAST_1};
use std::time::Duration;

/// Client configuration
///
/// The region to talk to, how persistently to retry, and which error
/// codes count as transient are all explicit values here, so two
/// clients with different settings can coexist and tests get
/// reproducible behavior.
#[derive(Clone, Debug)]
pub struct Config {
    /// Region endpoint configuration
    pub region: Region,
    /// Whole-operation retry policy for idempotent calls
    pub attempts: AttemptStrategy,
    /// Transport-level delivery options
    pub transport: TransportOptions,
    /// Error codes treated as transient by the operation retry loop
    pub transient_error_codes: Vec<String>,
    /// User agent string
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            region: US_EAST_1,
            attempts: AttemptStrategy {
                min: 5,
                total: Duration::from_secs(5),
                delay: Duration::from_millis(200),
            },
            transport: TransportOptions::default(),
            transient_error_codes: ["InternalError", "NoSuchUpload", "NoSuchBucket"]
                .map(String::from)
                .to_vec(),
            user_agent: format!("pail/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Config {
    /// Create a config for the given region
    pub fn new(region: Region) -> Self {
        Self {
            region,
            ..Default::default()
        }
    }

    /// Set the whole-operation retry strategy
    pub fn with_attempts(mut self, attempts: AttemptStrategy) -> Self {
        self.attempts = attempts;
        self
    }

    /// Set the transport delivery options
    pub fn with_transport(mut self, transport: TransportOptions) -> Self {
        self.transport = transport;
        self
    }

    /// Replace the transient error code set
    pub fn with_transient_error_codes(
        mut self,
        codes: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.transient_error_codes = codes.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_policy() {
        let config = Config::default();
        assert_eq!(config.attempts.min, 5);
        assert_eq!(config.attempts.total, Duration::from_secs(5));
        assert_eq!(config.attempts.delay, Duration::from_millis(200));
        assert_eq!(config.transport.max_tries, 3);
        assert!(config
            .transient_error_codes
            .iter()
            .any(|code| code == "NoSuchBucket"));
    }

    #[test]
    fn transient_codes_can_be_replaced() {
        let config = Config::default().with_transient_error_codes(["InternalError"]);
        assert_eq!(config.transient_error_codes, vec!["InternalError"]);
    }
}
