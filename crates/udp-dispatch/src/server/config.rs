//! Options controlling server shutdown.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How [`Server::halt`](super::Server::halt) treats outstanding work.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HaltOptions {
    /// Dispatch buffered events and wait for running workers before reporting.
    pub wait_for_drain: bool,
    /// Upper bound on the drain. `None` or zero waits indefinitely.
    #[serde(
        rename = "timeout_ms",
        with = "crate::config::millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub timeout: Option<Duration>,
}

impl HaltOptions {
    /// Options that report immediately and discard buffered events.
    pub fn new() -> Self {
        Self::default()
    }

    /// Options that drain, giving up after `timeout`.
    pub fn drain(timeout: Duration) -> Self {
        Self {
            wait_for_drain: true,
            timeout: Some(timeout),
        }
    }

    /// Set whether to drain outstanding work.
    pub fn wait_for_drain(mut self, wait: bool) -> Self {
        self.wait_for_drain = wait;
        self
    }

    /// Bound the drain.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The drain bound, treating zero as unbounded.
    pub fn effective_timeout(&self) -> Option<Duration> {
        self.timeout.filter(|timeout| !timeout.is_zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_does_not_drain() {
        let options = HaltOptions::default();
        assert!(!options.wait_for_drain);
        assert_eq!(options.effective_timeout(), None);
    }

    #[test]
    fn test_zero_timeout_is_unbounded() {
        let options = HaltOptions::new()
            .wait_for_drain(true)
            .timeout(Duration::ZERO);
        assert_eq!(options.effective_timeout(), None);

        let options = HaltOptions::drain(Duration::from_millis(250));
        assert!(options.wait_for_drain);
        assert_eq!(options.effective_timeout(), Some(Duration::from_millis(250)));
    }
}
