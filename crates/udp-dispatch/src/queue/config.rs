//! Configuration for queues.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::error::{DispatchError, Result};
use crate::event::Handlers;

/// Configuration for a [`BasicQueue`](super::BasicQueue) or [`StdQueue`](super::StdQueue).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum number of buffered, undispatched events.
    pub capacity: usize,
    /// Maximum number of simultaneously running workers. `None` or 0 means unlimited.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency_limit: Option<usize>,
    /// Minimum spacing between dequeues. `None` or zero means unlimited.
    #[serde(
        rename = "rate_limit_interval_ms",
        with = "crate::config::millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub rate_limit_interval: Option<Duration>,
    /// Handlers that replace those of every event passing through the queue.
    #[serde(skip)]
    pub handlers: Option<Handlers>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: 64,
            concurrency_limit: None,
            rate_limit_interval: None,
            handlers: None,
        }
    }
}

impl QueueConfig {
    /// Create a configuration with the given buffer capacity and no limits.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    /// Set the buffer capacity.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Cap the number of simultaneously running workers.
    pub fn concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = Some(limit);
        self
    }

    /// Require at least `interval` between successive dequeues.
    pub fn rate_limit_interval(mut self, interval: Duration) -> Self {
        self.rate_limit_interval = Some(interval);
        self
    }

    /// Override the handlers of every event passing through the queue.
    pub fn handlers(mut self, handlers: Handlers) -> Self {
        self.handlers = Some(handlers);
        self
    }

    /// The concurrency limit with 0 normalized to unlimited.
    pub fn effective_concurrency_limit(&self) -> Option<usize> {
        self.concurrency_limit.filter(|limit| *limit > 0)
    }

    /// The rate limit interval with zero normalized to unlimited.
    pub fn effective_rate_limit(&self) -> Option<Duration> {
        self.rate_limit_interval.filter(|interval| !interval.is_zero())
    }

    /// Check that the configuration can build a queue.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(DispatchError::InvalidConfig(
                "queue capacity must be at least 1".into(),
            ));
        }
        if self.capacity > Semaphore::MAX_PERMITS {
            return Err(DispatchError::InvalidConfig(format!(
                "queue capacity must not exceed {}",
                Semaphore::MAX_PERMITS
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = QueueConfig::new(16)
            .concurrency_limit(4)
            .rate_limit_interval(Duration::from_millis(250));

        assert_eq!(config.capacity, 16);
        assert_eq!(config.effective_concurrency_limit(), Some(4));
        assert_eq!(config.effective_rate_limit(), Some(Duration::from_millis(250)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_limits_are_unlimited() {
        let config = QueueConfig::new(1)
            .concurrency_limit(0)
            .rate_limit_interval(Duration::ZERO);

        assert_eq!(config.effective_concurrency_limit(), None);
        assert_eq!(config.effective_rate_limit(), None);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = QueueConfig::new(0).validate().unwrap_err();
        assert!(matches!(err, DispatchError::InvalidConfig(_)));
    }

    #[test]
    fn test_capacity_above_permit_limit_rejected() {
        assert!(QueueConfig::new(Semaphore::MAX_PERMITS).validate().is_ok());
        let err = QueueConfig::new(Semaphore::MAX_PERMITS + 1)
            .validate()
            .unwrap_err();
        assert!(matches!(err, DispatchError::InvalidConfig(_)));
    }
}
