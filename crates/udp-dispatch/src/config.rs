//! Server settings loaded from TOML.
//!
//! # Example
//!
//! ```toml
//! [queue]
//! capacity = 128
//! concurrency_limit = 8
//! rate_limit_interval_ms = 5
//!
//! [[listeners]]
//! address = "0.0.0.0:9000"
//! buffer_size = 1500
//!
//! [halt]
//! wait_for_drain = true
//! timeout_ms = 2000
//! ```
//!
//! Handlers cannot be expressed in TOML; attach them to the builder's
//! listener configs or to the queue configuration before building.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DispatchError, Result};
use crate::listener::ListenerConfig;
use crate::queue::{QueueConfig, StdQueue};
use crate::server::{HaltOptions, ServerBuilder};

/// Everything needed to build a server, as read from a settings file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// The queue section.
    pub queue: QueueConfig,
    /// One entry per listener.
    pub listeners: Vec<ListenerConfig>,
    /// Default shutdown behaviour.
    pub halt: HaltOptions,
}

impl ServerSettings {
    /// Parse and validate settings from a TOML string.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let settings: Self = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read, parse and validate a TOML settings file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(DispatchError::ConfigRead)?;
        tracing::debug!(target: "udp_dispatch::server", path = %path.display(), "loaded settings");
        Self::from_toml_str(&text)
    }

    /// Check every section.
    pub fn validate(&self) -> Result<()> {
        self.queue.validate()?;
        for listener in &self.listeners {
            listener.validate()?;
        }
        Ok(())
    }

    /// Create a builder with a [`StdQueue`] and the configured listeners.
    pub fn into_builder(self) -> Result<ServerBuilder<StdQueue>> {
        self.validate()?;
        Ok(ServerBuilder::new()
            .queue(StdQueue::new(self.queue)?)
            .listeners(self.listeners)
            .halt_options(self.halt))
    }
}

/// Serde adapter storing an optional [`Duration`](std::time::Duration) as whole milliseconds.
pub(crate) mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(duration) => {
                let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
                serializer.serialize_some(&millis)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_parse_full_settings() {
        let settings = ServerSettings::from_toml_str(
            r#"
            [queue]
            capacity = 16
            concurrency_limit = 4
            rate_limit_interval_ms = 25

            [[listeners]]
            address = "127.0.0.1:0"
            buffer_size = 512

            [[listeners]]
            address = "127.0.0.1:0"

            [halt]
            wait_for_drain = true
            timeout_ms = 1500
            "#,
        )
        .unwrap();

        assert_eq!(settings.queue.capacity, 16);
        assert_eq!(settings.queue.concurrency_limit, Some(4));
        assert_eq!(
            settings.queue.rate_limit_interval,
            Some(Duration::from_millis(25))
        );
        assert_eq!(settings.listeners.len(), 2);
        assert_eq!(settings.listeners[0].buffer_size, 512);
        assert_eq!(
            settings.listeners[1].buffer_size,
            crate::listener::MAX_UDP_PAYLOAD_SIZE
        );
        assert!(settings.halt.wait_for_drain);
        assert_eq!(settings.halt.timeout, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let settings = ServerSettings::from_toml_str("").unwrap();
        assert_eq!(settings.queue.capacity, 64);
        assert!(settings.listeners.is_empty());
        assert_eq!(settings.halt, HaltOptions::default());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = ServerSettings::from_toml_str("[queue]\ncapacity = 0\n").unwrap_err();
        assert!(matches!(err, DispatchError::InvalidConfig(_)));
    }

    #[test]
    fn test_zero_buffer_rejected() {
        let err = ServerSettings::from_toml_str(
            "[[listeners]]\naddress = \"127.0.0.1:0\"\nbuffer_size = 0\n",
        )
        .unwrap_err();
        assert!(matches!(err, DispatchError::InvalidConfig(_)));
    }

    #[test]
    fn test_malformed_document() {
        let err = ServerSettings::from_toml_str("[queue\ncapacity = 4").unwrap_err();
        assert!(matches!(err, DispatchError::ConfigParse(_)));
    }

    #[test]
    fn test_round_trip_to_toml() {
        let settings = ServerSettings {
            queue: QueueConfig::new(8).rate_limit_interval(Duration::from_millis(10)),
            listeners: vec![ListenerConfig::new("127.0.0.1:9000")],
            halt: HaltOptions::drain(Duration::from_secs(2)),
        };
        let text = toml::to_string(&settings).unwrap();
        assert!(text.contains("rate_limit_interval_ms = 10"));
        assert!(text.contains("timeout_ms = 2000"));

        let parsed = ServerSettings::from_toml_str(&text).unwrap();
        assert_eq!(parsed.queue.capacity, 8);
        assert_eq!(parsed.halt, settings.halt);
    }
}
