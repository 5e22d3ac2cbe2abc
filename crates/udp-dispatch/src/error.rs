//! Error types for the dispatch framework.

use std::time::Duration;

use thiserror::Error;

/// A boxed error used for halt reasons and stop hook failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by queues, listeners and servers.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The server was set up without a queue.
    #[error("no queue attached to server")]
    NoQueue,

    /// A listener address could not be bound.
    #[error("failed to bind {address}: {source}")]
    Bind {
        /// The configured bind address.
        address: String,
        /// The underlying socket error.
        #[source]
        source: std::io::Error,
    },

    /// In-flight workers did not finish before the halt timeout elapsed.
    #[error("halt timed out after {0:?}")]
    HaltTimedOut(Duration),

    /// The listener has already been bound or started.
    #[error("listener already running on {0}")]
    ListenerAlreadyRunning(String),

    /// The listener is not running.
    #[error("listener not running on {0}")]
    ListenerNotRunning(String),

    /// The server has already been set up.
    #[error("server already running")]
    AlreadyRunning,

    /// The server is not running (never set up, or already halting).
    #[error("server not running")]
    NotRunning,

    /// The queue has been closed and accepts no more events.
    #[error("queue closed")]
    QueueClosed,

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A settings document could not be parsed.
    #[error("failed to parse settings: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// A settings file could not be read.
    #[error("failed to read settings: {0}")]
    ConfigRead(#[source] std::io::Error),
}

/// A specialized Result type for dispatch operations.
pub type Result<T> = std::result::Result<T, DispatchError>;
