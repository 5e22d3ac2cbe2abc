//! Configuration types for listeners.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::error::{DispatchError, Result};
use crate::event::{DatagramEvent, Handlers};

/// The largest payload a UDP datagram can carry in practice.
pub const MAX_UDP_PAYLOAD_SIZE: usize = 65527;

/// Receives every event a listener produces.
///
/// The server installs one that enqueues onto its queue. Returning
/// [`DispatchError::QueueClosed`] stops the read loop; other errors are
/// logged and the loop continues.
pub type InitialHandler = Arc<dyn Fn(DatagramEvent) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Configuration for a [`Listener`](super::Listener).
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// The `host:port` to bind. Use port 0 for an OS-assigned port.
    pub address: String,
    /// Read buffer size in bytes. Bytes of larger datagrams are discarded.
    pub buffer_size: usize,
    /// Callbacks attached to every event read by this listener.
    #[serde(skip)]
    pub handlers: Handlers,
    /// Replaces the server's default enqueue as the receiver of events.
    #[serde(skip)]
    pub initial_handler: Option<InitialHandler>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0:0".into(),
            buffer_size: MAX_UDP_PAYLOAD_SIZE,
            handlers: Handlers::default(),
            initial_handler: None,
        }
    }
}

impl ListenerConfig {
    /// Create a configuration that binds to `address` (`host:port`).
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Default::default()
        }
    }

    /// Create a configuration that binds to any address on the specified port.
    pub fn any_address(port: u16) -> Self {
        Self::new(format!("0.0.0.0:{port}"))
    }

    /// Set the read buffer size.
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Set both handlers.
    pub fn handlers(mut self, handlers: Handlers) -> Self {
        self.handlers = handlers;
        self
    }

    /// Set the packet handler.
    pub fn on_packet<F>(mut self, handler: F) -> Self
    where
        F: Fn(&crate::event::Responder, &DatagramEvent) + Send + Sync + 'static,
    {
        self.handlers = self.handlers.on_packet(handler);
        self
    }

    /// Set the error handler.
    pub fn on_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(&std::io::Error) + Send + Sync + 'static,
    {
        self.handlers = self.handlers.on_error(handler);
        self
    }

    /// Deliver events to `handler` instead of the server's queue.
    pub fn initial_handler(mut self, handler: InitialHandler) -> Self {
        self.initial_handler = Some(handler);
        self
    }

    /// Check that the configuration can bind a listener.
    pub fn validate(&self) -> Result<()> {
        if self.address.trim().is_empty() {
            return Err(DispatchError::InvalidConfig(
                "listener address must not be empty".into(),
            ));
        }
        if self.buffer_size == 0 {
            return Err(DispatchError::InvalidConfig(format!(
                "listener {} needs a buffer of at least 1 byte",
                self.address
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for ListenerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerConfig")
            .field("address", &self.address)
            .field("buffer_size", &self.buffer_size)
            .field("initial_handler", &self.initial_handler.is_some())
            .finish()
    }
}
