//! Builder for [`Server`](super::Server).

use std::sync::Arc;

use super::config::HaltOptions;
use super::lifecycle::{Server, StopHook};
use crate::error::BoxError;
use crate::listener::{Listener, ListenerConfig};
use crate::queue::Queue;

/// Collects the queue, listeners and stop hooks of a server.
///
/// # Example
///
/// ```ignore
/// let server = ServerBuilder::new()
///     .queue(StdQueue::new(QueueConfig::new(16).concurrency_limit(4))?)
///     .listener(ListenerConfig::new("127.0.0.1:9000").on_packet(handle))
///     .on_halt(|reason| {
///         println!("stopping: {reason}");
///         Ok(())
///     })
///     .build();
/// ```
pub struct ServerBuilder<Q: Queue> {
    queue: Option<Arc<Q>>,
    listeners: Vec<ListenerConfig>,
    hooks: Vec<StopHook>,
    halt_options: HaltOptions,
}

impl<Q: Queue> Default for ServerBuilder<Q> {
    fn default() -> Self {
        Self {
            queue: None,
            listeners: Vec::new(),
            hooks: Vec::new(),
            halt_options: HaltOptions::default(),
        }
    }
}

impl<Q: Queue> ServerBuilder<Q> {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the queue events are buffered in.
    pub fn queue(self, queue: Q) -> Self {
        self.shared_queue(Arc::new(queue))
    }

    /// Set a queue that is also held elsewhere.
    pub fn shared_queue(mut self, queue: Arc<Q>) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Add a listener.
    pub fn listener(mut self, config: ListenerConfig) -> Self {
        self.listeners.push(config);
        self
    }

    /// Add several listeners.
    pub fn listeners(mut self, configs: impl IntoIterator<Item = ListenerConfig>) -> Self {
        self.listeners.extend(configs);
        self
    }

    /// Register a callback run during shutdown with the halt reason.
    pub fn on_halt<F>(mut self, hook: F) -> Self
    where
        F: Fn(&(dyn std::error::Error + Send + Sync + 'static)) -> Result<(), BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.hooks.push(Arc::new(hook));
        self
    }

    /// Set the options returned by [`Server::halt_options`].
    pub fn halt_options(mut self, options: HaltOptions) -> Self {
        self.halt_options = options;
        self
    }

    /// Build the server. Nothing is bound until [`Server::setup`].
    pub fn build(self) -> Server<Q> {
        let listeners = self.listeners.into_iter().map(Listener::new).collect();
        Server::from_parts(self.queue, listeners, self.hooks, self.halt_options)
    }
}

impl<Q: Queue> std::fmt::Debug for ServerBuilder<Q> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerBuilder")
            .field("queue", &self.queue.is_some())
            .field("listeners", &self.listeners)
            .field("hooks", &self.hooks.len())
            .field("halt_options", &self.halt_options)
            .finish()
    }
}
