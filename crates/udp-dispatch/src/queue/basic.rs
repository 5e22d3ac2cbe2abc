//! Queue without admission limits.

use tokio::sync::Notify;

use super::buffer::EventBuffer;
use super::config::QueueConfig;
use super::workers::InFlight;
use super::Queue;
use crate::error::Result;
use crate::event::DatagramEvent;

/// A buffered queue that admits an event whenever one is available.
///
/// Concurrency and rate limits in the configuration are ignored.
pub struct BasicQueue {
    buffer: EventBuffer,
    workers: InFlight,
    changed: Notify,
}

impl BasicQueue {
    /// Create a queue from a configuration.
    pub fn new(config: QueueConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            buffer: EventBuffer::new(config.capacity, config.handlers),
            workers: InFlight::new(),
            changed: Notify::new(),
        })
    }

    /// Create a queue holding at most `capacity` events.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Self::new(QueueConfig::new(capacity))
    }

    /// The buffer capacity.
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }
}

impl Queue for BasicQueue {
    fn ready(&self) -> bool {
        !self.buffer.is_empty()
    }

    async fn enqueue(&self, event: DatagramEvent) -> Result<()> {
        self.buffer.push(event).await?;
        self.changed.notify_one();
        Ok(())
    }

    async fn dequeue(&self) -> Option<DatagramEvent> {
        let event = self.buffer.pop().await?;
        self.workers.admit();
        Some(event)
    }

    fn notify(&self) {
        self.workers.release();
        self.changed.notify_one();
    }

    async fn wait(&self) {
        self.workers.idle().await
    }

    async fn readiness_changed(&self) {
        self.changed.notified().await
    }

    fn len(&self) -> usize {
        self.buffer.len()
    }

    fn in_flight(&self) -> usize {
        self.workers.count()
    }

    fn close(&self) -> usize {
        let discarded = self.buffer.close();
        self.changed.notify_one();
        discarded
    }
}

impl std::fmt::Debug for BasicQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicQueue")
            .field("capacity", &self.buffer.capacity())
            .field("len", &self.buffer.len())
            .field("in_flight", &self.workers.count())
            .finish()
    }
}
