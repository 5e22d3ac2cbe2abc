//! Queue with optional concurrency and rate limits.

use std::time::Duration;

use tokio::sync::Notify;

use super::buffer::EventBuffer;
use super::config::QueueConfig;
use super::ticker::Ticker;
use super::workers::InFlight;
use super::Queue;
use crate::error::Result;
use crate::event::DatagramEvent;

/// A buffered queue with an optional worker limit and an optional rate limit.
///
/// The two limits are independent:
///
/// - the **concurrency limit** holds admission while `limit` workers are running
/// - the **rate limit** spaces successive dequeues by at least the interval,
///   gating at dequeue time so every listener feeding the queue shares it
///
/// With neither configured it behaves like [`BasicQueue`](super::BasicQueue).
pub struct StdQueue {
    buffer: EventBuffer,
    workers: InFlight,
    limit: Option<usize>,
    ticker: Option<Ticker>,
    changed: Notify,
}

impl StdQueue {
    /// Create a queue from a configuration.
    pub fn new(config: QueueConfig) -> Result<Self> {
        config.validate()?;
        let limit = config.effective_concurrency_limit();
        let ticker = config.effective_rate_limit().map(Ticker::new);

        tracing::debug!(
            target: "udp_dispatch::queue",
            capacity = config.capacity,
            ?limit,
            rate_limit = ?ticker.as_ref().map(Ticker::interval),
            "created queue"
        );

        Ok(Self {
            buffer: EventBuffer::new(config.capacity, config.handlers),
            workers: InFlight::new(),
            limit,
            ticker,
            changed: Notify::new(),
        })
    }

    /// The buffer capacity.
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// The concurrency limit, if any.
    pub fn concurrency_limit(&self) -> Option<usize> {
        self.limit
    }

    /// The minimum spacing between dequeues, if any.
    pub fn rate_limit_interval(&self) -> Option<Duration> {
        self.ticker.as_ref().map(Ticker::interval)
    }
}

impl Queue for StdQueue {
    fn ready(&self) -> bool {
        !self.buffer.is_empty()
            && self.workers.has_room(self.limit)
            && self.ticker.as_ref().is_none_or(Ticker::is_ready)
    }

    async fn enqueue(&self, event: DatagramEvent) -> Result<()> {
        self.buffer.push(event).await?;
        self.changed.notify_one();
        Ok(())
    }

    async fn dequeue(&self) -> Option<DatagramEvent> {
        if let Some(ticker) = &self.ticker {
            ticker.due_wait().await;
        }
        // The token is spent only once an event is in hand.
        let event = self.buffer.pop().await?;
        if let Some(ticker) = &self.ticker {
            ticker.grant();
        }
        let in_flight = self.workers.admit();
        tracing::trace!(target: "udp_dispatch::queue", in_flight, "admitted worker");
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
        match &self.ticker {
            // The only state change nobody announces is a token coming due.
            Some(ticker) if !ticker.is_ready() && !self.buffer.is_empty() => {
                tokio::select! {
                    _ = self.changed.notified() => {}
                    _ = tokio::time::sleep_until(ticker.due()) => {}
                }
            }
            _ => self.changed.notified().await,
        }
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

impl std::fmt::Debug for StdQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdQueue")
            .field("capacity", &self.buffer.capacity())
            .field("len", &self.buffer.len())
            .field("in_flight", &self.workers.count())
            .field("concurrency_limit", &self.limit)
            .field("rate_limit_interval", &self.rate_limit_interval())
            .finish()
    }
}
