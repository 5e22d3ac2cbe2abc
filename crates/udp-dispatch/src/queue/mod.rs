//! Admission-controlled queues between listeners and the server.
//!
//! A [`Queue`] buffers events produced by listener read loops and decides
//! when the server's dispatch loop may take the next one:
//!
//! - **BasicQueue**: admits whenever an event is buffered
//! - **StdQueue**: additionally caps in-flight workers and spaces dequeues
//!   by a minimum interval
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use udp_dispatch::queue::{QueueConfig, StdQueue};
//!
//! let queue = StdQueue::new(
//!     QueueConfig::new(16)
//!         .concurrency_limit(4)
//!         .rate_limit_interval(Duration::from_millis(10)),
//! )?;
//! ```

mod basic;
mod buffer;
mod config;
mod standard;
mod ticker;
mod workers;

use std::future::Future;

pub use basic::BasicQueue;
pub use config::QueueConfig;
pub use standard::StdQueue;

use crate::error::Result;
use crate::event::DatagramEvent;

/// The contract between listeners (producers) and the server (consumer).
///
/// `ready`, `dequeue` and `readiness_changed` are called only by the
/// server's dispatch loop. `enqueue` may be called by many listeners and
/// `notify` by many workers concurrently.
pub trait Queue: Send + Sync + 'static {
    /// Whether `dequeue` can proceed right now without waiting.
    fn ready(&self) -> bool;

    /// Buffer an event, suspending while the buffer is full.
    fn enqueue(&self, event: DatagramEvent) -> impl Future<Output = Result<()>> + Send;

    /// Remove the head event and admit one worker for it.
    ///
    /// Returns `None` once the queue is closed and empty.
    fn dequeue(&self) -> impl Future<Output = Option<DatagramEvent>> + Send;

    /// Mark one admitted worker as finished.
    fn notify(&self);

    /// Wait until no admitted worker is still running.
    fn wait(&self) -> impl Future<Output = ()> + Send;

    /// Resolve when the result of [`ready`](Self::ready) may have changed.
    fn readiness_changed(&self) -> impl Future<Output = ()> + Send;

    /// Number of buffered events.
    fn len(&self) -> usize;

    /// Whether no events are buffered.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of admitted workers that have not called `notify` yet.
    fn in_flight(&self) -> usize;

    /// Reject further events and discard buffered ones. Returns how many were discarded.
    fn close(&self) -> usize;
}
