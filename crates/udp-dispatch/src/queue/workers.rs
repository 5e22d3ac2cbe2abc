//! Atomic count of admitted, unfinished workers.

use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;

/// Tracks how many dequeued events are still being handled.
///
/// `admit` is called by the single dispatch loop, `release` by any number
/// of workers; both go through atomic operations.
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

impl InFlight {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    /// Whether another worker may start under `limit` (`None` = unlimited).
    pub(crate) fn has_room(&self, limit: Option<usize>) -> bool {
        limit.is_none_or(|limit| self.count() < limit)
    }

    pub(crate) fn admit(&self) -> usize {
        self.count.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Mark one worker finished. Returns the remaining count.
    pub(crate) fn release(&self) -> usize {
        match self
            .count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
        {
            Ok(previous) => {
                let remaining = previous - 1;
                if remaining == 0 {
                    self.idle.notify_waiters();
                }
                remaining
            }
            Err(_) => {
                tracing::warn!(target: "udp_dispatch::queue", "notify called with no worker in flight");
                0
            }
        }
    }

    /// Wait until no worker is in flight.
    pub(crate) async fn idle(&self) {
        loop {
            let notified = self.idle.notified();
            if self.count() == 0 {
                return;
            }
            notified.await;
        }
    }
}
