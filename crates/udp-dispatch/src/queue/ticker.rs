//! Dequeue-side rate limiter.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

/// Hands out one token per interval, banking at most one.
///
/// The first token is available immediately. After each grant the next
/// token becomes due one full interval later, so consecutive grants are
/// never closer than `interval`.
#[derive(Debug)]
pub(crate) struct Ticker {
    interval: Duration,
    next: Mutex<Instant>,
}

impl Ticker {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Mutex::new(Instant::now()),
        }
    }

    pub(crate) fn interval(&self) -> Duration {
        self.interval
    }

    /// When the next token becomes available.
    pub(crate) fn due(&self) -> Instant {
        *self.next.lock()
    }

    pub(crate) fn is_ready(&self) -> bool {
        Instant::now() >= self.due()
    }

    /// Sleep until a token is due without consuming it.
    pub(crate) async fn due_wait(&self) {
        tokio::time::sleep_until(self.due()).await;
    }

    /// Consume the due token. Returns the grant time.
    pub(crate) fn grant(&self) -> Instant {
        let granted = Instant::now();
        *self.next.lock() = granted + self.interval;
        granted
    }
}
