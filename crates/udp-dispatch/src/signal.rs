//! One-way shutdown flag shared between a component and its tasks.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// A cloneable flag that can be triggered once and awaited by any number of tasks.
///
/// Listeners use it to stop their read loop and to invalidate responders;
/// the server uses it to interrupt the dispatch loop when a halt is requested.
#[derive(Debug, Clone, Default)]
pub(crate) struct ShutdownSignal {
    inner: Arc<SignalState>,
}

#[derive(Debug, Default)]
struct SignalState {
    triggered: AtomicBool,
    notify: Notify,
}

impl ShutdownSignal {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn is_triggered(&self) -> bool {
        self.inner.triggered.load(Ordering::Acquire)
    }

    /// Trigger the signal. Returns `false` if it was already triggered.
    pub(crate) fn trigger(&self) -> bool {
        if self.inner.triggered.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.inner.notify.notify_waiters();
        true
    }

    /// Wait until the signal is triggered. Returns immediately if it already was.
    pub(crate) async fn triggered(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_triggered() {
                return;
            }
            notified.await;
        }
    }
}
