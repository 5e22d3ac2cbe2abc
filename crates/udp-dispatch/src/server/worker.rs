//! Workers running handlers on the blocking pool.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::event::DatagramEvent;
use crate::queue::Queue;

/// Calls [`Queue::notify`] when dropped, so a worker reports completion
/// exactly once however it exits.
struct CompletionGuard<Q: Queue> {
    queue: Arc<Q>,
}

impl<Q: Queue> Drop for CompletionGuard<Q> {
    fn drop(&mut self) {
        self.queue.notify();
    }
}

/// Run the handlers of one dequeued event without waiting for them.
pub(crate) fn spawn<Q: Queue>(queue: Arc<Q>, event: DatagramEvent) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        let _guard = CompletionGuard { queue };
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| event.dispatch())) {
            tracing::error!(
                target: "udp_dispatch::server",
                local_address = %event.local_address,
                remote_address = ?event.remote_address,
                panic = panic_message(payload.as_ref()),
                "handler panicked"
            );
        }
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
