//! Bounded FIFO of pending events.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::{Notify, Semaphore};

use crate::error::{DispatchError, Result};
use crate::event::{DatagramEvent, Handlers};

/// Bounded event buffer shared by listeners (producers) and the server (consumer).
///
/// Free slots are tracked by a semaphore so producers suspend while the
/// buffer is full. Closing the semaphore releases every blocked producer
/// with [`DispatchError::QueueClosed`].
pub(crate) struct EventBuffer {
    events: Mutex<BufferInner>,
    space: Semaphore,
    available: Notify,
    capacity: usize,
    handlers: Option<Handlers>,
}

struct BufferInner {
    events: VecDeque<DatagramEvent>,
    closed: bool,
}

impl EventBuffer {
    pub(crate) fn new(capacity: usize, handlers: Option<Handlers>) -> Self {
        Self {
            events: Mutex::new(BufferInner {
                events: VecDeque::with_capacity(capacity.min(1024)),
                closed: false,
            }),
            space: Semaphore::new(capacity),
            available: Notify::new(),
            capacity,
            handlers,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn len(&self) -> usize {
        self.events.lock().events.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.events.lock().events.is_empty()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.events.lock().closed
    }

    /// Append an event, waiting for a free slot while the buffer is full.
    pub(crate) async fn push(&self, mut event: DatagramEvent) -> Result<()> {
        let permit = self
            .space
            .acquire()
            .await
            .map_err(|_| DispatchError::QueueClosed)?;

        if let Some(handlers) = &self.handlers {
            event.handlers = handlers.clone();
        }

        {
            let mut inner = self.events.lock();
            if inner.closed {
                return Err(DispatchError::QueueClosed);
            }
            inner.events.push_back(event);
        }
        // The slot is handed back in `try_pop`.
        permit.forget();
        self.available.notify_one();
        Ok(())
    }

    /// Remove the head event without waiting.
    pub(crate) fn try_pop(&self) -> Option<DatagramEvent> {
        let event = self.events.lock().events.pop_front();
        if event.is_some() {
            self.space.add_permits(1);
        }
        event
    }

    /// Remove the head event, waiting while the buffer is empty.
    ///
    /// Returns `None` once the buffer is closed.
    pub(crate) async fn pop(&self) -> Option<DatagramEvent> {
        loop {
            let notified = self.available.notified();
            if let Some(event) = self.try_pop() {
                return Some(event);
            }
            if self.is_closed() {
                return None;
            }
            notified.await;
        }
    }

    /// Reject further pushes and discard everything still buffered.
    pub(crate) fn close(&self) -> usize {
        let discarded = {
            let mut inner = self.events.lock();
            inner.closed = true;
            std::mem::take(&mut inner.events)
        };
        self.space.close();
        self.available.notify_waiters();
        discarded.len()
    }
}
