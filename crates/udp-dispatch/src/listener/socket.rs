//! Listener owning one bound UDP socket and its read loop.

use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

use super::config::{InitialHandler, ListenerConfig};
use super::state::ListenerState;
use crate::error::{DispatchError, Result};
use crate::event::{DatagramEvent, Handlers, Responder};
use crate::signal::ShutdownSignal;

/// Internal state for the listener.
struct ListenerInner {
    state: ListenerState,
    local_addr: Option<SocketAddr>,
    socket: Option<Arc<UdpSocket>>,
    closed: ShutdownSignal,
    task: Option<JoinHandle<()>>,
}

/// A UDP listener that turns every read into a [`DatagramEvent`].
///
/// The listener binds in [`bind`](Self::bind), starts its read loop in
/// [`start`](Self::start) and stops it with [`halt`](Self::halt). Every read
/// outcome, success or error, is forwarded to the initial handler, except
/// a read interrupted by `halt`, which ends the loop silently.
///
/// # Example
///
/// ```ignore
/// let listener = Listener::new(ListenerConfig::new("127.0.0.1:0").buffer_size(1024));
/// let addr = listener.bind().await?;
/// listener.start(Arc::new(|event| Box::pin(async move {
///     println!("{} bytes", event.length);
///     Ok(())
/// })))?;
/// // ...
/// listener.halt()?;
/// ```
pub struct Listener {
    config: ListenerConfig,
    inner: Arc<Mutex<ListenerInner>>,
}

impl Listener {
    /// Create a listener with the given configuration. Nothing is bound yet.
    pub fn new(config: ListenerConfig) -> Self {
        Self {
            config,
            inner: Arc::new(Mutex::new(ListenerInner {
                state: ListenerState::Unbound,
                local_addr: None,
                socket: None,
                closed: ShutdownSignal::new(),
                task: None,
            })),
        }
    }

    /// Get the current listener state.
    pub fn state(&self) -> ListenerState {
        self.inner.lock().state
    }

    /// Check if the read loop is running.
    pub fn is_running(&self) -> bool {
        self.inner.lock().state == ListenerState::Running
    }

    /// Get the local address after binding.
    /// Returns `None` if the listener is not bound.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.inner.lock().local_addr
    }

    /// Get the configured bind address.
    pub fn address(&self) -> &str {
        &self.config.address
    }

    /// Get the listener configuration.
    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }

    /// Bind the socket to the configured address.
    ///
    /// Fails with [`DispatchError::ListenerAlreadyRunning`] if the socket is
    /// already open or being bound and with [`DispatchError::Bind`] if the
    /// address cannot be bound. A closed listener may be bound again.
    #[tracing::instrument(skip(self), target = "udp_dispatch::listener", fields(address = %self.config.address), level = "debug")]
    pub async fn bind(&self) -> Result<SocketAddr> {
        self.config.validate()?;
        {
            let mut inner = self.inner.lock();
            if !matches!(inner.state, ListenerState::Unbound | ListenerState::Closed) {
                return Err(DispatchError::ListenerAlreadyRunning(
                    self.config.address.clone(),
                ));
            }
            inner.state = ListenerState::Binding;
        }

        let bound = UdpSocket::bind(&self.config.address)
            .await
            .and_then(|socket| socket.local_addr().map(|addr| (socket, addr)));

        let mut inner = self.inner.lock();
        match bound {
            Ok((socket, local_addr)) => {
                inner.state = ListenerState::Bound;
                inner.socket = Some(Arc::new(socket));
                inner.local_addr = Some(local_addr);
                inner.closed = ShutdownSignal::new();
                tracing::info!(target: "udp_dispatch::listener", %local_addr, "listener bound");
                Ok(local_addr)
            }
            Err(source) => {
                inner.state = ListenerState::Unbound;
                tracing::warn!(target: "udp_dispatch::listener", error = %source, "bind failed");
                Err(DispatchError::Bind {
                    address: self.config.address.clone(),
                    source,
                })
            }
        }
    }

    /// Start the read loop, delivering events to `default_handler` unless the
    /// configuration provides its own initial handler.
    ///
    /// Must be called from within a Tokio runtime after [`bind`](Self::bind).
    pub fn start(&self, default_handler: InitialHandler) -> Result<()> {
        let mut inner = self.inner.lock();
        match inner.state {
            ListenerState::Bound => {}
            ListenerState::Running => {
                return Err(DispatchError::ListenerAlreadyRunning(
                    self.config.address.clone(),
                ));
            }
            _ => {
                return Err(DispatchError::ListenerNotRunning(
                    self.config.address.clone(),
                ));
            }
        }

        let (Some(socket), Some(local_addr)) = (inner.socket.clone(), inner.local_addr) else {
            return Err(DispatchError::ListenerNotRunning(
                self.config.address.clone(),
            ));
        };

        let read_loop = ReadLoop {
            socket,
            local_addr,
            buffer_size: self.config.buffer_size,
            handlers: self.config.handlers.clone(),
            deliver: self
                .config
                .initial_handler
                .clone()
                .unwrap_or(default_handler),
            closed: inner.closed.clone(),
            inner: self.inner.clone(),
        };

        inner.state = ListenerState::Running;
        inner.task = Some(tokio::spawn(read_loop.run()));
        Ok(())
    }

    /// Close the socket and stop the read loop.
    ///
    /// A read pending at the time of the call is abandoned without producing
    /// an event. Fails with [`DispatchError::ListenerNotRunning`] if the
    /// listener holds no open socket, including while a bind is in progress.
    pub fn halt(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if !inner.state.is_open() {
            return Err(DispatchError::ListenerNotRunning(
                self.config.address.clone(),
            ));
        }

        inner.closed.trigger();
        inner.socket = None;
        inner.state = if inner.task.is_some() {
            ListenerState::Closing
        } else {
            inner.local_addr = None;
            ListenerState::Closed
        };

        tracing::debug!(target: "udp_dispatch::listener", address = %self.config.address, "listener halting");
        Ok(())
    }

    /// Wait for the read loop to exit. Returns immediately if it was never started.
    pub async fn join(&self) {
        let task = self.inner.lock().task.take();
        if let Some(task) = task {
            if let Err(err) = task.await {
                tracing::error!(target: "udp_dispatch::listener", error = %err, "read loop failed");
            }
        }
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("address", &self.config.address)
            .field("state", &self.state())
            .field("local_addr", &self.local_addr())
            .finish()
    }
}

/// Everything the read loop task owns.
struct ReadLoop {
    socket: Arc<UdpSocket>,
    local_addr: SocketAddr,
    buffer_size: usize,
    handlers: Handlers,
    deliver: InitialHandler,
    closed: ShutdownSignal,
    inner: Arc<Mutex<ListenerInner>>,
}

impl ReadLoop {
    async fn run(self) {
        let mut buffer = vec![0u8; self.buffer_size];

        loop {
            let result = tokio::select! {
                biased;
                _ = self.closed.triggered() => break,
                result = self.socket.recv_from(&mut buffer) => result,
            };

            // A read racing the close is part of the shutdown, not business data.
            if self.closed.is_triggered() {
                break;
            }

            let event = match result {
                Ok((length, remote)) => {
                    tracing::trace!(target: "udp_dispatch::listener", %remote, length, "datagram received");
                    DatagramEvent::received(
                        self.local_addr,
                        remote,
                        &buffer[..length],
                        self.handlers.clone(),
                        Responder::new(&self.socket, Some(remote), self.closed.clone()),
                    )
                }
                Err(err) => {
                    tracing::debug!(target: "udp_dispatch::listener", error = %err, "read failed");
                    DatagramEvent::failed(
                        self.local_addr,
                        err,
                        self.handlers.clone(),
                        Responder::new(&self.socket, None, self.closed.clone()),
                    )
                }
            };

            // Delivery blocks while the queue is full; a halt abandons the event.
            let delivered = tokio::select! {
                biased;
                _ = self.closed.triggered() => break,
                delivered = (self.deliver)(event) => delivered,
            };

            match delivered {
                Ok(()) => {}
                Err(DispatchError::QueueClosed) => {
                    tracing::debug!(target: "udp_dispatch::listener", "queue closed, stopping read loop");
                    break;
                }
                Err(err) => {
                    tracing::warn!(target: "udp_dispatch::listener", error = %err, "initial handler failed");
                }
            }
        }

        let mut inner = self.inner.lock();
        inner.state = ListenerState::Closed;
        inner.local_addr = None;
        inner.socket = None;
        tracing::info!(target: "udp_dispatch::listener", local_addr = %self.local_addr, "listener closed");
    }
}
