//! Datagram events, handler callbacks and the reply capability.

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Weak};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::net::UdpSocket;
use tokio::runtime::Handle;

use crate::signal::ShutdownSignal;

/// Callback invoked for every event that carries data.
pub type PacketHandler = Arc<dyn Fn(&Responder, &DatagramEvent) + Send + Sync>;

/// Callback invoked for every event that carries a read error.
pub type ErrorHandler = Arc<dyn Fn(&io::Error) + Send + Sync>;

/// The packet and error callbacks attached to events.
///
/// Both callbacks default to no-ops, so an event always has something to
/// call and the worker never branches on a missing handler.
#[derive(Clone)]
pub struct Handlers {
    /// Called when an event has `length > 0`.
    pub packet: PacketHandler,
    /// Called when an event carries a read error.
    pub error: ErrorHandler,
}

impl Default for Handlers {
    fn default() -> Self {
        Self {
            packet: Arc::new(|_, _| {}),
            error: Arc::new(|_| {}),
        }
    }
}

impl Handlers {
    /// Create handlers with no-op callbacks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the packet handler.
    pub fn on_packet<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Responder, &DatagramEvent) + Send + Sync + 'static,
    {
        self.packet = Arc::new(handler);
        self
    }

    /// Set the error handler.
    pub fn on_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(&io::Error) + Send + Sync + 'static,
    {
        self.error = Arc::new(handler);
        self
    }
}

impl fmt::Debug for Handlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handlers").finish_non_exhaustive()
    }
}

/// Writes reply datagrams back to the sender of an event.
///
/// A responder borrows the listener's socket without keeping it open: the
/// read loop is the socket's only owner. Once the listener has been halted
/// every write fails with [`io::ErrorKind::NotConnected`].
#[derive(Clone)]
pub struct Responder {
    socket: Option<Weak<UdpSocket>>,
    remote: Option<SocketAddr>,
    closed: ShutdownSignal,
    runtime: Option<Handle>,
}

impl Responder {
    pub(crate) fn new(
        socket: &Arc<UdpSocket>,
        remote: Option<SocketAddr>,
        closed: ShutdownSignal,
    ) -> Self {
        Self {
            socket: Some(Arc::downgrade(socket)),
            remote,
            closed,
            runtime: Handle::try_current().ok(),
        }
    }

    /// A responder that is not attached to any socket; every write fails.
    pub fn detached() -> Self {
        Self {
            socket: None,
            remote: None,
            closed: ShutdownSignal::new(),
            runtime: None,
        }
    }

    /// The address replies are sent to.
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote
    }

    fn target(&self) -> io::Result<(Arc<UdpSocket>, SocketAddr)> {
        let socket = self
            .socket
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "responder is detached"))?;
        let closed = || io::Error::new(io::ErrorKind::NotConnected, "listener socket closed");
        if self.closed.is_triggered() {
            return Err(closed());
        }
        let socket = socket.upgrade().ok_or_else(closed)?;
        let remote = self.remote.ok_or_else(|| {
            io::Error::new(io::ErrorKind::AddrNotAvailable, "event has no remote address")
        })?;
        Ok((socket, remote))
    }

    /// Send a reply datagram, blocking the current thread until it is written.
    ///
    /// Intended for use inside handlers, which run on the blocking pool.
    /// Must not be called from within an async task.
    pub fn write(&self, data: &[u8]) -> io::Result<usize> {
        let (socket, remote) = self.target()?;
        let runtime = self.runtime.as_ref().ok_or_else(|| {
            io::Error::new(io::ErrorKind::Unsupported, "responder has no runtime")
        })?;
        runtime.block_on(socket.send_to(data, remote))
    }

    /// Send a reply datagram from an async context.
    pub async fn send(&self, data: &[u8]) -> io::Result<usize> {
        let (socket, remote) = self.target()?;
        socket.send_to(data, remote).await
    }
}

impl fmt::Debug for Responder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Responder")
            .field("remote", &self.remote)
            .field("closed", &self.closed.is_triggered())
            .finish()
    }
}

/// One inbound read result with its routing metadata.
///
/// Created by a listener for every read, successful or not, and consumed
/// exactly once by a worker.
pub struct DatagramEvent {
    /// Capture time.
    pub timestamp: DateTime<Utc>,
    /// Address of the listener that read the datagram.
    pub local_address: SocketAddr,
    /// Address of the sender. `None` when the read failed.
    pub remote_address: Option<SocketAddr>,
    /// Number of valid bytes in `data`. Always 0 when `error` is set.
    pub length: usize,
    /// Owned copy of the datagram payload.
    pub data: Bytes,
    /// The read failure, if any.
    pub error: Option<io::Error>,
    /// Callbacks the worker invokes for this event.
    pub handlers: Handlers,
    responder: Responder,
}

impl DatagramEvent {
    /// Build an event for a successful read, copying `payload` out of the read buffer.
    pub fn received(
        local_address: SocketAddr,
        remote_address: SocketAddr,
        payload: &[u8],
        handlers: Handlers,
        responder: Responder,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            local_address,
            remote_address: Some(remote_address),
            length: payload.len(),
            data: Bytes::copy_from_slice(payload),
            error: None,
            handlers,
            responder,
        }
    }

    /// Build an event for a failed read.
    pub fn failed(
        local_address: SocketAddr,
        error: io::Error,
        handlers: Handlers,
        responder: Responder,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            local_address,
            remote_address: None,
            length: 0,
            data: Bytes::new(),
            error: Some(error),
            handlers,
            responder,
        }
    }

    /// The reply capability bound to this event's sender.
    pub fn responder(&self) -> &Responder {
        &self.responder
    }

    /// Run the attached handlers: the packet handler when there is data,
    /// then the error handler when the read failed.
    pub fn dispatch(&self) {
        if self.length > 0 {
            (self.handlers.packet)(&self.responder, self);
        }
        if let Some(err) = &self.error {
            (self.handlers.error)(err);
        }
    }
}

impl fmt::Debug for DatagramEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatagramEvent")
            .field("timestamp", &self.timestamp)
            .field("local_address", &self.local_address)
            .field("remote_address", &self.remote_address)
            .field("length", &self.length)
            .field("error", &self.error)
            .finish()
    }
}
