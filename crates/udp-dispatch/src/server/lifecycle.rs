//! The server: dispatch loop and coordinated shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use super::builder::ServerBuilder;
use super::config::HaltOptions;
use super::report::ShutdownReport;
use super::state::ServerState;
use super::worker;
use crate::error::{BoxError, DispatchError, Result};
use crate::event::DatagramEvent;
use crate::listener::{InitialHandler, Listener};
use crate::queue::Queue;
use crate::signal::ShutdownSignal;

/// Callback run during shutdown with the halt reason.
pub type StopHook = Arc<
    dyn Fn(&(dyn std::error::Error + Send + Sync + 'static)) -> std::result::Result<(), BoxError>
        + Send
        + Sync,
>;

/// A recorded halt request, consumed by the dispatch loop.
struct HaltRequest {
    reason: BoxError,
    options: HaltOptions,
}

/// Internal state for the server.
struct ServerInner {
    state: ServerState,
    setting_up: bool,
    halt_request: Option<HaltRequest>,
    /// Errors from closing the listeners inside `halt`, if it got that far.
    listener_errors: Option<Vec<DispatchError>>,
    report_tx: Option<oneshot::Sender<ShutdownReport>>,
    report_rx: Option<oneshot::Receiver<ShutdownReport>>,
}

/// Owns a queue and a set of listeners and dispatches queued events to workers.
///
/// The lifecycle is `setup` → `run` → `halt` → `done`:
///
/// - [`setup`](Self::setup) binds every listener and starts its read loop
/// - [`run`](Self::run) dequeues admitted events and hands each to a worker
///   on the blocking pool until a halt is requested, then shuts down
/// - [`halt`](Self::halt) closes the listeners and records the request; it
///   never blocks
/// - [`done`](Self::done) resolves with the [`ShutdownReport`] once `run`
///   has finished the shutdown
///
/// # Example
///
/// ```ignore
/// let server = Arc::new(
///     ServerBuilder::new()
///         .queue(StdQueue::new(QueueConfig::new(16))?)
///         .listener(ListenerConfig::new("127.0.0.1:9000").on_packet(|responder, event| {
///             let _ = responder.write(&event.data);
///         }))
///         .build(),
/// );
///
/// server.setup().await?;
/// let runner = server.clone();
/// tokio::spawn(async move { runner.run().await });
///
/// server.halt("maintenance", HaltOptions::drain(Duration::from_secs(5)))?;
/// let report = server.done().await;
/// ```
pub struct Server<Q: Queue> {
    queue: Option<Arc<Q>>,
    listeners: Vec<Listener>,
    hooks: Mutex<Vec<StopHook>>,
    halt_options: HaltOptions,
    halted: ShutdownSignal,
    inner: Mutex<ServerInner>,
}

impl<Q: Queue> Server<Q> {
    /// Start building a server.
    pub fn builder() -> ServerBuilder<Q> {
        ServerBuilder::new()
    }

    pub(super) fn from_parts(
        queue: Option<Arc<Q>>,
        listeners: Vec<Listener>,
        hooks: Vec<StopHook>,
        halt_options: HaltOptions,
    ) -> Self {
        let (report_tx, report_rx) = oneshot::channel();
        Self {
            queue,
            listeners,
            hooks: Mutex::new(hooks),
            halt_options,
            halted: ShutdownSignal::new(),
            inner: Mutex::new(ServerInner {
                state: ServerState::Idle,
                setting_up: false,
                halt_request: None,
                listener_errors: None,
                report_tx: Some(report_tx),
                report_rx: Some(report_rx),
            }),
        }
    }

    /// Get the current server state.
    pub fn state(&self) -> ServerState {
        self.inner.lock().state
    }

    /// Check if the server is running and no halt has been requested.
    pub fn is_running(&self) -> bool {
        let inner = self.inner.lock();
        inner.state == ServerState::Running && inner.halt_request.is_none()
    }

    /// The queue, if one was attached.
    pub fn queue(&self) -> Option<&Arc<Q>> {
        self.queue.as_ref()
    }

    /// The listeners, in the order they were added.
    pub fn listeners(&self) -> &[Listener] {
        &self.listeners
    }

    /// The addresses of all bound listeners.
    pub fn local_addrs(&self) -> Vec<SocketAddr> {
        self.listeners
            .iter()
            .filter_map(Listener::local_addr)
            .collect()
    }

    /// The halt options configured on the builder.
    pub fn halt_options(&self) -> HaltOptions {
        self.halt_options
    }

    /// Register a callback run during shutdown with the halt reason.
    ///
    /// Hooks run in registration order after the listeners are closed.
    /// Their errors are collected into the report.
    pub fn on_halt<F>(&self, hook: F)
    where
        F: Fn(&(dyn std::error::Error + Send + Sync + 'static)) -> std::result::Result<(), BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.hooks.lock().push(Arc::new(hook));
    }

    /// Bind every listener and start their read loops.
    ///
    /// Fails with [`DispatchError::NoQueue`] without a queue and with
    /// [`DispatchError::AlreadyRunning`] if called twice. The first bind
    /// failure is returned and listeners bound before it are closed again.
    #[tracing::instrument(skip(self), target = "udp_dispatch::server", level = "debug")]
    pub async fn setup(&self) -> Result<()> {
        {
            let mut inner = self.inner.lock();
            if inner.state != ServerState::Idle || inner.setting_up {
                return Err(DispatchError::AlreadyRunning);
            }
            inner.setting_up = true;
        }

        let result = self.bind_and_start().await;

        let mut inner = self.inner.lock();
        inner.setting_up = false;
        if result.is_ok() {
            inner.state = ServerState::Running;
            tracing::info!(
                target: "udp_dispatch::server",
                listeners = self.listeners.len(),
                "server running"
            );
        }
        result
    }

    async fn bind_and_start(&self) -> Result<()> {
        let queue = self.queue.clone().ok_or(DispatchError::NoQueue)?;
        for listener in &self.listeners {
            listener.config().validate()?;
        }

        for (index, listener) in self.listeners.iter().enumerate() {
            if let Err(err) = listener.bind().await {
                for bound in &self.listeners[..index] {
                    if let Err(close_err) = bound.halt() {
                        tracing::warn!(target: "udp_dispatch::server", error = %close_err, "failed to release listener");
                    }
                }
                return Err(err);
            }
        }

        let enqueue: InitialHandler =
            Arc::new(move |event: DatagramEvent| -> BoxFuture<'static, Result<()>> {
                let queue = queue.clone();
                Box::pin(async move { queue.enqueue(event).await })
            });
        for listener in &self.listeners {
            listener.start(enqueue.clone())?;
        }
        Ok(())
    }

    /// Run the dispatch loop until a halt is requested, then shut down.
    ///
    /// Returns once the report has been produced. Fails with
    /// [`DispatchError::NotRunning`] before a successful `setup` and with
    /// [`DispatchError::AlreadyRunning`] if the loop is already running.
    pub async fn run(&self) -> Result<()> {
        let queue = self.queue.clone().ok_or(DispatchError::NoQueue)?;
        let report_tx = {
            let mut inner = self.inner.lock();
            if inner.state != ServerState::Running {
                return Err(DispatchError::NotRunning);
            }
            inner.report_tx.take().ok_or(DispatchError::AlreadyRunning)?
        };

        tracing::debug!(target: "udp_dispatch::server", "dispatch loop started");
        let mut dispatched = 0u64;

        loop {
            if self.halted.is_triggered() {
                break;
            }

            if queue.ready() {
                let event = tokio::select! {
                    biased;
                    _ = self.halted.triggered() => break,
                    event = queue.dequeue() => event,
                };
                match event {
                    Some(event) => {
                        worker::spawn(queue.clone(), event);
                        dispatched += 1;
                    }
                    None => break,
                }
                continue;
            }

            tokio::select! {
                biased;
                _ = self.halted.triggered() => break,
                _ = queue.readiness_changed() => {}
            }
        }

        tracing::debug!(target: "udp_dispatch::server", dispatched, "dispatch loop stopped");

        let report = self.shut_down(&queue).await;
        if report_tx.send(report).is_err() {
            tracing::debug!(target: "udp_dispatch::server", "shutdown report dropped, nobody is waiting");
        }
        Ok(())
    }

    /// [`setup`](Self::setup) followed by [`run`](Self::run).
    pub async fn serve(&self) -> Result<()> {
        self.setup().await?;
        self.run().await
    }

    /// Request shutdown.
    ///
    /// Every listener socket is closed before this returns, whether or not
    /// the dispatch loop is being driven. The dispatch loop then stops
    /// admitting events, runs the stop hooks and, when
    /// `options.wait_for_drain` is set, dispatches the events still buffered
    /// and waits for running workers, bounded by `options.timeout`. If `run`
    /// has not been called yet, calling it afterwards performs that shutdown.
    ///
    /// Returns [`DispatchError::NotRunning`] without changing anything if the
    /// server is not running or a halt was already requested.
    pub fn halt(&self, reason: impl Into<BoxError>, options: HaltOptions) -> Result<()> {
        let reason = reason.into();
        {
            let mut inner = self.inner.lock();
            if inner.state != ServerState::Running || inner.halt_request.is_some() {
                return Err(DispatchError::NotRunning);
            }
            tracing::info!(
                target: "udp_dispatch::server",
                %reason,
                wait_for_drain = options.wait_for_drain,
                timeout = ?options.effective_timeout(),
                "halt requested"
            );
            inner.halt_request = Some(HaltRequest { reason, options });
        }

        let listener_errors = self.close_listeners();
        self.inner.lock().listener_errors = Some(listener_errors);
        self.halted.trigger();
        Ok(())
    }

    /// Wait for the shutdown report.
    ///
    /// The report is delivered once: the first call resolves with it after
    /// [`run`](Self::run) finishes shutting down, later calls return `None`.
    /// Without a call to `run` this waits indefinitely; if the `run` future
    /// is dropped before shutting down it returns `None`.
    pub async fn done(&self) -> Option<ShutdownReport> {
        let report_rx = self.inner.lock().report_rx.take()?;
        report_rx.await.ok()
    }

    fn close_listeners(&self) -> Vec<DispatchError> {
        let mut errors = Vec::new();
        for listener in &self.listeners {
            if let Err(err) = listener.halt() {
                tracing::warn!(target: "udp_dispatch::server", error = %err, "failed to close listener");
                errors.push(err);
            }
        }
        errors
    }

    async fn shut_down(&self, queue: &Arc<Q>) -> ShutdownReport {
        let (HaltRequest { reason, options }, closed) = {
            let mut inner = self.inner.lock();
            inner.state = ServerState::Halting;
            let request = inner.halt_request.take().unwrap_or_else(|| HaltRequest {
                reason: "queue closed".into(),
                options: HaltOptions::default(),
            });
            (request, inner.listener_errors.take())
        };

        let listener_errors = match closed {
            Some(errors) => errors,
            None => self.close_listeners(),
        };
        for listener in &self.listeners {
            listener.join().await;
        }

        let hooks = self.hooks.lock().clone();
        let mut hook_errors = Vec::new();
        for hook in hooks {
            if let Err(err) = hook(&*reason) {
                tracing::warn!(target: "udp_dispatch::server", error = %err, "stop hook failed");
                hook_errors.push(err);
            }
        }

        let mut halt_error = None;
        if options.wait_for_drain {
            let drain = drain(queue);
            match options.effective_timeout() {
                Some(limit) => {
                    if tokio::time::timeout(limit, drain).await.is_err() {
                        tracing::warn!(
                            target: "udp_dispatch::server",
                            in_flight = queue.in_flight(),
                            buffered = queue.len(),
                            "drain timed out"
                        );
                        halt_error = Some(DispatchError::HaltTimedOut(limit));
                    }
                }
                None => drain.await,
            }
        }

        let discarded_events = queue.close();
        let abandoned_workers = queue.in_flight();

        self.inner.lock().state = ServerState::Halted;
        tracing::info!(
            target: "udp_dispatch::server",
            %reason,
            discarded_events,
            abandoned_workers,
            timed_out = halt_error.is_some(),
            "server halted"
        );

        ShutdownReport {
            reason,
            halt_error,
            listener_errors,
            hook_errors,
            discarded_events,
            abandoned_workers,
        }
    }
}

/// Dispatch whatever is still buffered, honouring the queue's admission
/// limits, then wait for every worker to finish.
async fn drain<Q: Queue>(queue: &Arc<Q>) {
    while !queue.is_empty() {
        if queue.ready() {
            match queue.dequeue().await {
                Some(event) => {
                    worker::spawn(queue.clone(), event);
                }
                None => break,
            }
        } else {
            queue.readiness_changed().await;
        }
    }
    queue.wait().await;
}

impl<Q: Queue> std::fmt::Debug for Server<Q> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("state", &self.state())
            .field("listeners", &self.listeners)
            .field("halt_options", &self.halt_options)
            .finish_non_exhaustive()
    }
}
