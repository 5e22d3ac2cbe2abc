//! UDP request/response services with admission-controlled dispatch.
//!
//! This crate provides the plumbing between a UDP socket and your handler:
//!
//! - **Listeners**: own a bound socket and turn every read into a [`DatagramEvent`]
//! - **Queues**: buffer events and decide when the next one may run
//!   ([`BasicQueue`] admits freely, [`StdQueue`] caps concurrency and rate)
//! - **Server**: dispatches admitted events to workers and coordinates a
//!   graceful, timeout-bounded shutdown
//!
//! Payloads are never interpreted; handlers receive the raw bytes and a
//! [`Responder`] for replying to the sender.
//!
//! # Echo Server
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use udp_dispatch::{HaltOptions, ListenerConfig, QueueConfig, Server, StdQueue};
//!
//! let server = Arc::new(
//!     Server::builder()
//!         .queue(StdQueue::new(QueueConfig::new(64).concurrency_limit(8))?)
//!         .listener(ListenerConfig::new("0.0.0.0:9000").on_packet(|responder, event| {
//!             let _ = responder.write(&event.data);
//!         }))
//!         .build(),
//! );
//!
//! server.setup().await?;
//! let runner = server.clone();
//! tokio::spawn(async move { runner.run().await });
//!
//! // Later: stop accepting, finish in-flight work for up to five seconds.
//! server.halt("shutting down", HaltOptions::drain(Duration::from_secs(5)))?;
//! if let Some(report) = server.done().await {
//!     println!("discarded {} events", report.discarded_events);
//! }
//! ```
//!
//! # Settings Files
//!
//! A server can also be described in TOML, see [`ServerSettings`]:
//!
//! ```ignore
//! let server = ServerSettings::from_file("dispatch.toml")?
//!     .into_builder()?
//!     .build();
//! ```
//!
//! # Logging
//!
//! Diagnostics are emitted through `tracing` under the targets listed in
//! [`logging::targets`].

mod config;
mod error;
mod event;
pub mod listener;
pub mod logging;
pub mod queue;
pub mod server;
mod signal;

pub use config::ServerSettings;
pub use error::{BoxError, DispatchError, Result};
pub use event::{DatagramEvent, ErrorHandler, Handlers, PacketHandler, Responder};

// Re-export commonly used types at the crate root
pub use listener::{InitialHandler, Listener, ListenerConfig, ListenerState, MAX_UDP_PAYLOAD_SIZE};
pub use queue::{BasicQueue, Queue, QueueConfig, StdQueue};
pub use server::{HaltOptions, Server, ServerBuilder, ServerState, ShutdownReport, StopHook};
