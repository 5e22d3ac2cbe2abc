//! UDP listeners feeding events into a queue.
//!
//! A [`Listener`] owns one bound socket and a read loop. Each read, whether
//! it succeeds or fails, becomes a [`DatagramEvent`](crate::DatagramEvent)
//! handed to an initial handler; inside a [`Server`](crate::Server) that
//! handler enqueues onto the server's queue.
//!
//! # Example
//!
//! ```ignore
//! use udp_dispatch::listener::ListenerConfig;
//!
//! let config = ListenerConfig::new("127.0.0.1:9000")
//!     .buffer_size(1500)
//!     .on_packet(|responder, event| {
//!         let _ = responder.write(&event.data);
//!     });
//! ```

mod config;
mod socket;
mod state;

pub use config::{InitialHandler, ListenerConfig, MAX_UDP_PAYLOAD_SIZE};
pub use socket::Listener;
pub use state::ListenerState;
