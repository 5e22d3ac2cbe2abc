//! The server tying listeners, a queue and workers together.
//!
//! A [`Server`] owns one queue and any number of listeners. Listeners
//! enqueue every read; the server's dispatch loop dequeues whatever the
//! queue admits and runs the event's handlers on the blocking pool.
//!
//! Shutdown is cooperative. [`Server::halt`] records a reason and
//! [`HaltOptions`]; the dispatch loop then closes the listeners, runs stop
//! hooks, optionally drains outstanding work within a timeout and delivers a
//! single [`ShutdownReport`] through [`Server::done`].

mod builder;
mod config;
mod lifecycle;
mod report;
mod state;
mod worker;

pub use builder::ServerBuilder;
pub use config::HaltOptions;
pub use lifecycle::{Server, StopHook};
pub use report::ShutdownReport;
pub use state::ServerState;
