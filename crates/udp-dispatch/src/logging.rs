//! Logging facilities for udp-dispatch.
//!
//! All diagnostics go through the `tracing` crate. The library never
//! installs a subscriber; to see logs, install one in your application:
//!
//! ```ignore
//! use tracing_subscriber::EnvFilter;
//!
//! tracing_subscriber::fmt()
//!     .with_env_filter(EnvFilter::new("udp_dispatch::server=debug"))
//!     .init();
//! ```

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Crate-wide target.
    pub const CRATE: &str = "udp_dispatch";
    /// Listener read loops and socket lifecycle.
    pub const LISTENER: &str = "udp_dispatch::listener";
    /// Queue admission and worker accounting.
    pub const QUEUE: &str = "udp_dispatch::queue";
    /// Dispatch loop, workers and shutdown.
    pub const SERVER: &str = "udp_dispatch::server";
}

/// Build a filter directive enabling `level` for every subsystem.
///
/// ```
/// assert_eq!(
///     udp_dispatch::logging::directive("debug"),
///     "udp_dispatch::listener=debug,udp_dispatch::queue=debug,udp_dispatch::server=debug"
/// );
/// ```
pub fn directive(level: &str) -> String {
    [targets::LISTENER, targets::QUEUE, targets::SERVER]
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}
