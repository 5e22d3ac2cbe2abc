//! The outcome of a server shutdown.

use crate::error::{BoxError, DispatchError};

/// What happened during shutdown, delivered once by [`Server::done`](super::Server::done).
#[derive(Debug)]
pub struct ShutdownReport {
    /// The reason passed to `halt`.
    pub reason: BoxError,
    /// Set to [`DispatchError::HaltTimedOut`] when the drain did not finish in time.
    pub halt_error: Option<DispatchError>,
    /// Errors from closing listeners.
    pub listener_errors: Vec<DispatchError>,
    /// Errors returned by stop hooks.
    pub hook_errors: Vec<BoxError>,
    /// Buffered events dropped without being dispatched.
    pub discarded_events: usize,
    /// Workers still running when the report was produced.
    pub abandoned_workers: usize,
}

impl ShutdownReport {
    /// Whether shutdown finished without any error or dropped work.
    pub fn is_clean(&self) -> bool {
        self.halt_error.is_none()
            && self.listener_errors.is_empty()
            && self.hook_errors.is_empty()
            && self.discarded_events == 0
            && self.abandoned_workers == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn report() -> ShutdownReport {
        ShutdownReport {
            reason: "stop".into(),
            halt_error: None,
            listener_errors: Vec::new(),
            hook_errors: Vec::new(),
            discarded_events: 0,
            abandoned_workers: 0,
        }
    }

    #[test]
    fn test_clean_report() {
        assert!(report().is_clean());
    }

    #[test]
    fn test_timed_out_report_is_not_clean() {
        let mut report = report();
        report.halt_error = Some(DispatchError::HaltTimedOut(Duration::from_millis(10)));
        report.abandoned_workers = 2;
        assert!(!report.is_clean());
        assert_eq!(report.reason.to_string(), "stop");
    }
}
