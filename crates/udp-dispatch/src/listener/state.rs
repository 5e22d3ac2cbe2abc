//! State enumeration for listeners.

/// Lifecycle state of a [`Listener`](super::Listener).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ListenerState {
    /// No socket is bound.
    #[default]
    Unbound,
    /// A bind is in progress; the socket does not exist yet.
    Binding,
    /// The socket is bound but the read loop has not started.
    Bound,
    /// The read loop is running.
    Running,
    /// Halt was requested; the read loop is exiting.
    Closing,
    /// The socket is closed.
    Closed,
}

impl ListenerState {
    /// Whether the listener holds an open socket.
    pub fn is_open(self) -> bool {
        matches!(self, Self::Bound | Self::Running)
    }
}

impl std::fmt::Display for ListenerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unbound => write!(f, "Unbound"),
            Self::Binding => write!(f, "Binding"),
            Self::Bound => write!(f, "Bound"),
            Self::Running => write!(f, "Running"),
            Self::Closing => write!(f, "Closing"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}
