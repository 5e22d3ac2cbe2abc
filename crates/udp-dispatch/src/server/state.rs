//! State enumeration for servers.

/// Lifecycle state of a [`Server`](super::Server).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ServerState {
    /// Constructed; `setup` has not succeeded yet.
    #[default]
    Idle,
    /// Listeners are bound and the dispatch loop may run.
    Running,
    /// A halt request is being processed.
    Halting,
    /// Shutdown finished and the report was produced.
    Halted,
}

impl std::fmt::Display for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Running => write!(f, "Running"),
            Self::Halting => write!(f, "Halting"),
            Self::Halted => write!(f, "Halted"),
        }
    }
}
