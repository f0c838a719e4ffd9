//! Lifecycle states for supervised workers and the process group.

use std::fmt;

/// State of one worker inside a process group run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum WorkerState {
    /// Task spawned, worker has not been polled yet.
    #[default]
    Starting,
    /// Worker is doing its work.
    Running,
    /// Termination signal delivered, worker has not returned yet.
    Stopping,
    /// Worker returned.
    Stopped,
}

impl WorkerState {
    /// Returns true once the worker has returned.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped)
    }

    /// Returns true if a termination signal may still be delivered.
    pub fn accepts_signal(&self) -> bool {
        matches!(self, Self::Starting | Self::Running)
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// State of a process group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum GroupState {
    /// Constructed, not yet run.
    #[default]
    Idle,
    /// All members started, nobody has exited.
    Running,
    /// Shutdown requested, waiting for members to return.
    Draining,
    /// Every member returned (or was abandoned after the grace period).
    Done,
}

impl GroupState {
    /// Returns true if the group is shutting down or finished.
    pub fn is_shutting_down(&self) -> bool {
        matches!(self, Self::Draining | Self::Done)
    }
}

impl fmt::Display for GroupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Done => "done",
        };
        f.write_str(s)
    }
}
