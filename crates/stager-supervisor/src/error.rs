//! Error types for supervised workers.

use std::time::Duration;

use thiserror::Error;

/// Boxed error returned by a worker's own logic.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Terminal error of a single worker.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The worker stopped because it was told to, before finishing its job.
    #[error("cancelled")]
    Cancelled,

    /// A prerequisite worker exited without ever becoming ready.
    #[error("prerequisite exited before becoming ready")]
    NotReady,

    /// The worker's task panicked.
    #[error("worker panicked")]
    Panicked,

    /// The worker ignored its termination signal for the whole grace period.
    #[error("did not stop within {0:?} of shutdown")]
    ShutdownTimeout(Duration),

    /// Anything the worker itself reported.
    #[error("{0}")]
    Failed(BoxError),
}

impl WorkerError {
    /// Wrap an arbitrary worker failure.
    pub fn failed(error: impl Into<BoxError>) -> Self {
        Self::Failed(error.into())
    }
}

/// The error that decided a group run.
#[derive(Debug, Error)]
#[error("{worker}: {error}")]
pub struct GroupError {
    /// Name of the worker whose error won.
    pub worker: String,

    /// That worker's error.
    #[source]
    pub error: WorkerError,
}

/// Outcome of one [`ProcessGroup`](crate::ProcessGroup) run.
pub type GroupResult = Result<(), GroupError>;
