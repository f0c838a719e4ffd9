//! Error types for the docker workers.

use std::path::PathBuf;
use std::time::Duration;

use stager_core::CoreError;
use stager_supervisor::WorkerError;
use thiserror::Error;

/// Errors that can occur while running the daemon or building metadata.
#[derive(Debug, Error)]
pub enum DockerError {
    /// Failed to spawn a docker process.
    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The daemon exited without being asked to.
    #[error("Docker daemon exited unexpectedly: {0}")]
    DaemonExited(String),

    /// The daemon did not become ready in time.
    #[error("Docker daemon not ready after {0:?}")]
    DaemonTimeout(Duration),

    /// A docker client command failed.
    #[error("'docker {command}' failed ({status}): {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    /// The image config could not be turned into metadata.
    #[error("Invalid image metadata: {0}")]
    Metadata(#[from] CoreError),

    /// Failed to write the metadata file.
    #[error("Failed to write '{}': {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O error while supervising a child process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<DockerError> for WorkerError {
    fn from(e: DockerError) -> Self {
        WorkerError::failed(e)
    }
}
