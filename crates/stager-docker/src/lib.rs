//! Docker workers for the staging builder.
//!
//! Two [`Worker`](stager_supervisor::Worker)s run side by side in one process
//! group:
//!
//! - [`DockerDaemon`] runs the docker daemon executable and reports ready once
//!   its socket shows up;
//! - [`Builder`] waits for that readiness, pulls and inspects the image, and
//!   writes the staging metadata file.

mod builder;
mod config;
mod daemon;
mod error;
mod process;

pub use builder::{write_result, Builder};
pub use config::{BuilderConfig, DaemonConfig, DEFAULT_DAEMON_TIMEOUT, DEFAULT_SOCKET_PATH};
pub use daemon::DockerDaemon;
pub use error::DockerError;

/// Member name of the builder worker.
pub const BUILDER_NAME: &str = "builder";

/// Member name of the daemon worker.
pub const DAEMON_NAME: &str = "docker_daemon";
