//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use stager_core::{ImageReference, InsecureRegistries};

/// Default docker daemon socket.
pub const DEFAULT_SOCKET_PATH: &str = "/var/run/docker.sock";

/// How long the builder waits for the daemon by default.
pub const DEFAULT_DAEMON_TIMEOUT: Duration = Duration::from_secs(10);

/// Docker daemon configuration.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Daemon executable.
    pub executable: PathBuf,

    /// Unix socket the daemon listens on; its existence means ready.
    pub socket_path: PathBuf,

    /// Registries the daemon may talk to without TLS.
    pub insecure_registries: InsecureRegistries,

    /// How often to look for the socket.
    pub ready_poll_interval: Duration,

    /// How long to wait after SIGTERM before killing the daemon.
    pub stop_timeout: Duration,
}

impl DaemonConfig {
    /// Create a config with default timings.
    pub fn new(
        executable: impl Into<PathBuf>,
        socket_path: impl Into<PathBuf>,
        insecure_registries: InsecureRegistries,
    ) -> Self {
        Self {
            executable: executable.into(),
            socket_path: socket_path.into(),
            insecure_registries,
            ready_poll_interval: Duration::from_millis(100),
            stop_timeout: Duration::from_secs(5),
        }
    }

    /// Command-line arguments for the daemon.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "-d".to_string(),
            format!("--host=unix://{}", self.socket_path.display()),
        ];
        args.extend(
            self.insecure_registries
                .iter()
                .map(|registry| format!("--insecure-registry={}", registry)),
        );
        args
    }
}

/// Metadata builder configuration.
#[derive(Debug, Clone)]
pub struct BuilderConfig {
    /// Docker client executable (the daemon binary doubles as client).
    pub docker_path: PathBuf,

    /// Socket of the daemon started alongside the builder.
    pub socket_path: PathBuf,

    /// Image to stage.
    pub image: ImageReference,

    /// Registries the daemon treats as insecure.
    pub insecure_registries: InsecureRegistries,

    /// Where the metadata JSON goes.
    pub output_path: PathBuf,

    /// How long to wait for the daemon to become ready.
    pub daemon_timeout: Duration,
}

impl BuilderConfig {
    /// Value for `DOCKER_HOST` pointing at the companion daemon.
    pub fn docker_host(&self) -> String {
        format!("unix://{}", self.socket_path.display())
    }

    /// Returns true if the image is pulled from one of the insecure registries.
    pub fn pulls_insecurely(&self) -> bool {
        self.insecure_registries.iter().any(|registry| {
            self.image
                .repo_name
                .strip_prefix(registry.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}
