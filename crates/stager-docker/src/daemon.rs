//! Docker daemon worker.

use std::process::Stdio;

use async_trait::async_trait;
use stager_supervisor::{Worker, WorkerContext, WorkerError};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::DaemonConfig;
use crate::error::DockerError;
use crate::process::{forward_output, terminate};

/// Runs the docker daemon for the lifetime of the group.
///
/// Ready once the daemon socket exists. Returns `Ok(())` when stopped on
/// request; any exit on its own is an error.
#[derive(Debug, Clone)]
pub struct DockerDaemon {
    config: DaemonConfig,
}

impl DockerDaemon {
    /// Create a daemon worker.
    pub fn new(config: DaemonConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Worker for DockerDaemon {
    async fn run(self: Box<Self>, ctx: WorkerContext) -> Result<(), WorkerError> {
        let config = &self.config;
        let args = config.args();

        info!(
            executable = %config.executable.display(),
            socket = %config.socket_path.display(),
            insecure_registries = %config.insecure_registries,
            "Starting docker daemon"
        );
        debug!(args = ?args, "Docker daemon arguments");

        let mut child = Command::new(&config.executable)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| DockerError::Spawn {
                program: config.executable.display().to_string(),
                source,
            })?;

        info!(pid = ?child.id(), "Docker daemon spawned");

        if let Some(stdout) = child.stdout.take() {
            forward_output(stdout, "dockerd", "stdout");
        }
        if let Some(stderr) = child.stderr.take() {
            forward_output(stderr, "dockerd", "stderr");
        }

        let mut ready = false;
        let mut poll = tokio::time::interval(config.ready_poll_interval);

        loop {
            tokio::select! {
                status = child.wait() => {
                    let status = status.map_err(DockerError::from)?;
                    warn!(status = %status, "Docker daemon exited on its own");
                    return Err(DockerError::DaemonExited(status.to_string()).into());
                }
                _ = ctx.stopped() => {
                    info!("Stopping docker daemon");
                    terminate(&mut child, config.stop_timeout)
                        .await
                        .map_err(DockerError::from)?;
                    info!("Docker daemon stopped");
                    return Ok(());
                }
                _ = poll.tick(), if !ready => {
                    if tokio::fs::try_exists(&config.socket_path).await.unwrap_or(false) {
                        ready = true;
                        info!(socket = %config.socket_path.display(), "Docker daemon ready");
                        ctx.report_ready();
                    }
                }
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use std::time::Duration;

    use stager_core::InsecureRegistries;
    use stager_supervisor::{readiness, worker_fn, ProcessGroup, WorkerSpec};

    fn fake_daemon(dir: &Path, body: &str) -> std::path::PathBuf {
        let path = dir.join("docker");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[tokio::test]
    async fn test_missing_executable_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = DaemonConfig::new(
            dir.path().join("nope"),
            dir.path().join("docker.sock"),
            InsecureRegistries::new(),
        );

        let group = ProcessGroup::new(vec![WorkerSpec::new("docker_daemon", DockerDaemon::new(config))]);
        let err = group.run().await.unwrap_err();

        assert!(err.error.to_string().contains("Failed to spawn"));
    }

    #[tokio::test]
    async fn test_unrequested_exit_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let exe = fake_daemon(dir.path(), "exit 3");
        let config = DaemonConfig::new(exe, dir.path().join("docker.sock"), InsecureRegistries::new());

        let group = ProcessGroup::new(vec![WorkerSpec::new("docker_daemon", DockerDaemon::new(config))]);
        let err = group.run().await.unwrap_err();

        assert!(err.error.to_string().contains("exited unexpectedly"));
    }

    #[tokio::test]
    async fn test_ready_then_stopped_on_request() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("docker.sock");
        let exe = fake_daemon(dir.path(), &format!("touch '{}'\nexec sleep 30", socket.display()));
        let mut config = DaemonConfig::new(exe, &socket, InsecureRegistries::new());
        config.ready_poll_interval = Duration::from_millis(10);

        let (signal, gate) = readiness();
        let daemon = WorkerSpec::new("docker_daemon", DockerDaemon::new(config)).with_ready_signal(signal);
        // Finishes as soon as the daemon is ready, which stops the daemon.
        let builder = WorkerSpec::new(
            "builder",
            worker_fn(move |ctx| async move { ctx.wait_until_ready(&gate).await }),
        );

        let result = tokio::time::timeout(
            Duration::from_secs(10),
            ProcessGroup::new(vec![daemon, builder]).run(),
        )
        .await
        .unwrap();

        assert!(result.is_ok(), "unexpected error: {result:?}");
    }
}
