//! Child process helpers shared by the workers.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use stager_supervisor::{WorkerContext, WorkerError};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, error, info, warn};

use crate::error::DockerError;

/// Forward every line of a child's output stream into the log.
pub(crate) fn forward_output<R>(reader: R, program: &'static str, stream: &'static str)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let trimmed = line.trim();
                    if !trimmed.is_empty() {
                        info!(program, stream, line = %trimmed, "Child output");
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    error!(program, stream, error = %e, "Error reading child output");
                    break;
                }
            }
        }
    });
}

/// Ask a child to stop with SIGTERM, killing it after `timeout`.
pub(crate) async fn terminate(child: &mut Child, timeout: Duration) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = child.id() {
            match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                Ok(()) => match tokio::time::timeout(timeout, child.wait()).await {
                    Ok(status) => {
                        let status = status?;
                        debug!(status = %status, "Child stopped after SIGTERM");
                        return Ok(());
                    }
                    Err(_) => {
                        warn!(pid, timeout_secs = timeout.as_secs(), "Child ignored SIGTERM, killing")
                    }
                },
                Err(e) => debug!(pid, error = %e, "SIGTERM not delivered"),
            }
        }
    }

    child.kill().await
}

/// Run a docker client command to completion and return its stdout.
///
/// The command is killed if termination is requested while it runs.
pub(crate) async fn run_docker(
    ctx: &WorkerContext,
    docker_path: &Path,
    docker_host: &str,
    args: &[&str],
) -> Result<String, WorkerError> {
    let command = args.join(" ");
    info!(docker = %docker_path.display(), command = %command, "Running docker command");

    let mut cmd = Command::new(docker_path);
    cmd.args(args)
        .env("DOCKER_HOST", docker_host)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = tokio::select! {
        output = cmd.output() => output.map_err(|source| DockerError::Spawn {
            program: docker_path.display().to_string(),
            source,
        })?,
        _ = ctx.stopped() => {
            info!(command = %command, "Termination requested, abandoning docker command");
            return Err(WorkerError::Cancelled);
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(DockerError::CommandFailed {
            command,
            status: output.status.to_string(),
            stderr,
        }
        .into());
    }

    debug!(command = %command, bytes = output.stdout.len(), "Docker command finished");
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Instant;

    fn spawn_sh(script: &str) -> Child {
        Command::new("sh")
            .args(["-c", script])
            .kill_on_drop(true)
            .spawn()
            .unwrap()
    }

    #[tokio::test]
    async fn test_terminate_stops_child_with_sigterm() {
        let mut child = spawn_sh("exec sleep 30");
        let started = Instant::now();

        terminate(&mut child, Duration::from_secs(5)).await.unwrap();

        assert!(started.elapsed() < Duration::from_secs(5));
        let status = child.try_wait().unwrap().expect("child reaped");
        assert!(!status.success());
    }

    #[tokio::test]
    async fn test_terminate_kills_child_ignoring_sigterm() {
        let mut child = spawn_sh("trap '' TERM; while :; do sleep 1; done");
        // Give the shell time to install the trap.
        tokio::time::sleep(Duration::from_millis(100)).await;

        terminate(&mut child, Duration::from_millis(200)).await.unwrap();

        assert!(child.try_wait().unwrap().is_some());
    }
}
