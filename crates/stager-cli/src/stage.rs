//! Wiring of the staging process group.

use std::process::ExitCode;

use stager_docker::{Builder, DockerDaemon, BUILDER_NAME, DAEMON_NAME};
use stager_supervisor::{readiness, GroupResult, ProcessGroup, SignalRelay, WorkerSpec};

use crate::config::StagerConfig;

/// Process exit status of the staging binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Every worker finished cleanly.
    Success,
    /// Bad input or failed setup; nothing was started.
    ConfigError,
    /// The group started and a worker failed.
    StagingFailed,
}

impl ExitStatus {
    /// Numeric exit code.
    pub fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::ConfigError => 1,
            Self::StagingFailed => 2,
        }
    }

    /// Map a group outcome.
    pub fn from_group_result(result: &GroupResult) -> Self {
        match result {
            Ok(()) => Self::Success,
            Err(_) => Self::StagingFailed,
        }
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(status.code())
    }
}

/// Build the builder + daemon group. The builder waits for the daemon's readiness.
pub fn build_group(config: &StagerConfig) -> ProcessGroup {
    let (daemon_ready, daemon_gate) = readiness();

    let members = vec![
        WorkerSpec::new(BUILDER_NAME, Builder::new(config.builder_config(), daemon_gate)),
        WorkerSpec::new(DAEMON_NAME, DockerDaemon::new(config.daemon_config()))
            .with_ready_signal(daemon_ready),
    ];

    let group = ProcessGroup::new(members);
    match config.shutdown_grace {
        Some(grace) => group.with_shutdown_grace(grace),
        None => group,
    }
}

/// Run the staging group under `relay`.
pub async fn stage(config: &StagerConfig, relay: SignalRelay) -> GroupResult {
    relay.supervise(build_group(config)).await
}


#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    use stager_core::{ImageReference, InsecureRegistries};

    /// Fake docker binary acting as daemon (`-d`) and client (`pull`, `inspect`).
    fn fake_docker(dir: &Path, daemon_body: &str) -> PathBuf {
        let path = dir.join("docker");
        let script = format!(
            concat!(
                "#!/bin/sh\n",
                "case \"$1\" in\n",
                "  -d) {daemon} ;;\n",
                "  pull) exit 0 ;;\n",
                "  inspect) echo '{{\"Cmd\":[\"./run\"],\"WorkingDir\":\"/app\"}}' ;;\n",
                "  *) exit 1 ;;\n",
                "esac\n",
            ),
            daemon = daemon_body
        );
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn config(dir: &Path, docker: PathBuf) -> StagerConfig {
        StagerConfig {
            image: ImageReference::new("registry.example.com/scope/repo", "v2"),
            insecure_registries: InsecureRegistries::new(),
            output_path: dir.join("result").join("result.json"),
            daemon_executable: docker,
            daemon_socket: dir.join("docker.sock"),
            daemon_timeout: Duration::from_secs(5),
            shutdown_grace: Some(Duration::from_secs(5)),
        }
    }

    #[tokio::test]
    async fn test_successful_staging() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("docker.sock");
        let docker = fake_docker(
            dir.path(),
            &format!("touch '{}'; exec sleep 30", socket.display()),
        );
        let config = config(dir.path(), docker);

        let result = stage(&config, SignalRelay::with_trigger(std::future::pending())).await;

        assert!(result.is_ok(), "unexpected error: {result:?}");
        assert_eq!(ExitStatus::from_group_result(&result), ExitStatus::Success);

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&config.output_path).unwrap()).unwrap();
        assert_eq!(written["detected_start_command"]["web"], "./run");
        assert_eq!(
            written["lifecycle_metadata"]["docker_image"],
            "registry.example.com/scope/repo:v2"
        );
    }

    #[tokio::test]
    async fn test_daemon_crash_exits_with_two() {
        let dir = tempfile::tempdir().unwrap();
        let docker = fake_docker(dir.path(), "echo 'daemon crashed' >&2; exit 1");
        let config = config(dir.path(), docker);

        let result = stage(&config, SignalRelay::with_trigger(std::future::pending())).await;
        let err = result.as_ref().unwrap_err();

        assert_eq!(err.worker, DAEMON_NAME);
        assert_eq!(ExitStatus::from_group_result(&result), ExitStatus::StagingFailed);
        assert_eq!(ExitStatus::StagingFailed.code(), 2);
        assert!(!config.output_path.exists());
    }

    #[tokio::test]
    async fn test_interrupt_before_ready_fails_builder() {
        let dir = tempfile::tempdir().unwrap();
        // Daemon never creates its socket.
        let docker = fake_docker(dir.path(), "exec sleep 30");
        let config = config(dir.path(), docker);

        let relay = SignalRelay::with_trigger(tokio::time::sleep(Duration::from_millis(100)));
        let result = stage(&config, relay).await;

        let err = result.unwrap_err();
        assert_eq!(err.worker, BUILDER_NAME);
    }
}
