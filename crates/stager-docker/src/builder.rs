//! Metadata builder worker.

use std::path::Path;

use async_trait::async_trait;
use stager_core::{ImageConfig, StagingResult};
use stager_supervisor::{ReadyGate, Worker, WorkerContext, WorkerError};
use tracing::info;

use crate::config::BuilderConfig;
use crate::error::DockerError;
use crate::process::run_docker;

/// Extracts image metadata through the companion daemon.
///
/// Waits for the daemon, pulls the image, inspects its config and writes the
/// staging result. Returning `Ok(())` ends the group.
pub struct Builder {
    config: BuilderConfig,
    daemon_ready: ReadyGate,
}

impl Builder {
    /// Create a builder that starts working once `daemon_ready` opens.
    pub fn new(config: BuilderConfig, daemon_ready: ReadyGate) -> Self {
        Self {
            config,
            daemon_ready,
        }
    }

    async fn wait_for_daemon(&self, ctx: &WorkerContext) -> Result<(), WorkerError> {
        let timeout = self.config.daemon_timeout;
        info!(timeout_secs = timeout.as_secs(), "Waiting for docker daemon");

        match tokio::time::timeout(timeout, ctx.wait_until_ready(&self.daemon_ready)).await {
            Ok(result) => result,
            Err(_) => Err(DockerError::DaemonTimeout(timeout).into()),
        }
    }
}

#[async_trait]
impl Worker for Builder {
    async fn run(self: Box<Self>, ctx: WorkerContext) -> Result<(), WorkerError> {
        let config = &self.config;
        let image = config.image.image_name();
        let docker_host = config.docker_host();

        info!(
            image = %image,
            insecure = config.pulls_insecurely(),
            output = %config.output_path.display(),
            "Staging docker image"
        );

        self.wait_for_daemon(&ctx).await?;

        run_docker(&ctx, &config.docker_path, &docker_host, &["pull", image.as_str()]).await?;
        info!(image = %image, "Image pulled");

        let inspected = run_docker(
            &ctx,
            &config.docker_path,
            &docker_host,
            &["inspect", "--format", "{{json .Config}}", image.as_str()],
        )
        .await?;

        let image_config = ImageConfig::from_json(&inspected).map_err(DockerError::from)?;
        let result = StagingResult::new(&config.image, &image_config).map_err(DockerError::from)?;

        write_result(&config.output_path, &result).await?;
        info!(output = %config.output_path.display(), "Staging metadata written");

        Ok(())
    }
}

/// Write the staging result as JSON, creating parent directories.
pub async fn write_result(path: &Path, result: &StagingResult) -> Result<(), DockerError> {
    let json = result.to_json()?;
    let write_err = |source| DockerError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }
    tokio::fs::write(path, json).await.map_err(write_err)
}
