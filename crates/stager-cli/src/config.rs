//! Run configuration, validated once before any worker starts.

use std::path::{Path, PathBuf};
use std::time::Duration;

use stager_core::{ImageReference, ImageSource, InsecureRegistries, ReferenceError, RegistryError};
use stager_docker::{BuilderConfig, DaemonConfig};
use thiserror::Error;

use crate::cli::Args;

/// Invalid or missing command-line input.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Bad `insecureDockerRegistries`.
    #[error("invalid value for flag -insecureDockerRegistries: {0}")]
    Registry(#[from] RegistryError),

    /// Bad or missing image locator.
    #[error(transparent)]
    Reference(#[from] ReferenceError),

    /// The daemon executable does not exist.
    #[error("docker daemon not found in {}", .0.display())]
    DaemonNotFound(PathBuf),
}

/// Immutable configuration for one staging run.
#[derive(Debug, Clone)]
pub struct StagerConfig {
    /// Image to stage.
    pub image: ImageReference,

    /// Registries exempt from TLS.
    pub insecure_registries: InsecureRegistries,

    /// Where the builder writes the metadata.
    pub output_path: PathBuf,

    /// Docker daemon executable, also used as the docker client.
    pub daemon_executable: PathBuf,

    /// Docker daemon socket.
    pub daemon_socket: PathBuf,

    /// How long the builder waits for the daemon.
    pub daemon_timeout: Duration,

    /// Grace period after shutdown starts; `None` waits forever.
    pub shutdown_grace: Option<Duration>,
}

impl StagerConfig {
    /// Validate flags in the order the run depends on them.
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        let insecure_registries = InsecureRegistries::from_flag_values(&args.insecure_docker_registries)?;

        let image = ImageSource::from_flags(
            args.docker_image_url.as_deref(),
            args.docker_ref.as_deref(),
        )?
        .resolve()?;

        let daemon_executable = PathBuf::from(args.docker_daemon_executable_path);
        ensure_exists(&daemon_executable)?;

        let shutdown_grace = match args.shutdown_grace_period {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Ok(Self {
            image,
            insecure_registries,
            output_path: PathBuf::from(args.output_metadata_json_filename),
            daemon_executable,
            daemon_socket: PathBuf::from(args.docker_daemon_socket_path),
            daemon_timeout: Duration::from_secs(args.docker_daemon_timeout),
            shutdown_grace,
        })
    }

    /// Config for the daemon worker.
    pub fn daemon_config(&self) -> DaemonConfig {
        DaemonConfig::new(
            &self.daemon_executable,
            &self.daemon_socket,
            self.insecure_registries.clone(),
        )
    }

    /// Config for the builder worker.
    pub fn builder_config(&self) -> BuilderConfig {
        BuilderConfig {
            docker_path: self.daemon_executable.clone(),
            socket_path: self.daemon_socket.clone(),
            image: self.image.clone(),
            insecure_registries: self.insecure_registries.clone(),
            output_path: self.output_path.clone(),
            daemon_timeout: self.daemon_timeout,
        }
    }
}

fn ensure_exists(path: &Path) -> Result<(), ConfigError> {
    match path.try_exists() {
        Ok(true) => Ok(()),
        _ => Err(ConfigError::DaemonNotFound(path.to_path_buf())),
    }
}
