//! Staging metadata artifact written by the builder.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::CoreError;
use crate::reference::ImageReference;

/// Process type key for the detected start command.
pub const WEB_PROCESS_TYPE: &str = "web";

/// Subset of the image config reported by `docker inspect --format '{{json .Config}}'`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageConfig {
    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub exposed_ports: Option<BTreeMap<String, serde_json::Value>>,

    #[serde(default)]
    pub cmd: Option<Vec<String>>,

    #[serde(default)]
    pub entrypoint: Option<Vec<String>>,

    #[serde(default)]
    pub working_dir: Option<String>,
}

impl ImageConfig {
    /// Parse the JSON printed by `docker inspect`.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(json.trim())?)
    }
}

/// An exposed container port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub port: u16,
    pub protocol: String,
}

/// Runtime-relevant parts of the image config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionMetadata {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cmd: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entrypoint: Vec<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub workdir: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<Port>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user: String,
}

impl From<&ImageConfig> for ExecutionMetadata {
    fn from(config: &ImageConfig) -> Self {
        // Keys look like "8080/tcp"; anything unparseable is not a port mapping.
        let ports = config
            .exposed_ports
            .iter()
            .flat_map(|ports| ports.keys())
            .filter_map(|key| {
                let (port, protocol) = key.split_once('/').unwrap_or((key.as_str(), "tcp"));
                port.parse().ok().map(|port| Port {
                    port,
                    protocol: protocol.to_string(),
                })
            })
            .collect();

        Self {
            cmd: config.cmd.clone().unwrap_or_default(),
            entrypoint: config.entrypoint.clone().unwrap_or_default(),
            workdir: config.working_dir.clone().unwrap_or_default(),
            ports,
            user: config.user.clone().unwrap_or_default(),
        }
    }
}

impl ExecutionMetadata {
    /// Entrypoint followed by cmd, space separated.
    pub fn start_command(&self) -> String {
        self.entrypoint
            .iter()
            .chain(self.cmd.iter())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Lifecycle-specific metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleMetadata {
    pub docker_image: String,
}

/// The metadata artifact written to `outputMetadataJSONFilename`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagingResult {
    /// JSON-encoded [`ExecutionMetadata`].
    pub execution_metadata: String,

    /// Start command per process type.
    pub detected_start_command: BTreeMap<String, String>,

    pub lifecycle_metadata: LifecycleMetadata,
}

impl StagingResult {
    /// Build the artifact for a resolved image and its inspected config.
    pub fn new(image: &ImageReference, config: &ImageConfig) -> Result<Self, CoreError> {
        let execution = ExecutionMetadata::from(config);
        let execution_metadata = serde_json::to_string(&execution)?;

        let mut detected_start_command = BTreeMap::new();
        let start = execution.start_command();
        if !start.is_empty() {
            detected_start_command.insert(WEB_PROCESS_TYPE.to_string(), start);
        }

        Ok(Self {
            execution_metadata,
            detected_start_command,
            lifecycle_metadata: LifecycleMetadata {
                docker_image: image.image_name(),
            },
        })
    }

    /// Serialize to the on-disk JSON form.
    pub fn to_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string(self)?)
    }
}
