//! Image locator resolution.
//!
//! A run is given exactly one image locator: either a URL
//! (`docker://[registry/][scope/]repository[#tag]`) or a canonical docker
//! reference string. Both resolve to the same [`ImageReference`] before any
//! worker configuration is built.

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use crate::error::ReferenceError;

/// Tag used when the locator does not carry one.
pub const DEFAULT_TAG: &str = "latest";

/// User-supplied image locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// URL form, from `dockerImageURL`.
    Url(String),
    /// Canonical docker reference, from `dockerRef`.
    Reference(String),
}

impl ImageSource {
    /// Pick the locator from the two optional flags.
    ///
    /// The URL wins when both are present. Empty values count as absent.
    pub fn from_flags(url: Option<&str>, reference: Option<&str>) -> Result<Self, ReferenceError> {
        match (non_empty(url), non_empty(reference)) {
            (Some(url), _) => Ok(Self::Url(url.to_string())),
            (None, Some(reference)) => Ok(Self::Reference(reference.to_string())),
            (None, None) => Err(ReferenceError::Missing),
        }
    }

    /// Resolve the locator into a repository and tag.
    pub fn resolve(&self) -> Result<ImageReference, ReferenceError> {
        match self {
            Self::Url(url) => ImageReference::from_url(url),
            Self::Reference(reference) => ImageReference::from_reference(reference),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Resolved image: repository name plus tag (or digest).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageReference {
    /// Repository, including registry host and scope when given.
    pub repo_name: String,

    /// Tag, or a `sha256:...` digest for digest references.
    pub tag: String,
}

impl ImageReference {
    /// Create a reference from already split parts.
    pub fn new(repo_name: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            repo_name: repo_name.into(),
            tag: tag.into(),
        }
    }

    /// Resolve a `docker://host/scope/repo#tag` URL.
    pub fn from_url(input: &str) -> Result<Self, ReferenceError> {
        let url = Url::parse(input).map_err(|e| ReferenceError::InvalidUrl {
            input: input.to_string(),
            reason: e.to_string(),
        })?;

        let mut repo = String::new();
        if let Some(host) = url.host_str() {
            repo.push_str(host);
            if let Some(port) = url.port() {
                repo.push(':');
                repo.push_str(&port.to_string());
            }
        }
        repo.push_str(url.path());
        let repo = repo.trim_start_matches('/').to_string();

        if repo.is_empty() {
            return Err(ReferenceError::InvalidUrl {
                input: input.to_string(),
                reason: "no repository".to_string(),
            });
        }

        let tag = match url.fragment() {
            Some(fragment) if !fragment.is_empty() => fragment.to_string(),
            _ => DEFAULT_TAG.to_string(),
        };

        Ok(Self::new(repo, tag))
    }

    /// Resolve a docker reference such as `registry:5000/scope/repo:tag`.
    pub fn from_reference(input: &str) -> Result<Self, ReferenceError> {
        let invalid = |reason: &str| ReferenceError::InvalidReference {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        if input.is_empty() {
            return Err(invalid("empty reference"));
        }
        if input.chars().any(char::is_whitespace) {
            return Err(invalid("whitespace not allowed"));
        }

        let (repo, tag) = match input.split_once('@') {
            Some((repo, digest)) => {
                if digest.is_empty() {
                    return Err(invalid("empty digest"));
                }
                (repo, digest.to_string())
            }
            None => {
                // A ':' before the last '/' belongs to the registry port.
                let name_start = input.rfind('/').map(|i| i + 1).unwrap_or(0);
                match input[name_start..].rfind(':') {
                    Some(i) => {
                        let split = name_start + i;
                        let tag = &input[split + 1..];
                        if tag.is_empty() {
                            return Err(invalid("empty tag"));
                        }
                        (&input[..split], tag.to_string())
                    }
                    None => (input, DEFAULT_TAG.to_string()),
                }
            }
        };

        if repo.is_empty() || repo.ends_with('/') {
            return Err(invalid("empty repository name"));
        }
        let name = repo.rsplit('/').next().unwrap_or(repo);
        if name.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(invalid("repository name must be lowercase"));
        }

        Ok(Self::new(repo, tag))
    }

    /// Returns true if `tag` holds a content digest.
    pub fn is_digest(&self) -> bool {
        self.tag.contains(':')
    }

    /// Name usable on the docker command line (`repo:tag` or `repo@digest`).
    pub fn image_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_digest() {
            write!(f, "{}@{}", self.repo_name, self.tag)
        } else {
            write!(f, "{}:{}", self.repo_name, self.tag)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_with_registry_scope_and_tag() {
        let image =
            ImageReference::from_url("docker://registry.example.com/scope/repo#v2").unwrap();

        assert_eq!(image.repo_name, "registry.example.com/scope/repo");
        assert_eq!(image.tag, "v2");
    }

    #[test]
    fn test_url_defaults_to_latest() {
        let image = ImageReference::from_url("docker:///library/ubuntu").unwrap();

        assert_eq!(image.repo_name, "library/ubuntu");
        assert_eq!(image.tag, "latest");
    }

    #[test]
    fn test_url_keeps_registry_port() {
        let image = ImageReference::from_url("docker://10.0.0.1:5000/app#1.0").unwrap();

        assert_eq!(image.repo_name, "10.0.0.1:5000/app");
        assert_eq!(image.tag, "1.0");
    }

    #[test]
    fn test_malformed_url_rejected() {
        let err = ImageReference::from_url("not a url").unwrap_err();
        assert!(matches!(err, ReferenceError::InvalidUrl { .. }));
    }

    #[test]
    fn test_reference_plain_name() {
        let image = ImageReference::from_reference("ubuntu").unwrap();
        assert_eq!(image, ImageReference::new("ubuntu", "latest"));
    }

    #[test]
    fn test_reference_with_registry_port_and_tag() {
        let image = ImageReference::from_reference("localhost:5000/scope/app:v3").unwrap();
        assert_eq!(image, ImageReference::new("localhost:5000/scope/app", "v3"));
    }

    #[test]
    fn test_reference_registry_port_without_tag() {
        let image = ImageReference::from_reference("localhost:5000/app").unwrap();
        assert_eq!(image, ImageReference::new("localhost:5000/app", "latest"));
    }

    #[test]
    fn test_reference_with_digest() {
        let image = ImageReference::from_reference("busybox@sha256:abc123").unwrap();

        assert_eq!(image.repo_name, "busybox");
        assert_eq!(image.tag, "sha256:abc123");
        assert!(image.is_digest());
        assert_eq!(image.image_name(), "busybox@sha256:abc123");
    }

    #[test]
    fn test_reference_rejects_garbage() {
        for bad in ["", "has space", "repo:", "Upper/Case", "scope/"] {
            let err = ImageReference::from_reference(bad).unwrap_err();
            assert!(
                matches!(err, ReferenceError::InvalidReference { .. }),
                "expected rejection for {bad:?}"
            );
        }
    }

    #[test]
    fn test_source_prefers_url() {
        let source = ImageSource::from_flags(Some("docker:///a#b"), Some("c:d")).unwrap();
        assert_eq!(source, ImageSource::Url("docker:///a#b".to_string()));
    }

    #[test]
    fn test_source_falls_back_to_reference() {
        let source = ImageSource::from_flags(Some(""), Some("c:d")).unwrap();
        assert_eq!(source.resolve().unwrap(), ImageReference::new("c", "d"));
    }

    #[test]
    fn test_source_missing() {
        assert_eq!(ImageSource::from_flags(None, None), Err(ReferenceError::Missing));
        assert_eq!(
            ImageSource::from_flags(Some(""), Some("")),
            Err(ReferenceError::Missing)
        );
    }
}
