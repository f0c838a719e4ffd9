//! Core domain errors.

use thiserror::Error;

/// Core domain errors for the staging builder.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Invalid insecure registry list.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Image reference could not be resolved.
    #[error(transparent)]
    Reference(#[from] ReferenceError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised while validating the insecure registry option.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The option was given more than once.
    #[error("Docker Registries flag already set")]
    AlreadySet,

    /// An entry carried a URL scheme.
    #[error("no scheme allowed for insecure Docker Registry [{registry}]")]
    SchemeNotAllowed { registry: String },

    /// An entry had no `:port` part.
    #[error("ip:port expected for insecure Docker Registry [{registry}]")]
    MissingPort { registry: String },
}

/// Errors raised while resolving an image locator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    /// `dockerImageURL` is not a valid URI.
    #[error("invalid dockerImageURL: {input} ({reason})")]
    InvalidUrl { input: String, reason: String },

    /// `dockerRef` is not a valid docker reference.
    #[error("invalid dockerRef: {input} ({reason})")]
    InvalidReference { input: String, reason: String },

    /// Neither locator was supplied.
    #[error("missing flag: dockerImageURL or dockerRef required")]
    Missing,
}
