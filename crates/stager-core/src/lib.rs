//! Stager Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - Async runtimes
//! - Process spawning
//! - Signal handling
//!
//! Everything here is computed once from command-line input before any
//! worker starts, and is read-only afterwards.

pub mod error;
pub mod metadata;
pub mod reference;
pub mod registry;
pub mod status;

// Re-export commonly used types
pub use error::{CoreError, ReferenceError, RegistryError};
pub use metadata::{ExecutionMetadata, ImageConfig, StagingResult};
pub use reference::{ImageReference, ImageSource};
pub use registry::{InsecureRegistries, RegistryAddress};
pub use status::{GroupState, WorkerState};
