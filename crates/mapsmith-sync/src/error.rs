//! Error types for the reconciliation pipeline.

use std::path::PathBuf;

/// Errors that can occur while scanning, diffing, or patching artifacts.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Two interface methods share a statement id.
    #[error("Overloaded mapper methods are not supported (statement id collision):\n{}", .0.iter().map(|(ns, id)| format!("- {ns}#{id}")).collect::<Vec<_>>().join("\n"))]
    OverloadedMethods(Vec<(String, String)>),

    /// The same namespace appears in two artifact files.
    #[error(
        "Duplicate mapper namespace '{namespace}':\n- first: {}\n- second: {}",
        first.display(),
        second.display()
    )]
    DuplicateNamespace {
        /// The colliding namespace.
        namespace: String,
        /// First file claiming it.
        first: PathBuf,
        /// Second file claiming it.
        second: PathBuf,
    },

    /// An artifact was found below a subdirectory of the artifact root.
    #[error("Mapper xml must live directly under the artifact root (flat layout): {}", .0.display())]
    NestedArtifact(PathBuf),

    /// An artifact has no closing root tag, so there is nowhere safe to patch.
    #[error("Invalid mapper xml, missing </mapper>: {}", .0.display())]
    MissingRootClose(PathBuf),

    /// Missing statement ids, reported as an error under `fail-on-missing`.
    #[error("{0}")]
    MissingStatements(String),

    /// Orphan statement ids, reported as an error under `fail-on-orphan`.
    #[error("{0}")]
    OrphanStatements(String),

    /// A boolean option carried something other than `true`/`false`.
    #[error("Invalid boolean value for option '{key}': '{value}'. Use true or false.")]
    InvalidBoolean {
        /// Option key.
        key: String,
        /// Offending raw value.
        value: String,
    },

    /// Configuration file could not be loaded.
    #[error("Failed to load config '{}': {message}", path.display())]
    ConfigError {
        /// Path to the config file.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Schema metadata was rejected by the core resolver.
    #[error(transparent)]
    Schema(#[from] mapsmith_core::error::CoreError),

    /// IO error (reading/writing artifacts).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Atomic write failed while persisting the temp file.
    #[error("Atomic write failed: {0}")]
    Persist(#[from] tempfile::PersistError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for reconciliation operations.
pub type Result<T> = std::result::Result<T, SyncError>;
