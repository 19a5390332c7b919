//! Error types for the core schema/synthesis layer.

/// Errors that can occur while resolving schema metadata.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A declared type violates a schema invariant.
    #[error("invalid schema for '{type_name}': {message}")]
    InvalidSchema {
        /// The declared type that failed resolution.
        type_name: String,
        /// What went wrong.
        message: String,
    },
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
