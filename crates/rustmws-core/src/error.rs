//! Error types for the RustMWS core.

use std::path::PathBuf;

/// Core error type for configuration and credential lookup.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Missing or malformed configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// No credential is registered under the requested store name.
    #[error("store not found: {0}")]
    StoreNotFound(String),

    /// The configuration file could not be read.
    #[error("failed to read configuration file {}: {source}", path.display())]
    Io {
        /// Path of the file that failed to load.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The configuration document is not valid JSON for [`crate::EngineConfig`].
    #[error("invalid configuration document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
