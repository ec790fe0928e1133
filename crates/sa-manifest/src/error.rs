//! Error types for manifest operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during manifest operations.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// No manifest has been published at this path.
    #[error("manifest not found: {0}")]
    NotFound(PathBuf),

    /// The manifest exists but fails to parse or fails a consistency check.
    #[error("corrupted manifest {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// I/O error
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ManifestError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ManifestError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        ManifestError::Corrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl From<ManifestError> for sa_common::Error {
    fn from(err: ManifestError) -> Self {
        match err {
            ManifestError::NotFound(path) => sa_common::Error::NotFound(path.display().to_string()),
            ManifestError::Corrupt { .. } => sa_common::Error::Corrupt(err.to_string()),
            ManifestError::Io { source, .. } => sa_common::Error::Io(source),
            ManifestError::Json(e) => sa_common::Error::Json(e),
        }
    }
}

/// Result type alias for manifest operations.
pub type Result<T> = std::result::Result<T, ManifestError>;
