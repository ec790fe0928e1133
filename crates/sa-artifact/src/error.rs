//! Error types for artifact I/O.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// The file's columns do not match the calls schema.
    #[error("schema mismatch: {0}")]
    Schema(String),

    /// A cell decoded but violates the record contract.
    #[error("invalid value in row {row}, column '{column}': {reason}")]
    InvalidValue {
        row: usize,
        column: &'static str,
        reason: String,
    },
}

impl ArtifactError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ArtifactError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<ArtifactError> for sa_common::Error {
    fn from(err: ArtifactError) -> Self {
        match err {
            ArtifactError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                sa_common::Error::NotFound(source.to_string())
            }
            ArtifactError::Io { source, .. } => sa_common::Error::Io(source),
            other => sa_common::Error::Corrupt(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ArtifactError>;
