//! Error types for support analytics.

use thiserror::Error;

/// Result type alias for support analytics operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type surfaced at the boundary (CLI, HTTP layer).
///
/// Component crates keep their own richer error enums and convert into this
/// one where they meet the boundary.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    // Build errors (20-29)
    #[error("schema validation failed: {0}")]
    SchemaValidation(String),

    #[error("build failed: {0}")]
    Build(String),

    #[error("another build is already running")]
    BuildBusy,

    #[error("build cancelled before publish")]
    BuildCancelled,

    // Load errors (30-39)
    #[error("not found: {0}")]
    NotFound(String),

    #[error("corrupt data: {0}")]
    Corrupt(String),

    // Query errors (40-49)
    #[error("query failed: {0}")]
    Query(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    /// Used for detailed error reporting in JSON output.
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidArgument(_) => 11,
            Error::SchemaValidation(_) => 20,
            Error::Build(_) => 21,
            Error::BuildBusy => 22,
            Error::BuildCancelled => 23,
            Error::NotFound(_) => 30,
            Error::Corrupt(_) => 31,
            Error::Query(_) => 40,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Whether retrying the same operation later can succeed without
    /// operator intervention.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::BuildBusy | Error::BuildCancelled | Error::Io(_))
    }
}
