//! ETL compiler: raw calls + agent metadata → validated, joined,
//! fingerprinted artifact and the manifest describing it.
//!
//! Builds are all-or-nothing. Every invalid record across both sources is
//! collected before the build aborts, and nothing is written unless the
//! whole input validates.

pub mod compile;
pub mod retention;
pub mod sources;

pub use compile::{BuildOutput, BuildStats, EtlCompiler};
pub use retention::prune_artifacts;
pub use sources::{read_records, SourceError, SourceFormat};

use crate::validate::{RecordKind, SchemaError};
use sa_artifact::ArtifactError;
use sa_manifest::ManifestError;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Maximum number of record errors carried in a [`BuildError::Validation`].
pub const SAMPLE_ERROR_LIMIT: usize = 20;

/// Source file locations for one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EtlInputs {
    pub calls_path: PathBuf,
    pub agents_path: PathBuf,
}

impl EtlInputs {
    pub fn new(calls_path: impl Into<PathBuf>, agents_path: impl Into<PathBuf>) -> Self {
        Self {
            calls_path: calls_path.into(),
            agents_path: agents_path.into(),
        }
    }

    pub fn from_config(config: &sa_config::AnalyticsConfig) -> Self {
        Self::new(&config.calls_path, &config.agents_path)
    }
}

/// Cooperative cancellation flag shared between a caller and a running build.
///
/// Checked between build stages; a cancelled build discards its work and
/// never publishes.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<(), BuildError> {
        if self.is_cancelled() {
            Err(BuildError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// One rejected input record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordError {
    pub kind: RecordKind,
    /// Zero-based position in its source.
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    #[serde(flatten)]
    pub error: SchemaError,
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}", self.kind, self.index)?;
        if let Some(id) = &self.record_id {
            write!(f, " ({id})")?;
        }
        write!(f, ": {}", self.error)
    }
}

fn first_sample(samples: &[RecordError]) -> String {
    samples
        .first()
        .map(ToString::to_string)
        .unwrap_or_else(|| "none".to_string())
}

/// Why a build did not produce a published artifact.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("{invalid_record_count} invalid record(s); first: {}", first_sample(.sample_errors))]
    Validation {
        invalid_record_count: usize,
        sample_errors: Vec<RecordError>,
    },

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("artifact write failed: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("manifest publish failed: {0}")]
    Manifest(#[from] ManifestError),

    #[error("fingerprint serialization failed: {0}")]
    Fingerprint(#[from] serde_json::Error),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("another build is already running")]
    Busy,

    #[error("build cancelled before publish")]
    Cancelled,
}

impl From<BuildError> for sa_common::Error {
    fn from(err: BuildError) -> Self {
        match err {
            BuildError::Validation { .. } => sa_common::Error::SchemaValidation(err.to_string()),
            BuildError::Busy => sa_common::Error::BuildBusy,
            BuildError::Cancelled => sa_common::Error::BuildCancelled,
            BuildError::Io { source, .. } => sa_common::Error::Io(source),
            other => sa_common::Error::Build(other.to_string()),
        }
    }
}
