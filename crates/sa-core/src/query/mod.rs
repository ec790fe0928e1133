//! Query engine over the in-memory artifact.
//!
//! The engine holds one immutable [`Snapshot`] at a time behind an
//! `RwLock<Arc<_>>`. Readers clone the `Arc` and drop the guard at once, so
//! a query always runs to completion against the snapshot it started with.
//! Reloads build the replacement off-lock and swap the pointer.

pub mod engine;
pub mod index;
pub mod snapshot;

pub use engine::{QueryEngine, RefreshOutcome};
pub use index::{FilterIndex, Matches};
pub use snapshot::Snapshot;

use sa_artifact::ArtifactError;
use sa_common::{CallRecord, ResolutionStatus};
use sa_manifest::ManifestError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Conjunctive equality filters. `None` matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ResolutionStatus>,
}

impl CallFilters {
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn issue_type(mut self, issue_type: impl Into<String>) -> Self {
        self.issue_type = Some(issue_type.into());
        self
    }

    pub fn status(mut self, status: ResolutionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.region.is_none() && self.issue_type.is_none() && self.status.is_none()
    }

    pub fn matches(&self, call: &CallRecord) -> bool {
        self.region.as_deref().map_or(true, |r| call.customer_region == r)
            && self.issue_type.as_deref().map_or(true, |i| call.issue_type == i)
            && self.status.map_or(true, |s| call.resolution_status == s)
    }
}

/// One page of matching calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallPage {
    pub rows: Vec<CallRecord>,
    pub total_matched: usize,
    /// Effective page after clamping (1-based).
    pub page: u32,
    /// Effective page size after clamping.
    pub per_page: u32,
    pub total_pages: u32,
}

/// Failures loading or reloading a snapshot.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("artifact load failed: {0}")]
    Artifact(#[from] ArtifactError),

    /// The artifact decoded but does not match its manifest.
    #[error("artifact {path} does not match manifest: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("fingerprint serialization failed: {0}")]
    Fingerprint(#[from] serde_json::Error),
}

impl From<QueryError> for sa_common::Error {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::Manifest(e) => e.into(),
            QueryError::Artifact(e) => e.into(),
            QueryError::Corrupt { .. } => sa_common::Error::Corrupt(err.to_string()),
            QueryError::Fingerprint(e) => sa_common::Error::Json(e),
        }
    }
}
