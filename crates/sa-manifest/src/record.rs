//! The manifest record and its consistency rules.

use crate::error::{ManifestError, Result};
use crate::fingerprint::is_sha256_hex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Metadata about the currently published artifact.
///
/// Created by the ETL compiler at the end of a successful build, read by
/// every consumer, superseded (never mutated) by the next build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRecord {
    /// Artifact location; relative paths resolve against the manifest's directory.
    pub path: String,
    /// SHA-256 fingerprint of the canonical artifact rows.
    pub hash: String,
    pub row_count: u64,
    /// RFC 3339 build time.
    pub generated_at: String,
    pub notes: String,
}

/// Persisted shape, parsed loosely so consistency failures can be reported
/// precisely instead of as generic type errors.
#[derive(Debug, Deserialize)]
pub(crate) struct RawManifest {
    path: String,
    hash: String,
    row_count: i64,
    generated_at: String,
    #[serde(default)]
    notes: String,
}

impl RawManifest {
    pub(crate) fn into_record(self, source: &Path) -> Result<ManifestRecord> {
        if self.row_count < 0 {
            return Err(ManifestError::corrupt(
                source,
                format!("row_count must be non-negative, got {}", self.row_count),
            ));
        }
        let record = ManifestRecord {
            path: self.path,
            hash: self.hash,
            row_count: self.row_count as u64,
            generated_at: self.generated_at,
            notes: self.notes,
        };
        record
            .validate()
            .map_err(|reason| ManifestError::corrupt(source, reason))?;
        Ok(record)
    }
}

impl ManifestRecord {
    /// Check internal consistency. Returns a human-readable reason on failure.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.path.trim().is_empty() {
            return Err("artifact path is empty".to_string());
        }
        if !is_sha256_hex(&self.hash) {
            return Err(format!("hash is not a sha256 hex digest: '{}'", self.hash));
        }
        if chrono::DateTime::parse_from_rfc3339(&self.generated_at).is_err() {
            return Err(format!(
                "generated_at is not an RFC 3339 timestamp: '{}'",
                self.generated_at
            ));
        }
        Ok(())
    }

    /// Resolve the artifact location against the manifest's directory.
    pub fn artifact_path(&self, manifest_dir: &Path) -> PathBuf {
        let path = Path::new(&self.path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            manifest_dir.join(path)
        }
    }

    /// Two manifests describe the same artifact iff their fingerprints match.
    pub fn same_artifact(&self, other: &ManifestRecord) -> bool {
        self.hash == other.hash
    }

    /// Short fingerprint prefix for logs and file names.
    pub fn short_hash(&self) -> &str {
        &self.hash[..self.hash.len().min(16)]
    }
}

/// Equality by fingerprint only.
pub fn compare(a: &ManifestRecord, b: &ManifestRecord) -> bool {
    a.same_artifact(b)
}
