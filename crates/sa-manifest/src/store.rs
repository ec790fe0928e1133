//! Durable manifest persistence.

use crate::error::{ManifestError, Result};
use crate::record::{ManifestRecord, RawManifest};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Owner of the durable manifest file.
#[derive(Debug, Clone)]
pub struct ManifestStore {
    path: PathBuf,
}

/// Manifest plus the on-disk state of the artifact it points at.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManifestInfo {
    #[serde(flatten)]
    pub manifest: ManifestRecord,
    pub artifact_path: String,
    pub artifact_present: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl ManifestStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory that relative artifact paths resolve against.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Load and validate the live manifest.
    pub fn load(&self) -> Result<ManifestRecord> {
        Self::load_from(&self.path)
    }

    /// Load and validate a manifest at an arbitrary path.
    pub fn load_from(path: &Path) -> Result<ManifestRecord> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ManifestError::NotFound(path.to_path_buf()))
            }
            Err(e) => return Err(ManifestError::io(path, e)),
        };
        let raw: RawManifest = serde_json::from_str(&content)
            .map_err(|e| ManifestError::corrupt(path, format!("parse failed: {e}")))?;
        raw.into_record(path)
    }

    /// Load, mapping "nothing published yet" to `None`.
    pub fn load_optional(&self) -> Result<Option<ManifestRecord>> {
        match self.load() {
            Ok(record) => Ok(Some(record)),
            Err(ManifestError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Atomically replace the live manifest.
    ///
    /// Readers observe either the previous manifest or this one, never a
    /// partial write.
    pub fn save(&self, record: &ManifestRecord) -> Result<()> {
        record
            .validate()
            .map_err(|reason| ManifestError::corrupt(&self.path, reason))?;
        let json = serde_json::to_vec_pretty(record)?;
        write_atomic(&self.path, &json)?;
        info!(
            path = %self.path.display(),
            hash = record.short_hash(),
            rows = record.row_count,
            "manifest published"
        );
        Ok(())
    }

    /// Manifest diagnostics: the record plus artifact size and mtime.
    pub fn describe(&self) -> Result<ManifestInfo> {
        let manifest = self.load()?;
        let artifact = manifest.artifact_path(self.dir());
        let meta = fs::metadata(&artifact).ok();
        let updated_at = meta
            .as_ref()
            .and_then(|m| m.modified().ok())
            .map(|t| chrono::DateTime::<chrono::Utc>::from(t).to_rfc3339());
        Ok(ManifestInfo {
            artifact_path: artifact.display().to_string(),
            artifact_present: meta.is_some(),
            size_bytes: meta.map(|m| m.len()),
            updated_at,
            manifest,
        })
    }
}

/// Write `bytes` to `path` via a sibling temp file and a rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    if !dir.as_os_str().is_empty() && !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| ManifestError::io(dir, e))?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)
            .map_err(|e| ManifestError::io(&tmp_path, e))?;
        file.write_all(bytes)
            .map_err(|e| ManifestError::io(&tmp_path, e))?;
        file.sync_all()
            .map_err(|e| ManifestError::io(&tmp_path, e))?;
    }

    fs::rename(&tmp_path, path).map_err(|e| ManifestError::io(path, e))?;
    sync_dir(dir);
    debug!(path = %path.display(), bytes = bytes.len(), "atomic write complete");
    Ok(())
}

#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Ok(f) = fs::File::open(dir) {
        let _ = f.sync_all();
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}
