//! Parquet writer for the calls artifact.
//!
//! Artifacts are written to a sibling `.tmp` file, fsynced, then renamed into
//! place, so a reader never opens a truncated artifact.

use crate::error::{ArtifactError, Result};
use crate::schema::{calls_schema, TIMEZONE};
use crate::DEFAULT_BATCH_SIZE;
use arrow::array::{ArrayRef, Float64Array, StringArray, TimestampMillisecondArray, UInt64Array};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;
use sa_common::ArtifactRow;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Writer configuration.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Rows per record batch and per row group.
    pub batch_size: usize,
    pub compression: Compression,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            compression: Compression::ZSTD(ZstdLevel::default()),
        }
    }
}

/// Convert rows into a single Arrow record batch.
pub fn rows_to_batch(rows: &[ArtifactRow]) -> Result<RecordBatch> {
    let ids = StringArray::from_iter_values(rows.iter().map(|r| r.call.id.as_str()));
    let agent_ids = StringArray::from_iter_values(rows.iter().map(|r| r.call.agent_id.as_str()));
    let regions = StringArray::from_iter_values(rows.iter().map(|r| r.call.customer_region.as_str()));
    let issues = StringArray::from_iter_values(rows.iter().map(|r| r.call.issue_type.as_str()));
    let durations = UInt64Array::from_iter_values(rows.iter().map(|r| r.call.duration_seconds));
    let statuses =
        StringArray::from_iter_values(rows.iter().map(|r| r.call.resolution_status.as_str()));
    let started = TimestampMillisecondArray::from_iter_values(
        rows.iter().map(|r| r.call.started_at.timestamp_millis()),
    )
    .with_timezone(TIMEZONE);
    let ratings: Float64Array = rows.iter().map(|r| r.call.rating).collect();
    let names: StringArray = rows.iter().map(|r| r.agent_name.as_deref()).collect();
    let teams: StringArray = rows.iter().map(|r| r.agent_team.as_deref()).collect();
    let agent_regions: StringArray = rows.iter().map(|r| r.agent_region.as_deref()).collect();

    let columns: Vec<ArrayRef> = vec![
        Arc::new(ids),
        Arc::new(agent_ids),
        Arc::new(regions),
        Arc::new(issues),
        Arc::new(durations),
        Arc::new(statuses),
        Arc::new(started),
        Arc::new(ratings),
        Arc::new(names),
        Arc::new(teams),
        Arc::new(agent_regions),
    ];
    Ok(RecordBatch::try_new(calls_schema(), columns)?)
}

/// Write rows to `path` atomically. Returns the artifact size in bytes.
pub fn write_artifact(path: &Path, rows: &[ArtifactRow], config: &WriterConfig) -> Result<u64> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| ArtifactError::io(dir, e))?;
    }
    let tmp_path = tmp_path_for(path);

    if let Err(e) = write_parquet(&tmp_path, rows, config) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }
    fs::rename(&tmp_path, path).map_err(|e| ArtifactError::io(path, e))?;

    let size = fs::metadata(path)
        .map_err(|e| ArtifactError::io(path, e))?
        .len();
    debug!(path = %path.display(), rows = rows.len(), size, "artifact written");
    Ok(size)
}

fn write_parquet(tmp_path: &Path, rows: &[ArtifactRow], config: &WriterConfig) -> Result<()> {
    let batch_size = config.batch_size.max(1);
    let props = WriterProperties::builder()
        .set_compression(config.compression)
        .set_max_row_group_size(batch_size)
        .build();

    let file = File::create(tmp_path).map_err(|e| ArtifactError::io(tmp_path, e))?;
    let mut writer = ArrowWriter::try_new(file, calls_schema(), Some(props))?;
    for chunk in rows.chunks(batch_size) {
        writer.write(&rows_to_batch(chunk)?)?;
    }
    let file = writer.into_inner()?;
    file.sync_all().map_err(|e| ArtifactError::io(tmp_path, e))?;
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Render rows as an ASCII table for operator output.
pub fn pretty_rows(rows: &[ArtifactRow]) -> Result<String> {
    let batch = rows_to_batch(rows)?;
    Ok(arrow::util::pretty::pretty_format_batches(&[batch])?.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read_artifact;
    use chrono::{TimeZone, Utc};
    use sa_common::{AgentId, CallId, CallRecord, ResolutionStatus};
    use tempfile::TempDir;

    fn row(i: u32, rating: Option<f64>, agent: Option<&str>) -> ArtifactRow {
        ArtifactRow {
            call: CallRecord {
                id: CallId(format!("call-{i:03}")),
                agent_id: AgentId::from("A-101"),
                customer_region: "EMEA".to_string(),
                issue_type: "Billing".to_string(),
                duration_seconds: 60 * u64::from(i),
                resolution_status: ResolutionStatus::Pending,
                started_at: Utc.with_ymd_and_hms(2025, 11, 25, 8, 0, i).unwrap(),
                rating,
            },
            agent_name: agent.map(str::to_string),
            agent_team: None,
            agent_region: agent.map(|_| "EMEA".to_string()),
        }
    }

    #[test]
    fn write_then_read_preserves_rows_and_nulls() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("calls.parquet");
        let rows = vec![
            row(1, Some(4.5), Some("Dana")),
            row(2, None, None),
            row(3, Some(1.0), Some("Lee")),
        ];
        let size = write_artifact(&path, &rows, &WriterConfig::default()).unwrap();
        assert!(size > 0);
        assert_eq!(read_artifact(&path).unwrap(), rows);
        assert!(!dir.path().join("calls.parquet.tmp").exists());
    }

    #[test]
    fn small_batches_span_row_groups() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("calls.parquet");
        let rows: Vec<_> = (0..25).map(|i| row(i, None, Some("Dana"))).collect();
        let config = WriterConfig {
            batch_size: 4,
            ..Default::default()
        };
        write_artifact(&path, &rows, &config).unwrap();
        assert_eq!(read_artifact(&path).unwrap(), rows);
    }

    #[test]
    fn empty_table_is_a_valid_artifact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.parquet");
        write_artifact(&path, &[], &WriterConfig::default()).unwrap();
        assert!(read_artifact(&path).unwrap().is_empty());
    }

    #[test]
    fn pretty_rows_contains_headers() {
        let table = pretty_rows(&[row(1, Some(5.0), Some("Dana"))]).unwrap();
        assert!(table.contains("resolution_status"));
        assert!(table.contains("call-001"));
    }
}
