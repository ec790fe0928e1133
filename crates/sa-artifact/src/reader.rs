//! Parquet reader for the calls artifact.

use crate::error::{ArtifactError, Result};
use crate::schema::{calls_schema, column};
use crate::DEFAULT_BATCH_SIZE;
use arrow::array::{Array, Float64Array, StringArray, TimestampMillisecondArray, UInt64Array};
use arrow::datatypes::Schema;
use arrow::record_batch::RecordBatch;
use chrono::DateTime;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use sa_common::{AgentId, ArtifactRow, CallId, CallRecord, ResolutionStatus};
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// Decode the whole artifact into memory, in file order.
pub fn read_artifact(path: &Path) -> Result<Vec<ArtifactRow>> {
    let file = File::open(path).map_err(|e| ArtifactError::io(path, e))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    check_schema(builder.schema())?;
    let total = usize::try_from(builder.metadata().file_metadata().num_rows()).unwrap_or(0);
    let reader = builder.with_batch_size(DEFAULT_BATCH_SIZE).build()?;

    let mut rows = Vec::with_capacity(total);
    for batch in reader {
        decode_batch(&batch?, &mut rows)?;
    }
    debug!(path = %path.display(), rows = rows.len(), "artifact decoded");
    Ok(rows)
}

fn check_schema(actual: &Schema) -> Result<()> {
    let expected = calls_schema();
    if actual.fields().len() != expected.fields().len() {
        return Err(ArtifactError::Schema(format!(
            "expected {} columns, found {}",
            expected.fields().len(),
            actual.fields().len()
        )));
    }
    for (want, got) in expected.fields().iter().zip(actual.fields().iter()) {
        if want.name() != got.name() || want.data_type() != got.data_type() {
            return Err(ArtifactError::Schema(format!(
                "expected column {}: {}, found {}: {}",
                want.name(),
                want.data_type(),
                got.name(),
                got.data_type()
            )));
        }
    }
    Ok(())
}

fn col<'a, T: 'static>(batch: &'a RecordBatch, name: &'static str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| ArtifactError::Schema(format!("column '{name}' missing or mistyped")))
}

fn opt_string(arr: &StringArray, i: usize) -> Option<String> {
    if arr.is_null(i) {
        None
    } else {
        Some(arr.value(i).to_string())
    }
}

fn required_string(arr: &StringArray, i: usize, row: usize, name: &'static str) -> Result<String> {
    opt_string(arr, i).ok_or_else(|| ArtifactError::InvalidValue {
        row,
        column: name,
        reason: "unexpected null".to_string(),
    })
}

fn decode_batch(batch: &RecordBatch, rows: &mut Vec<ArtifactRow>) -> Result<()> {
    let ids = col::<StringArray>(batch, column::ID)?;
    let agent_ids = col::<StringArray>(batch, column::AGENT_ID)?;
    let regions = col::<StringArray>(batch, column::CUSTOMER_REGION)?;
    let issues = col::<StringArray>(batch, column::ISSUE_TYPE)?;
    let durations = col::<UInt64Array>(batch, column::DURATION_SECONDS)?;
    let statuses = col::<StringArray>(batch, column::RESOLUTION_STATUS)?;
    let started = col::<TimestampMillisecondArray>(batch, column::STARTED_AT)?;
    let ratings = col::<Float64Array>(batch, column::RATING)?;
    let names = col::<StringArray>(batch, column::AGENT_NAME)?;
    let teams = col::<StringArray>(batch, column::AGENT_TEAM)?;
    let agent_regions = col::<StringArray>(batch, column::AGENT_REGION)?;

    for i in 0..batch.num_rows() {
        let row = rows.len();
        let status_raw = required_string(statuses, i, row, column::RESOLUTION_STATUS)?;
        let resolution_status: ResolutionStatus =
            status_raw
                .parse()
                .map_err(|reason| ArtifactError::InvalidValue {
                    row,
                    column: column::RESOLUTION_STATUS,
                    reason,
                })?;
        let started_at = DateTime::from_timestamp_millis(started.value(i)).ok_or_else(|| {
            ArtifactError::InvalidValue {
                row,
                column: column::STARTED_AT,
                reason: format!("timestamp {} out of range", started.value(i)),
            }
        })?;

        rows.push(ArtifactRow {
            call: CallRecord {
                id: CallId(required_string(ids, i, row, column::ID)?),
                agent_id: AgentId(required_string(agent_ids, i, row, column::AGENT_ID)?),
                customer_region: required_string(regions, i, row, column::CUSTOMER_REGION)?,
                issue_type: required_string(issues, i, row, column::ISSUE_TYPE)?,
                duration_seconds: durations.value(i),
                resolution_status,
                started_at,
                rating: (!ratings.is_null(i)).then(|| ratings.value(i)),
            },
            agent_name: opt_string(names, i),
            agent_team: opt_string(teams, i),
            agent_region: opt_string(agent_regions, i),
        });
    }
    Ok(())
}
