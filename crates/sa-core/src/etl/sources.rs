//! Readers for raw tabular inputs.
//!
//! Readers only split a file into elements. An element that is not an object
//! is passed through unchanged and rejected later by the validator, so it is
//! reported alongside every other bad record.

use crate::validate::RawRecord;
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors reading a source file. These are structural failures (unreadable
/// file, malformed JSON/CSV); field-level problems are schema errors.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {path}{}: {source}", line_suffix(*.line))]
    Json {
        path: PathBuf,
        line: Option<usize>,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path}: top-level JSON value must be an array")]
    NotAnArray { path: PathBuf },

    #[error("unsupported source format: {0} (expected .json, .jsonl, .ndjson, or .csv)")]
    UnsupportedFormat(PathBuf),
}

fn line_suffix(line: Option<usize>) -> String {
    line.map(|l| format!(" (line {l})")).unwrap_or_default()
}

/// Encoding of a source file, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Json,
    JsonLines,
    Csv,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(SourceFormat::Json),
            "jsonl" | "ndjson" => Some(SourceFormat::JsonLines),
            "csv" => Some(SourceFormat::Csv),
            _ => None,
        }
    }
}

/// Read every element in `path`, preserving source order.
pub fn read_records(path: &Path) -> Result<Vec<Value>, SourceError> {
    let format =
        SourceFormat::from_path(path).ok_or_else(|| SourceError::UnsupportedFormat(path.into()))?;
    let records = match format {
        SourceFormat::Json => read_json(path)?,
        SourceFormat::JsonLines => read_json_lines(path)?,
        SourceFormat::Csv => read_csv(path)?,
    };
    debug!(path = %path.display(), ?format, records = records.len(), "source read");
    Ok(records)
}

fn open(path: &Path) -> Result<File, SourceError> {
    File::open(path).map_err(|source| SourceError::Io {
        path: path.into(),
        source,
    })
}

fn read_json(path: &Path) -> Result<Vec<Value>, SourceError> {
    let value: Value =
        serde_json::from_reader(BufReader::new(open(path)?)).map_err(|source| SourceError::Json {
            path: path.into(),
            line: None,
            source,
        })?;
    match value {
        Value::Array(items) => Ok(items),
        _ => Err(SourceError::NotAnArray { path: path.into() }),
    }
}

fn read_json_lines(path: &Path) -> Result<Vec<Value>, SourceError> {
    let reader = BufReader::new(open(path)?);
    let mut records = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| SourceError::Io {
            path: path.into(),
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(&line).map_err(|source| SourceError::Json {
            path: path.into(),
            line: Some(line_no + 1),
            source,
        })?;
        records.push(value);
    }
    Ok(records)
}

/// Header row names the fields; empty cells become null, others strings.
fn read_csv(path: &Path) -> Result<Vec<Value>, SourceError> {
    let csv_err = |source: csv::Error| SourceError::Csv {
        path: path.into(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(open(path)?);
    let headers = reader.headers().map_err(csv_err)?.clone();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(csv_err)?;
        let record: RawRecord = headers
            .iter()
            .zip(row.iter())
            .map(|(name, cell)| {
                let value = if cell.is_empty() {
                    Value::Null
                } else {
                    Value::String(cell.to_string())
                };
                (name.to_string(), value)
            })
            .collect();
        records.push(Value::Object(record));
    }
    Ok(records)
}
