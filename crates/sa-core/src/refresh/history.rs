//! Bounded log of refresh attempts, mirrored to a JSONL file.

use chrono::{DateTime, Utc};
use sa_common::RefreshId;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// The log is rewritten down to the retained events once it holds this many
/// times `limit` lines.
const COMPACT_FACTOR: usize = 2;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode refresh event: {source}")]
    Json {
        #[source]
        source: serde_json::Error,
    },
}

impl From<HistoryError> for sa_common::Error {
    fn from(err: HistoryError) -> Self {
        match err {
            HistoryError::Io { source, .. } => sa_common::Error::Io(source),
            HistoryError::Json { source } => sa_common::Error::Json(source),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshResult {
    Success,
    Failed,
    /// Another build held the build lock.
    Rejected,
}

/// One refresh attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshEvent {
    pub id: RefreshId,
    pub timestamp: DateTime<Utc>,
    pub result: RefreshResult,
    pub duration_ms: u64,
    pub note: String,
}

impl RefreshEvent {
    pub fn new(result: RefreshResult, duration_ms: u64, note: impl Into<String>) -> Self {
        Self {
            id: RefreshId::new(),
            timestamp: Utc::now(),
            result,
            duration_ms,
            note: note.into(),
        }
    }
}

/// Newest-first ring of events, optionally appended to a log file.
#[derive(Debug)]
pub struct RefreshHistory {
    limit: usize,
    events: VecDeque<RefreshEvent>,
    log_path: Option<PathBuf>,
    /// Lines currently in the log file.
    log_lines: usize,
}

impl RefreshHistory {
    /// In-memory only.
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            events: VecDeque::new(),
            log_path: None,
            log_lines: 0,
        }
    }

    /// Seed from the tail of `path` and append future events to it.
    /// Unparseable lines are skipped. An oversized log is compacted.
    pub fn with_log(path: impl Into<PathBuf>, limit: usize) -> Result<Self, HistoryError> {
        let path = path.into();
        let mut history = Self::new(limit);
        let (events, lines) = read_log(&path)?;
        for event in events {
            history.push(event);
        }
        history.log_path = Some(path);
        history.log_lines = lines;
        history.compact_if_needed();
        Ok(history)
    }

    pub fn record(&mut self, event: RefreshEvent) {
        if let Some(path) = &self.log_path {
            match append(path, &event) {
                Ok(()) => self.log_lines += 1,
                Err(e) => warn!(error = %e, "failed to persist refresh event"),
            }
        }
        self.push(event);
        self.compact_if_needed();
    }

    /// Newest first.
    pub fn events(&self) -> Vec<RefreshEvent> {
        self.events.iter().cloned().collect()
    }

    pub fn last(&self) -> Option<&RefreshEvent> {
        self.events.front()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn push(&mut self, event: RefreshEvent) {
        self.events.push_front(event);
        self.events.truncate(self.limit);
    }

    fn compact_if_needed(&mut self) {
        let Some(path) = &self.log_path else {
            return;
        };
        if self.log_lines <= self.limit.saturating_mul(COMPACT_FACTOR) {
            return;
        }
        match rewrite(path, self.events.iter().rev()) {
            Ok(()) => {
                debug!(
                    path = %path.display(),
                    from = self.log_lines,
                    to = self.events.len(),
                    "history log compacted"
                );
                self.log_lines = self.events.len();
            }
            Err(e) => warn!(error = %e, "failed to compact refresh history"),
        }
    }
}

/// Events in file order (oldest first), plus the number of non-blank lines.
fn read_log(path: &Path) -> Result<(Vec<RefreshEvent>, usize), HistoryError> {
    if !path.exists() {
        return Ok((Vec::new(), 0));
    }
    let content = fs::read_to_string(path).map_err(|source| HistoryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut events = Vec::new();
    let mut lines = 0;
    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        lines += 1;
        match serde_json::from_str(line) {
            Ok(event) => events.push(event),
            Err(e) => warn!(
                path = %path.display(),
                line = line_no + 1,
                error = %e,
                "skipping bad history line"
            ),
        }
    }
    Ok((events, lines))
}

fn append(path: &Path, event: &RefreshEvent) -> Result<(), HistoryError> {
    let io = |source: std::io::Error| HistoryError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io)?;
    }
    let line = serde_json::to_string(event).map_err(|source| HistoryError::Json { source })?;
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io)?;
    writeln!(file, "{line}").map_err(io)
}

/// Replace the log with `events` (oldest first) via a temp file and rename.
fn rewrite<'a>(
    path: &Path,
    events: impl Iterator<Item = &'a RefreshEvent>,
) -> Result<(), HistoryError> {
    let io = |source: std::io::Error| HistoryError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut body = String::new();
    for event in events {
        body.push_str(&serde_json::to_string(event).map_err(|source| HistoryError::Json { source })?);
        body.push('\n');
    }
    let tmp = path.with_extension("jsonl.tmp");
    fs::write(&tmp, body).map_err(io)?;
    fs::rename(&tmp, path).map_err(io)
}
