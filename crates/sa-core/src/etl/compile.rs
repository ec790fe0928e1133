//! Build and publish stages of the ETL compiler.

use super::retention::prune_artifacts;
use super::sources::read_records;
use super::{BuildError, CancelToken, EtlInputs, RecordError, SAMPLE_ERROR_LIMIT};
use crate::validate::{as_record, validate_agent, validate_call, RecordKind, SchemaError};
use chrono::{SecondsFormat, Utc};
use sa_artifact::{write_artifact, WriterConfig, ARTIFACT_EXTENSION};
use sa_common::{AgentId, AgentRecord, ArtifactRow, CallId, CallRecord, ARTIFACT_SCHEMA_VERSION};
use sa_config::AnalyticsConfig;
use sa_manifest::{Fingerprinter, ManifestRecord, ManifestStore};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, info_span, warn};

/// Counters describing one build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    pub calls_read: usize,
    pub agents_read: usize,
    pub rows: usize,
    pub unmatched_calls: usize,
    pub duration_ms: u64,
}

/// A validated, joined, fingerprinted table that has not been published yet.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub rows: Vec<ArtifactRow>,
    pub manifest: ManifestRecord,
    /// Where `publish` will place the artifact.
    pub artifact_path: PathBuf,
    pub stats: BuildStats,
}

/// Turns raw call and agent sources into a published artifact + manifest.
#[derive(Debug, Clone)]
pub struct EtlCompiler {
    artifact_dir: PathBuf,
    manifest_dir: PathBuf,
    writer: WriterConfig,
    retain_artifacts: usize,
}

impl EtlCompiler {
    pub fn new(config: &AnalyticsConfig) -> Self {
        Self {
            artifact_dir: config.artifact_dir.clone(),
            manifest_dir: config.manifest_dir().to_path_buf(),
            writer: WriterConfig::default(),
            retain_artifacts: config.refresh.retain_artifacts,
        }
    }

    pub fn with_writer(mut self, writer: WriterConfig) -> Self {
        self.writer = writer;
        self
    }

    pub fn artifact_dir(&self) -> &Path {
        &self.artifact_dir
    }

    /// Content-addressed artifact location for a fingerprint.
    pub fn artifact_path_for(&self, hash: &str) -> PathBuf {
        let short = &hash[..hash.len().min(16)];
        self.artifact_dir
            .join(format!("calls-{short}.{ARTIFACT_EXTENSION}"))
    }

    /// Read, validate, join and fingerprint. Writes nothing.
    pub fn build(&self, inputs: &EtlInputs, cancel: &CancelToken) -> Result<BuildOutput, BuildError> {
        let span = info_span!("etl_build", calls = %inputs.calls_path.display());
        let _guard = span.enter();
        let started = Instant::now();

        cancel.check()?;
        let raw_calls = read_records(&inputs.calls_path)?;
        let raw_agents = read_records(&inputs.agents_path)?;
        cancel.check()?;

        let mut errors = ErrorCollector::default();
        let calls = validate_calls(&raw_calls, &mut errors);
        let agents = validate_agents(&raw_agents, &mut errors);
        if let Some(err) = errors.into_error() {
            warn!(error = %err, "build rejected by validation");
            return Err(err);
        }
        cancel.check()?;

        let agents_by_id: HashMap<AgentId, AgentRecord> = agents
            .into_iter()
            .map(|agent| (agent.agent_id.clone(), agent))
            .collect();
        let rows: Vec<ArtifactRow> = calls
            .into_iter()
            .map(|call| {
                let agent = agents_by_id.get(&call.agent_id);
                ArtifactRow::join(call, agent)
            })
            .collect();
        let unmatched_calls = rows.iter().filter(|row| !row.has_agent()).count();

        let mut fingerprint = Fingerprinter::new(ARTIFACT_SCHEMA_VERSION);
        for row in &rows {
            fingerprint.push(row)?;
        }
        let row_count = fingerprint.rows();
        let hash = fingerprint.finish();
        let artifact_path = self.artifact_path_for(&hash);

        let manifest = ManifestRecord {
            path: self.manifest_relative(&artifact_path),
            hash,
            row_count,
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            notes: format!(
                "{} rows joined; {unmatched_calls} calls without agent metadata",
                rows.len()
            ),
        };
        let stats = BuildStats {
            calls_read: raw_calls.len(),
            agents_read: raw_agents.len(),
            rows: rows.len(),
            unmatched_calls,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            hash = manifest.short_hash(),
            rows = stats.rows,
            unmatched = unmatched_calls,
            duration_ms = stats.duration_ms,
            "build complete"
        );
        Ok(BuildOutput {
            rows,
            manifest,
            artifact_path,
            stats,
        })
    }

    /// Write the artifact, then commit by replacing the live manifest.
    ///
    /// The manifest rename is the commit point. Until it happens the previous
    /// manifest keeps pointing at its own artifact, which is never touched.
    pub fn publish(
        &self,
        output: &BuildOutput,
        store: &ManifestStore,
        cancel: &CancelToken,
    ) -> Result<ManifestRecord, BuildError> {
        cancel.check()?;
        let path = &output.artifact_path;

        let written = if path.exists() {
            debug!(path = %path.display(), "artifact already present, reusing");
            false
        } else {
            let size = write_artifact(path, &output.rows, &self.writer)?;
            debug!(path = %path.display(), size, "artifact staged");
            true
        };

        let committed = cancel.check().and_then(|()| {
            store.save(&output.manifest)?;
            Ok(())
        });
        if let Err(err) = committed {
            if written {
                discard(path);
            }
            return Err(err);
        }

        info!(
            hash = output.manifest.short_hash(),
            rows = output.manifest.row_count,
            path = %path.display(),
            "artifact published"
        );
        let removed = prune_artifacts(&self.artifact_dir, path, self.retain_artifacts);
        if !removed.is_empty() {
            debug!(count = removed.len(), "pruned old artifacts");
        }
        Ok(output.manifest.clone())
    }

    /// Build and publish in one step.
    pub fn run(
        &self,
        inputs: &EtlInputs,
        store: &ManifestStore,
        cancel: &CancelToken,
    ) -> Result<ManifestRecord, BuildError> {
        let output = self.build(inputs, cancel)?;
        self.publish(&output, store, cancel)
    }

    fn manifest_relative(&self, artifact_path: &Path) -> String {
        artifact_path
            .strip_prefix(&self.manifest_dir)
            .unwrap_or(artifact_path)
            .to_string_lossy()
            .into_owned()
    }
}

fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!(path = %path.display(), error = %e, "failed to remove unpublished artifact");
    }
}

#[derive(Default)]
struct ErrorCollector {
    total: usize,
    samples: Vec<RecordError>,
}

impl ErrorCollector {
    fn push(&mut self, kind: RecordKind, index: usize, raw: &Value, error: SchemaError) {
        self.total += 1;
        if self.samples.len() < SAMPLE_ERROR_LIMIT {
            let id_field = match kind {
                RecordKind::Call => "id",
                RecordKind::Agent => "agent_id",
            };
            self.samples.push(RecordError {
                kind,
                index,
                record_id: raw_id(raw, id_field),
                error,
            });
        }
    }

    fn into_error(self) -> Option<BuildError> {
        (self.total > 0).then_some(BuildError::Validation {
            invalid_record_count: self.total,
            sample_errors: self.samples,
        })
    }
}

fn raw_id(raw: &Value, field: &str) -> Option<String> {
    match raw.get(field)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn duplicate(field: &str, id: &str, first: usize) -> SchemaError {
    SchemaError {
        field: field.to_string(),
        reason: format!("duplicate id '{id}' (first seen at record #{first})"),
    }
}

fn validate_calls(raw: &[Value], errors: &mut ErrorCollector) -> Vec<CallRecord> {
    let mut seen: HashMap<CallId, usize> = HashMap::with_capacity(raw.len());
    let mut calls = Vec::with_capacity(raw.len());
    for (index, record) in raw.iter().enumerate() {
        match as_record(record).and_then(validate_call) {
            Ok(call) => {
                if let Some(&first) = seen.get(&call.id) {
                    let err = duplicate("id", call.id.as_str(), first);
                    errors.push(RecordKind::Call, index, record, err);
                } else {
                    seen.insert(call.id.clone(), index);
                    calls.push(call);
                }
            }
            Err(e) => errors.push(RecordKind::Call, index, record, e),
        }
    }
    calls
}

fn validate_agents(raw: &[Value], errors: &mut ErrorCollector) -> Vec<AgentRecord> {
    let mut seen: HashMap<AgentId, usize> = HashMap::with_capacity(raw.len());
    let mut agents = Vec::with_capacity(raw.len());
    for (index, record) in raw.iter().enumerate() {
        match as_record(record).and_then(validate_agent) {
            Ok(agent) => {
                if let Some(&first) = seen.get(&agent.agent_id) {
                    let err = duplicate("agent_id", agent.agent_id.as_str(), first);
                    errors.push(RecordKind::Agent, index, record, err);
                } else {
                    seen.insert(agent.agent_id.clone(), index);
                    agents.push(agent);
                }
            }
            Err(e) => errors.push(RecordKind::Agent, index, record, e),
        }
    }
    agents
}
