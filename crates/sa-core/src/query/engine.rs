//! Snapshot ownership and manifest-driven reloads.

use super::snapshot::Snapshot;
use super::{CallFilters, CallPage, QueryError};
use crate::refresh::RefreshListener;
use sa_artifact::read_artifact;
use sa_common::{ArtifactRow, CallId, ARTIFACT_SCHEMA_VERSION};
use sa_config::QueryConfig;
use sa_manifest::{compare, fingerprint_rows, ManifestRecord, ManifestStore};
use serde::Serialize;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Result of [`QueryEngine::refresh_if_stale`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RefreshOutcome {
    Unchanged { hash: String },
    Reloaded { from: String, to: String },
}

/// Owner of the in-memory artifact.
///
/// The only writer of the current-snapshot pointer. Query and aggregation
/// calls never wait on a reload for longer than the pointer swap.
#[derive(Debug)]
pub struct QueryEngine {
    store: Arc<ManifestStore>,
    limits: QueryConfig,
    current: RwLock<Arc<Snapshot>>,
}

impl QueryEngine {
    /// Load the live manifest and its artifact. Fails if either is missing
    /// or the artifact does not match the manifest.
    pub fn open(store: Arc<ManifestStore>, limits: QueryConfig) -> Result<Self, QueryError> {
        let snapshot = load_snapshot(&store)?;
        info!(
            hash = snapshot.manifest().short_hash(),
            rows = snapshot.len(),
            "query engine opened"
        );
        Ok(Self {
            store,
            limits,
            current: RwLock::new(Arc::new(snapshot)),
        })
    }

    /// Wrap an already-built snapshot.
    pub fn from_snapshot(store: Arc<ManifestStore>, limits: QueryConfig, snapshot: Snapshot) -> Self {
        Self {
            store,
            limits,
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// The snapshot every subsequent read on this handle will see.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    pub fn fingerprint(&self) -> String {
        self.snapshot().fingerprint().to_string()
    }

    pub fn limits(&self) -> &QueryConfig {
        &self.limits
    }

    /// Filtered page of calls. `per_page` defaults from config.
    pub fn query(&self, filters: &CallFilters, page: u32, per_page: Option<u32>) -> CallPage {
        let per_page = per_page.unwrap_or(self.limits.default_per_page);
        self.snapshot()
            .query(filters, page, per_page, self.limits.max_per_page)
    }

    pub fn get_call(&self, id: &CallId) -> Option<ArtifactRow> {
        self.snapshot().get_call(id).cloned()
    }

    /// Re-read the manifest; if its fingerprint moved, load the new artifact
    /// and swap it in. On failure the current snapshot stays live.
    ///
    /// The swap only happens if no other reload installed a snapshot while
    /// this one was loading; otherwise the manifest is read again.
    pub fn refresh_if_stale(&self) -> Result<RefreshOutcome, QueryError> {
        loop {
            let current = self.snapshot();
            let manifest = self.store.load()?;
            if compare(current.manifest(), &manifest) {
                debug!(hash = manifest.short_hash(), "snapshot is current");
                return Ok(RefreshOutcome::Unchanged {
                    hash: manifest.hash,
                });
            }

            let started = Instant::now();
            let next = load_snapshot_for(&self.store, manifest).map_err(|e| {
                warn!(error = %e, "reload failed, keeping previous snapshot");
                e
            })?;

            match self.install(&current, next) {
                Some(outcome) => {
                    if let RefreshOutcome::Reloaded { from, to } = &outcome {
                        info!(
                            from = &from[..16.min(from.len())],
                            to = &to[..16.min(to.len())],
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "snapshot swapped"
                        );
                    }
                    return Ok(outcome);
                }
                None => debug!("concurrent reload installed first, re-reading manifest"),
            }
        }
    }

    /// Swap in `next` if the live snapshot is still `seen`. `None` when
    /// another reload replaced it in the meantime.
    fn install(&self, seen: &Arc<Snapshot>, next: Snapshot) -> Option<RefreshOutcome> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if !Arc::ptr_eq(&*guard, seen) {
            return None;
        }
        let from = guard.fingerprint().to_string();
        let to = next.fingerprint().to_string();
        *guard = Arc::new(next);
        Some(RefreshOutcome::Reloaded { from, to })
    }
}

impl RefreshListener for QueryEngine {
    fn name(&self) -> &str {
        "query-engine"
    }

    fn on_published(&self, _manifest: &ManifestRecord) -> sa_common::Result<()> {
        self.refresh_if_stale()?;
        Ok(())
    }
}

/// Load the live manifest and the artifact it names.
pub fn load_snapshot(store: &ManifestStore) -> Result<Snapshot, QueryError> {
    let manifest = store.load()?;
    load_snapshot_for(store, manifest)
}

/// Decode the artifact for `manifest` and check it against the manifest's
/// row count and fingerprint.
fn load_snapshot_for(store: &ManifestStore, manifest: ManifestRecord) -> Result<Snapshot, QueryError> {
    let path = manifest.artifact_path(store.dir());
    let rows = read_artifact(&path)?;

    if rows.len() as u64 != manifest.row_count {
        return Err(QueryError::Corrupt {
            path,
            reason: format!(
                "manifest row_count is {} but artifact has {} rows",
                manifest.row_count,
                rows.len()
            ),
        });
    }
    let hash = fingerprint_rows(ARTIFACT_SCHEMA_VERSION, &rows)?;
    if hash != manifest.hash {
        return Err(QueryError::Corrupt {
            path,
            reason: format!(
                "fingerprint mismatch: manifest {}, artifact {}",
                manifest.short_hash(),
                &hash[..16]
            ),
        });
    }
    Ok(Snapshot::from_rows(manifest, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::etl::{CancelToken, EtlCompiler, EtlInputs};
    use sa_config::AnalyticsConfig;
    use sa_manifest::ManifestError;
    use std::fs;
    use tempfile::TempDir;

    const CALLS: &str = r#"[
        {"id":"call-001","agent_id":"A-101","customer_region":"NA","issue_type":"Billing",
         "duration_seconds":100,"resolution_status":"Resolved","started_at":"2025-11-24T09:00:00Z","rating":5},
        {"id":"call-002","agent_id":"A-102","customer_region":"EMEA","issue_type":"Login",
         "duration_seconds":200,"resolution_status":"Escalated","started_at":"2025-11-25T10:00:00Z"}
    ]"#;
    const AGENTS: &str = "agent_id,name\nA-101,Dana Ortiz\nA-102,Lee Park\n";

    fn publish(config: &AnalyticsConfig, calls: &str) -> ManifestRecord {
        fs::write(&config.calls_path, calls).unwrap();
        fs::write(&config.agents_path, AGENTS).unwrap();
        EtlCompiler::new(config)
            .run(
                &EtlInputs::from_config(config),
                &ManifestStore::new(&config.manifest_path),
                &CancelToken::new(),
            )
            .unwrap()
    }

    fn engine(config: &AnalyticsConfig) -> Result<QueryEngine, QueryError> {
        QueryEngine::open(
            Arc::new(ManifestStore::new(&config.manifest_path)),
            config.query.clone(),
        )
    }

    #[test]
    fn open_without_manifest_is_not_found() {
        let dir = TempDir::new().unwrap();
        let config = AnalyticsConfig::with_data_dir(dir.path());
        let err = engine(&config).unwrap_err();
        assert!(matches!(err, QueryError::Manifest(ManifestError::NotFound(_))));
        assert_eq!(sa_common::Error::from(err).code(), 30);
    }

    #[test]
    fn open_and_query() {
        let dir = TempDir::new().unwrap();
        let config = AnalyticsConfig::with_data_dir(dir.path());
        let manifest = publish(&config, CALLS);
        let engine = engine(&config).unwrap();

        assert_eq!(engine.fingerprint(), manifest.hash);
        let page = engine.query(&CallFilters::default().region("EMEA"), 1, None);
        assert_eq!(page.total_matched, 1);
        assert_eq!(page.per_page, config.query.default_per_page);
        assert_eq!(page.rows[0].id.as_str(), "call-002");

        let row = engine.get_call(&CallId::from("call-001")).unwrap();
        assert_eq!(row.agent_name.as_deref(), Some("Dana Ortiz"));
    }

    #[test]
    fn refresh_if_stale_swaps_only_on_new_fingerprint() {
        let dir = TempDir::new().unwrap();
        let config = AnalyticsConfig::with_data_dir(dir.path());
        let first = publish(&config, CALLS);
        let engine = engine(&config).unwrap();

        assert!(matches!(
            engine.refresh_if_stale().unwrap(),
            RefreshOutcome::Unchanged { .. }
        ));

        let old = engine.snapshot();
        let second = publish(&config, &CALLS.replace("\"duration_seconds\":200", "\"duration_seconds\":250"));
        assert_eq!(
            engine.refresh_if_stale().unwrap(),
            RefreshOutcome::Reloaded {
                from: first.hash.clone(),
                to: second.hash.clone(),
            }
        );
        // A snapshot taken before the swap is unaffected.
        assert_eq!(old.fingerprint(), first.hash);
        assert_eq!(engine.fingerprint(), second.hash);
    }

    #[test]
    fn slow_reload_never_replaces_a_newer_snapshot() {
        let dir = TempDir::new().unwrap();
        let config = AnalyticsConfig::with_data_dir(dir.path());
        publish(&config, CALLS);
        let engine = engine(&config).unwrap();
        let seen = engine.snapshot();

        let second = publish(&config, &CALLS.replace("\"duration_seconds\":200", "\"duration_seconds\":250"));
        let slow = load_snapshot(&engine.store).unwrap();
        assert_eq!(slow.fingerprint(), second.hash);

        // A faster reload picks up the third manifest first.
        let third = publish(&config, &CALLS.replace("\"duration_seconds\":200", "\"duration_seconds\":300"));
        assert!(matches!(
            engine.refresh_if_stale().unwrap(),
            RefreshOutcome::Reloaded { .. }
        ));
        assert_eq!(engine.fingerprint(), third.hash);

        // The slow reload started from `seen` and must back off.
        assert_eq!(engine.install(&seen, slow), None);
        assert_eq!(engine.fingerprint(), third.hash);
        assert_eq!(
            engine.refresh_if_stale().unwrap(),
            RefreshOutcome::Unchanged { hash: third.hash }
        );
    }

    #[test]
    fn install_from_current_snapshot_swaps() {
        let dir = TempDir::new().unwrap();
        let config = AnalyticsConfig::with_data_dir(dir.path());
        let first = publish(&config, CALLS);
        let engine = engine(&config).unwrap();
        let seen = engine.snapshot();

        let second = publish(&config, &CALLS.replace("\"duration_seconds\":100", "\"duration_seconds\":110"));
        let next = load_snapshot(&engine.store).unwrap();
        assert_eq!(
            engine.install(&seen, next),
            Some(RefreshOutcome::Reloaded {
                from: first.hash,
                to: second.hash.clone(),
            })
        );
        assert_eq!(engine.fingerprint(), second.hash);
    }

    #[test]
    fn failed_reload_keeps_serving_previous_snapshot() {
        let dir = TempDir::new().unwrap();
        let config = AnalyticsConfig::with_data_dir(dir.path());
        let first = publish(&config, CALLS);
        let engine = engine(&config).unwrap();

        // Point the manifest at an artifact that does not exist.
        let store = ManifestStore::new(&config.manifest_path);
        let mut broken = first.clone();
        broken.hash = "c".repeat(64);
        broken.path = "artifacts/calls-missing.parquet".to_string();
        store.save(&broken).unwrap();

        assert!(matches!(
            engine.refresh_if_stale(),
            Err(QueryError::Artifact(_))
        ));
        assert_eq!(engine.fingerprint(), first.hash);
        assert_eq!(engine.query(&CallFilters::default(), 1, None).total_matched, 2);
    }

    #[test]
    fn tampered_manifest_hash_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let config = AnalyticsConfig::with_data_dir(dir.path());
        let mut manifest = publish(&config, CALLS);
        manifest.hash = "d".repeat(64);
        ManifestStore::new(&config.manifest_path).save(&manifest).unwrap();

        let err = engine(&config).unwrap_err();
        assert!(matches!(err, QueryError::Corrupt { .. }));
        assert!(err.to_string().contains("fingerprint mismatch"));
    }

    #[test]
    fn row_count_mismatch_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let config = AnalyticsConfig::with_data_dir(dir.path());
        let mut manifest = publish(&config, CALLS);
        manifest.row_count = 7;
        ManifestStore::new(&config.manifest_path).save(&manifest).unwrap();

        let err = engine(&config).unwrap_err();
        assert!(err.to_string().contains("row_count is 7"));
    }
}
