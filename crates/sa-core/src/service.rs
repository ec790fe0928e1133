//! Facade handed to the HTTP boundary.
//!
//! Every method returns plain serde-serializable data. Collaborators are
//! injected through [`AnalyticsService::new`]; [`AnalyticsService::open`]
//! wires the default set from an [`AnalyticsConfig`].

use crate::aggregate::{self, BreakdownEntry, Bucket, Dimension, KpiMetric};
use crate::etl::{BuildError, CancelToken, EtlCompiler, EtlInputs};
use crate::query::{CallFilters, CallPage, QueryEngine};
use crate::refresh::{RefreshCoordinator, RefreshEvent, RefreshHistory, RefreshResult};
use chrono::{DateTime, Utc};
use sa_common::{AgentStats, ArtifactRow, CallId, MetricPoint, SCHEMA_VERSION};
use sa_config::AnalyticsConfig;
use sa_manifest::{ManifestInfo, ManifestRecord, ManifestStore};
use serde::Serialize;
use std::sync::Arc;

/// Serving state summary.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub schema_version: &'static str,
    /// Fingerprint of the snapshot currently served.
    pub fingerprint: String,
    pub row_count: usize,
    pub loaded_at: DateTime<Utc>,
    /// Fingerprint of the manifest on disk, when readable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_fingerprint: Option<String>,
    pub building: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_refresh: Option<RefreshEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Ok,
    /// Serving an older artifact than the one published.
    Stale,
    /// The published manifest cannot be read, or the last refresh failed;
    /// the last good snapshot is served.
    Degraded,
}

pub struct AnalyticsService {
    engine: Arc<QueryEngine>,
    store: Arc<ManifestStore>,
    coordinator: RefreshCoordinator,
    inputs: EtlInputs,
}

impl AnalyticsService {
    pub fn new(
        engine: Arc<QueryEngine>,
        store: Arc<ManifestStore>,
        coordinator: RefreshCoordinator,
        inputs: EtlInputs,
    ) -> Self {
        Self {
            engine,
            store,
            coordinator,
            inputs,
        }
    }

    /// Open the published artifact and wire the refresh path to reload it.
    pub fn open(config: &AnalyticsConfig) -> sa_common::Result<Self> {
        let store = Arc::new(ManifestStore::new(&config.manifest_path));
        let engine = Arc::new(QueryEngine::open(Arc::clone(&store), config.query.clone())?);
        let history = RefreshHistory::with_log(config.history_path(), config.refresh.history_limit)?;
        let coordinator =
            RefreshCoordinator::new(EtlCompiler::new(config), Arc::clone(&store), history)
                .with_listener(engine.clone());
        Ok(Self::new(engine, store, coordinator, EtlInputs::from_config(config)))
    }

    pub fn engine(&self) -> &Arc<QueryEngine> {
        &self.engine
    }

    pub fn query(&self, filters: &CallFilters, page: u32, per_page: Option<u32>) -> CallPage {
        self.engine.query(filters, page, per_page)
    }

    pub fn get_call(&self, id: &CallId) -> Option<ArtifactRow> {
        self.engine.get_call(id)
    }

    pub fn agent_stats(&self) -> Vec<AgentStats> {
        self.engine.snapshot().agent_stats().to_vec()
    }

    pub fn kpi_series(&self, bucket: Bucket, metric: KpiMetric) -> Vec<MetricPoint> {
        aggregate::kpi_series(self.engine.snapshot().rows(), bucket, metric)
    }

    pub fn breakdown(&self, dimension: Dimension) -> Vec<BreakdownEntry> {
        aggregate::breakdown(self.engine.snapshot().rows(), dimension)
    }

    /// Manifest of the snapshot being served.
    pub fn get_manifest(&self) -> ManifestRecord {
        self.engine.snapshot().manifest().clone()
    }

    /// Published manifest plus artifact file diagnostics.
    pub fn describe_manifest(&self) -> sa_common::Result<ManifestInfo> {
        Ok(self.store.describe()?)
    }

    /// Rebuild from the configured sources.
    pub fn refresh(&self, cancel: &CancelToken) -> Result<ManifestRecord, BuildError> {
        self.coordinator.refresh(&self.inputs, cancel)
    }

    pub fn refresh_with(&self, inputs: &EtlInputs, cancel: &CancelToken) -> Result<ManifestRecord, BuildError> {
        self.coordinator.refresh(inputs, cancel)
    }

    pub fn refresh_history(&self) -> Vec<RefreshEvent> {
        self.coordinator.history()
    }

    pub fn health(&self) -> HealthReport {
        let snapshot = self.engine.snapshot();
        let last_refresh = self.coordinator.history().into_iter().next();
        let (published, mut error) = match self.store.load() {
            Ok(manifest) => (Some(manifest.hash), None),
            Err(e) => (None, Some(e.to_string())),
        };
        let refresh_failed = last_refresh
            .as_ref()
            .is_some_and(|event| event.result == RefreshResult::Failed);
        if refresh_failed && error.is_none() {
            error = last_refresh
                .as_ref()
                .map(|event| format!("last refresh failed: {}", event.note));
        }
        let status = match &published {
            None => HealthStatus::Degraded,
            Some(_) if refresh_failed => HealthStatus::Degraded,
            Some(hash) if hash != snapshot.fingerprint() => HealthStatus::Stale,
            Some(_) => HealthStatus::Ok,
        };
        HealthReport {
            status,
            schema_version: SCHEMA_VERSION,
            fingerprint: snapshot.fingerprint().to_string(),
            row_count: snapshot.len(),
            loaded_at: snapshot.loaded_at(),
            published_fingerprint: published,
            building: self.coordinator.is_building(),
            last_refresh,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const CALLS: &str = r#"[
        {"id":"call-001","agent_id":"A-101","customer_region":"NA","issue_type":"Billing",
         "duration_seconds":100,"resolution_status":"Resolved","started_at":"2025-11-24T09:00:00Z","rating":5},
        {"id":"call-002","agent_id":"A-101","customer_region":"EMEA","issue_type":"Login",
         "duration_seconds":200,"resolution_status":"Escalated","started_at":"2025-11-26T10:00:00Z","rating":3}
    ]"#;

    fn service(dir: &TempDir) -> (AnalyticsConfig, AnalyticsService) {
        let config = AnalyticsConfig::with_data_dir(dir.path());
        fs::write(&config.calls_path, CALLS).unwrap();
        fs::write(&config.agents_path, "agent_id,name\nA-101,Dana Ortiz\n").unwrap();
        EtlCompiler::new(&config)
            .run(
                &EtlInputs::from_config(&config),
                &ManifestStore::new(&config.manifest_path),
                &CancelToken::new(),
            )
            .unwrap();
        let service = AnalyticsService::open(&config).unwrap();
        (config, service)
    }

    #[test]
    fn serves_all_views_from_one_snapshot() {
        let dir = TempDir::new().unwrap();
        let (_config, service) = service(&dir);

        assert_eq!(service.query(&CallFilters::default(), 1, None).total_matched, 2);
        let stats = service.agent_stats();
        assert_eq!(stats[0].avg_rating, Some(4.0));
        assert_eq!(service.kpi_series(Bucket::Day, KpiMetric::CallVolume).len(), 3);
        assert_eq!(service.breakdown(Dimension::Region).len(), 2);
        assert_eq!(service.get_manifest().row_count, 2);
        assert!(service.describe_manifest().unwrap().artifact_present);
        assert_eq!(service.health().status, HealthStatus::Ok);
    }

    #[test]
    fn refresh_reloads_engine() {
        let dir = TempDir::new().unwrap();
        let (config, service) = service(&dir);
        let before = service.get_manifest();

        fs::write(&config.calls_path, CALLS.replace("\"rating\":3", "\"rating\":1")).unwrap();
        let after = service.refresh(&CancelToken::new()).unwrap();

        assert_ne!(before.hash, after.hash);
        assert_eq!(service.get_manifest(), after);
        assert_eq!(service.agent_stats()[0].avg_rating, Some(3.0));
        assert_eq!(service.refresh_history().len(), 1);
        assert!(config.history_path().exists());
    }

    #[test]
    fn health_reports_stale_snapshot() {
        let dir = TempDir::new().unwrap();
        let (config, service) = service(&dir);

        // Publish behind the service's back, without notifying it.
        fs::write(&config.calls_path, CALLS.replace("\"rating\":5", "\"rating\":4")).unwrap();
        EtlCompiler::new(&config)
            .run(
                &EtlInputs::from_config(&config),
                &ManifestStore::new(&config.manifest_path),
                &CancelToken::new(),
            )
            .unwrap();
        assert_eq!(service.health().status, HealthStatus::Stale);

        service.engine().refresh_if_stale().unwrap();
        assert_eq!(service.health().status, HealthStatus::Ok);
    }

    #[test]
    fn health_degraded_when_manifest_unreadable() {
        let dir = TempDir::new().unwrap();
        let (config, service) = service(&dir);
        fs::write(&config.manifest_path, "{ not json").unwrap();

        let health = service.health();
        assert_eq!(health.status, HealthStatus::Degraded);
        assert!(health.error.is_some());
        assert_eq!(health.row_count, 2);
    }

    #[test]
    fn health_degraded_after_failed_refresh() {
        let dir = TempDir::new().unwrap();
        let (config, service) = service(&dir);

        fs::write(&config.calls_path, CALLS.replace("\"duration_seconds\":100", "\"duration_seconds\":-1")).unwrap();
        assert!(service.refresh(&CancelToken::new()).is_err());
        let health = service.health();
        assert_eq!(health.status, HealthStatus::Degraded);
        assert!(health.error.unwrap().starts_with("last refresh failed"));
        assert_eq!(health.row_count, 2);

        fs::write(&config.calls_path, CALLS.replace("\"rating\":3", "\"rating\":2")).unwrap();
        service.refresh(&CancelToken::new()).unwrap();
        assert_eq!(service.health().status, HealthStatus::Ok);
    }
}
