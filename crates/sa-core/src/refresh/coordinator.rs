//! Single-writer refresh orchestration.

use super::history::{RefreshEvent, RefreshHistory, RefreshResult};
use super::RefreshListener;
use crate::etl::{BuildError, CancelToken, EtlCompiler, EtlInputs};
use sa_manifest::{ManifestRecord, ManifestStore};
use std::sync::{Arc, Mutex, PoisonError, TryLockError};
use std::time::Instant;
use tracing::{info, info_span, warn};

/// Runs the ETL compiler, publishes, and signals listeners.
///
/// At most one build runs at a time; a second caller is rejected with
/// [`BuildError::Busy`] rather than queued. A failed build leaves the
/// published manifest and artifact untouched.
pub struct RefreshCoordinator {
    compiler: EtlCompiler,
    store: Arc<ManifestStore>,
    listeners: Vec<Arc<dyn RefreshListener>>,
    build_lock: Mutex<()>,
    history: Mutex<RefreshHistory>,
}

impl RefreshCoordinator {
    pub fn new(compiler: EtlCompiler, store: Arc<ManifestStore>, history: RefreshHistory) -> Self {
        Self {
            compiler,
            store,
            listeners: Vec::new(),
            build_lock: Mutex::new(()),
            history: Mutex::new(history),
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn RefreshListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn store(&self) -> &ManifestStore {
        &self.store
    }

    /// Whether a build currently holds the build lock.
    pub fn is_building(&self) -> bool {
        matches!(self.build_lock.try_lock(), Err(TryLockError::WouldBlock))
    }

    /// Build from `inputs` and publish. Returns the new live manifest.
    pub fn refresh(&self, inputs: &EtlInputs, cancel: &CancelToken) -> Result<ManifestRecord, BuildError> {
        let started = Instant::now();
        let _build = match self.build_lock.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => {
                warn!("refresh rejected: build already running");
                self.record(RefreshEvent::new(
                    RefreshResult::Rejected,
                    0,
                    BuildError::Busy.to_string(),
                ));
                return Err(BuildError::Busy);
            }
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };

        let span = info_span!("refresh");
        let _enter = span.enter();
        let result = self.compiler.run(inputs, &self.store, cancel);
        let elapsed = started.elapsed().as_millis() as u64;

        match &result {
            Ok(manifest) => {
                self.notify(manifest);
                self.record(RefreshEvent::new(
                    RefreshResult::Success,
                    elapsed,
                    format!("{}: {}", manifest.short_hash(), manifest.notes),
                ));
                info!(hash = manifest.short_hash(), elapsed_ms = elapsed, "refresh succeeded");
            }
            Err(e) => {
                self.record(RefreshEvent::new(RefreshResult::Failed, elapsed, e.to_string()));
                warn!(error = %e, elapsed_ms = elapsed, "refresh failed, previous artifact stays live");
            }
        }
        result
    }

    /// Newest first.
    pub fn history(&self) -> Vec<RefreshEvent> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .events()
    }

    fn notify(&self, manifest: &ManifestRecord) {
        for listener in &self.listeners {
            if let Err(e) = listener.on_published(manifest) {
                warn!(listener = listener.name(), error = %e, "listener failed after publish");
            }
        }
    }

    fn record(&self, event: RefreshEvent) {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(event);
    }
}
