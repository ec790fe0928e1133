//! Refresh coordination: one build at a time, publish, then notify readers.

pub mod coordinator;
pub mod history;

pub use coordinator::RefreshCoordinator;
pub use history::{HistoryError, RefreshEvent, RefreshHistory, RefreshResult};

use sa_manifest::ManifestRecord;

/// Component that reacts to a newly published manifest.
///
/// Called after the manifest commit, so a failing listener cannot undo the
/// publish; its error is logged and the next signal retries.
pub trait RefreshListener: Send + Sync {
    fn name(&self) -> &str;

    fn on_published(&self, manifest: &ManifestRecord) -> sa_common::Result<()>;
}
