//! Immutable loaded state: manifest, rows, indexes.

use super::index::FilterIndex;
use super::{CallFilters, CallPage};
use crate::aggregate;
use chrono::{DateTime, Utc};
use sa_common::{AgentStats, ArtifactRow, CallId};
use sa_config::MAX_PER_PAGE;
use sa_manifest::ManifestRecord;
use std::sync::OnceLock;
use tracing::debug;

/// One published artifact resident in memory.
///
/// Never mutated after construction. Derived views (the leaderboard) are
/// computed at most once per snapshot and cached alongside it.
#[derive(Debug)]
pub struct Snapshot {
    manifest: ManifestRecord,
    rows: Vec<ArtifactRow>,
    index: FilterIndex,
    loaded_at: DateTime<Utc>,
    agent_stats: OnceLock<Vec<AgentStats>>,
}

impl Snapshot {
    pub fn from_rows(manifest: ManifestRecord, rows: Vec<ArtifactRow>) -> Self {
        let index = FilterIndex::build(&rows);
        debug!(
            hash = manifest.short_hash(),
            rows = rows.len(),
            regions = index.regions().len(),
            "snapshot indexed"
        );
        Self {
            manifest,
            rows,
            index,
            loaded_at: Utc::now(),
            agent_stats: OnceLock::new(),
        }
    }

    pub fn manifest(&self) -> &ManifestRecord {
        &self.manifest
    }

    pub fn fingerprint(&self) -> &str {
        &self.manifest.hash
    }

    pub fn rows(&self) -> &[ArtifactRow] {
        &self.rows
    }

    pub fn index(&self) -> &FilterIndex {
        &self.index
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Filter and paginate. `page` is 1-based (0 is read as 1); `per_page`
    /// is clamped to `[1, max_per_page]`. Pages past the end are empty.
    pub fn query(&self, filters: &CallFilters, page: u32, per_page: u32, max_per_page: u32) -> CallPage {
        let max_per_page = max_per_page.clamp(1, MAX_PER_PAGE);
        let per_page = per_page.clamp(1, max_per_page);
        let page = page.max(1);

        let matches = self.index.matches(filters);
        let total_matched = matches.len();
        let total_pages = total_matched.div_ceil(per_page as usize) as u32;
        let start = (page as usize - 1).saturating_mul(per_page as usize);
        let rows = matches
            .window(start, per_page as usize)
            .into_iter()
            .map(|pos| self.rows[pos].call.clone())
            .collect();

        CallPage {
            rows,
            total_matched,
            page,
            per_page,
            total_pages,
        }
    }

    /// Point lookup including the joined agent fields.
    pub fn get_call(&self, id: &CallId) -> Option<&ArtifactRow> {
        self.index.position(id).map(|pos| &self.rows[pos])
    }

    /// Agent leaderboard for this snapshot, computed on first use.
    pub fn agent_stats(&self) -> &[AgentStats] {
        self.agent_stats
            .get_or_init(|| aggregate::agent_stats(&self.rows))
    }
}
