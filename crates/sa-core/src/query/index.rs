//! Posting-list indexes for the filter predicates.

use super::CallFilters;
use sa_common::{ArtifactRow, CallId, ResolutionStatus};
use std::collections::HashMap;

/// Row positions per distinct column value, each list ascending.
#[derive(Debug, Default)]
pub struct FilterIndex {
    by_region: HashMap<String, Vec<u32>>,
    by_issue: HashMap<String, Vec<u32>>,
    by_status: HashMap<ResolutionStatus, Vec<u32>>,
    by_id: HashMap<CallId, u32>,
    len: usize,
}

/// Positions of rows matching a filter, in artifact order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matches {
    /// Every row `0..n`.
    All(usize),
    Rows(Vec<u32>),
}

impl Matches {
    pub fn len(&self) -> usize {
        match self {
            Matches::All(n) => *n,
            Matches::Rows(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row positions in `[start, start + count)` of the match list.
    pub fn window(&self, start: usize, count: usize) -> Vec<usize> {
        match self {
            Matches::All(n) => (start.min(*n)..start.saturating_add(count).min(*n)).collect(),
            Matches::Rows(rows) => rows
                .iter()
                .skip(start)
                .take(count)
                .map(|&i| i as usize)
                .collect(),
        }
    }
}

impl FilterIndex {
    pub fn build(rows: &[ArtifactRow]) -> Self {
        let mut index = FilterIndex {
            len: rows.len(),
            ..Default::default()
        };
        for (pos, row) in rows.iter().enumerate() {
            let pos = pos as u32;
            let call = &row.call;
            index
                .by_region
                .entry(call.customer_region.clone())
                .or_default()
                .push(pos);
            index
                .by_issue
                .entry(call.issue_type.clone())
                .or_default()
                .push(pos);
            index
                .by_status
                .entry(call.resolution_status)
                .or_default()
                .push(pos);
            index.by_id.insert(call.id.clone(), pos);
        }
        index
    }

    pub fn position(&self, id: &CallId) -> Option<usize> {
        self.by_id.get(id).map(|&pos| pos as usize)
    }

    /// Distinct region values, sorted.
    pub fn regions(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.by_region.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Distinct issue types, sorted.
    pub fn issue_types(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.by_issue.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Resolve filters to matching row positions.
    pub fn matches(&self, filters: &CallFilters) -> Matches {
        const EMPTY: &[u32] = &[];
        let mut lists: Vec<&[u32]> = Vec::with_capacity(3);
        if let Some(region) = &filters.region {
            lists.push(self.by_region.get(region).map_or(EMPTY, Vec::as_slice));
        }
        if let Some(issue) = &filters.issue_type {
            lists.push(self.by_issue.get(issue).map_or(EMPTY, Vec::as_slice));
        }
        if let Some(status) = &filters.status {
            lists.push(self.by_status.get(status).map_or(EMPTY, Vec::as_slice));
        }

        lists.sort_by_key(|list| list.len());
        match lists.split_first() {
            None => Matches::All(self.len),
            Some((smallest, rest)) => Matches::Rows(
                smallest
                    .iter()
                    .copied()
                    .filter(|pos| rest.iter().all(|list| list.binary_search(pos).is_ok()))
                    .collect(),
            ),
        }
    }
}
