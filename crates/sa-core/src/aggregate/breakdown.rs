//! Categorical breakdowns for the dashboard panels.

use sa_common::ArtifactRow;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Column a breakdown groups by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    IssueType,
    Region,
    Status,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownEntry {
    pub key: String,
    pub count: u64,
    /// Fraction of all rows, in `[0, 1]`.
    pub share: f64,
}

fn key_of(row: &ArtifactRow, dimension: Dimension) -> &str {
    match dimension {
        Dimension::IssueType => &row.call.issue_type,
        Dimension::Region => &row.call.customer_region,
        Dimension::Status => row.call.resolution_status.as_str(),
    }
}

/// Row counts per distinct value, ordered by count descending then key.
pub fn breakdown(rows: &[ArtifactRow], dimension: Dimension) -> Vec<BreakdownEntry> {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for row in rows {
        *counts.entry(key_of(row, dimension)).or_default() += 1;
    }
    let total = rows.len() as f64;
    let mut entries: Vec<BreakdownEntry> = counts
        .into_iter()
        .map(|(key, count)| BreakdownEntry {
            key: key.to_string(),
            count,
            share: count as f64 / total,
        })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use sa_common::{AgentId, CallId, CallRecord, ResolutionStatus};

    fn row(region: &str, issue: &str) -> ArtifactRow {
        ArtifactRow::join(
            CallRecord {
                id: CallId::from("c"),
                agent_id: AgentId::from("A-101"),
                customer_region: region.to_string(),
                issue_type: issue.to_string(),
                duration_seconds: 1,
                resolution_status: ResolutionStatus::Escalated,
                started_at: Utc.with_ymd_and_hms(2025, 11, 24, 9, 0, 0).unwrap(),
                rating: None,
            },
            None,
        )
    }

    #[test]
    fn counts_and_shares() {
        let rows = vec![
            row("NA", "Billing"),
            row("EMEA", "Login"),
            row("NA", "Login"),
            row("APAC", "Billing"),
        ];
        let by_region = breakdown(&rows, Dimension::Region);
        assert_eq!(by_region[0].key, "NA");
        assert_eq!(by_region[0].count, 2);
        assert_eq!(by_region[0].share, 0.5);
        // Ties ordered by key.
        assert_eq!(by_region[1].key, "APAC");
        assert_eq!(by_region[2].key, "EMEA");

        let by_issue = breakdown(&rows, Dimension::IssueType);
        assert_eq!(by_issue.len(), 2);
        assert_eq!(by_issue[0].key, "Billing");

        let by_status = breakdown(&rows, Dimension::Status);
        assert_eq!(by_status.len(), 1);
        assert_eq!(by_status[0].key, "Escalated");
        assert_eq!(by_status[0].share, 1.0);
    }

    #[test]
    fn empty_rows() {
        assert!(breakdown(&[], Dimension::Region).is_empty());
    }
}
