//! Record types shared by the ETL, query, and aggregation layers.
//!
//! Everything here is plain data: no I/O, no framework types. The HTTP
//! boundary serializes these directly.

use crate::id::{AgentId, CallId};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Outcome of a support call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum ResolutionStatus {
    Resolved,
    Escalated,
    Pending,
    Abandoned,
}

impl ResolutionStatus {
    pub const ALL: [ResolutionStatus; 4] = [
        ResolutionStatus::Resolved,
        ResolutionStatus::Escalated,
        ResolutionStatus::Pending,
        ResolutionStatus::Abandoned,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResolutionStatus::Resolved => "Resolved",
            ResolutionStatus::Escalated => "Escalated",
            ResolutionStatus::Pending => "Pending",
            ResolutionStatus::Abandoned => "Abandoned",
        }
    }
}

impl fmt::Display for ResolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolutionStatus {
    type Err = String;

    /// Case-insensitive parse; raw sources disagree on capitalization.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| format!("unknown resolution status '{trimmed}'"))
    }
}

/// A validated support call. Immutable once written into an artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CallRecord {
    pub id: CallId,
    pub agent_id: AgentId,
    pub customer_region: String,
    pub issue_type: String,
    pub duration_seconds: u64,
    pub resolution_status: ResolutionStatus,
    /// Call start, normalized to UTC with millisecond precision.
    pub started_at: DateTime<Utc>,
    /// Customer rating in `[0, 5]`; absent when the customer skipped the survey.
    #[serde(default)]
    pub rating: Option<f64>,
}

/// A validated agent metadata row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AgentRecord {
    pub agent_id: AgentId,
    pub name: String,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

/// One row of the columnar artifact: a call left-joined with its agent.
///
/// Agent fields are `None` when the call's agent id had no metadata row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ArtifactRow {
    #[serde(flatten)]
    pub call: CallRecord,
    pub agent_name: Option<String>,
    pub agent_team: Option<String>,
    pub agent_region: Option<String>,
}

impl ArtifactRow {
    /// Join a call with its (possibly missing) agent.
    pub fn join(call: CallRecord, agent: Option<&AgentRecord>) -> Self {
        Self {
            call,
            agent_name: agent.map(|a| a.name.clone()),
            agent_team: agent.and_then(|a| a.team.clone()),
            agent_region: agent.and_then(|a| a.region.clone()),
        }
    }

    pub fn has_agent(&self) -> bool {
        self.agent_name.is_some()
    }
}

/// Leaderboard entry derived from the artifact. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AgentStats {
    pub agent_id: AgentId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    /// Mean over rated calls only; `None` when no call carried a rating.
    pub avg_rating: Option<f64>,
    pub total_calls: u64,
    pub avg_resolution_seconds: f64,
}

/// One value within a KPI time-series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetricPoint {
    /// Bucket start (UTC).
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    /// Change versus the previous bucket; `None` for the first point.
    pub delta: Option<f64>,
}
