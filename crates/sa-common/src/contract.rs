//! JSON schemas for the data contracts exposed to the HTTP boundary.
//!
//! The boundary layer owns request/response envelopes; the core only
//! publishes the shapes of the records it hands over.

use crate::model::{AgentStats, ArtifactRow, CallRecord, MetricPoint};
use schemars::schema_for;
use std::collections::BTreeMap;

/// Names of the exported contracts, in output order.
pub const CONTRACT_NAMES: [&str; 4] = ["agent_stats", "artifact_row", "call_record", "metric_point"];

/// Generate JSON schemas for every boundary record, keyed by contract name.
pub fn contract_schemas() -> crate::Result<BTreeMap<&'static str, serde_json::Value>> {
    let mut out = BTreeMap::new();
    out.insert("agent_stats", serde_json::to_value(schema_for!(AgentStats))?);
    out.insert("artifact_row", serde_json::to_value(schema_for!(ArtifactRow))?);
    out.insert("call_record", serde_json::to_value(schema_for!(CallRecord))?);
    out.insert("metric_point", serde_json::to_value(schema_for!(MetricPoint))?);
    Ok(out)
}
