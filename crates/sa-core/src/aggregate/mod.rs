//! Aggregation layer: pure functions over a snapshot's rows.
//!
//! Nothing here performs I/O or holds locks. Callers pass the rows of one
//! snapshot, so every figure in a response comes from the same artifact.

pub mod agents;
pub mod breakdown;
pub mod kpi;

pub use agents::agent_stats;
pub use breakdown::{breakdown, BreakdownEntry, Dimension};
pub use kpi::{bucket_start, kpi_series, Bucket, KpiMetric};
