//! Support analytics common types, IDs, and errors.
//!
//! This crate provides foundational types shared across the pipeline crates:
//! - Call, agent, and artifact row records
//! - Derived leaderboard and KPI shapes
//! - Identifier newtypes
//! - Common error type with stable codes
//! - JSON schemas for the data contracts handed to the HTTP boundary

pub mod contract;
pub mod error;
pub mod id;
pub mod model;
pub mod schema;

pub use error::{Error, Result};
pub use id::{AgentId, CallId, RefreshId};
pub use model::{
    AgentRecord, AgentStats, ArtifactRow, CallRecord, MetricPoint, ResolutionStatus,
};
pub use schema::{ARTIFACT_SCHEMA_VERSION, SCHEMA_VERSION};
