//! Support analytics core: ETL compiler, query engine, aggregation layer,
//! and refresh coordination over a fingerprinted columnar artifact.
//!
//! Control flow: the [`refresh::RefreshCoordinator`] runs the
//! [`etl::EtlCompiler`], publishes the artifact and manifest, then signals the
//! [`query::QueryEngine`], which swaps in the new snapshot when the
//! fingerprint changed. Aggregations run against whichever snapshot a caller
//! is holding.

pub mod aggregate;
pub mod etl;
pub mod exit_codes;
pub mod logging;
pub mod query;
pub mod refresh;
pub mod service;
pub mod validate;

pub use etl::{BuildError, BuildOutput, CancelToken, EtlCompiler, EtlInputs};
pub use query::{CallFilters, CallPage, QueryEngine, QueryError, RefreshOutcome, Snapshot};
pub use refresh::{RefreshCoordinator, RefreshEvent, RefreshListener, RefreshResult};
pub use service::{AnalyticsService, HealthReport, HealthStatus};
