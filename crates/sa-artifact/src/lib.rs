//! Support analytics artifact storage.
//!
//! This crate provides:
//! - The Arrow schema for the joined calls table
//! - A Parquet writer that publishes through a temp file and a rename
//! - A Parquet reader that decodes back into [`sa_common::ArtifactRow`]s

pub mod error;
pub mod reader;
pub mod schema;
pub mod writer;

pub use error::{ArtifactError, Result};
pub use reader::read_artifact;
pub use schema::{calls_schema, column};
pub use writer::{rows_to_batch, pretty_rows, write_artifact, WriterConfig};

/// Default rows per record batch / row group.
pub const DEFAULT_BATCH_SIZE: usize = 8192;

/// File extension for published artifacts.
pub const ARTIFACT_EXTENSION: &str = "parquet";
