//! Manifest store for the published calls artifact.
//!
//! The manifest is the single source of truth for "which artifact is live".
//! It is written atomically (temp file + rename) and never mutated in place:
//! each successful build supersedes the previous manifest wholesale.
//!
//! Equality between manifests is defined purely by fingerprint.

pub mod error;
pub mod fingerprint;
pub mod record;
pub mod store;

pub use error::{ManifestError, Result};
pub use fingerprint::{canonical_json, fingerprint_rows, is_sha256_hex, sha256_hex, Fingerprinter};
pub use record::{compare, ManifestRecord};
pub use store::{write_atomic, ManifestInfo, ManifestStore};

/// Default manifest file name.
pub const MANIFEST_FILE: &str = "manifest.json";
