//! Schema versions for JSON outputs and the artifact layout.

/// Current schema version for all JSON outputs.
///
/// Follows semver: MAJOR.MINOR.PATCH
/// - MAJOR: Breaking changes (field removals, type changes)
/// - MINOR: Additive changes (new optional fields)
/// - PATCH: Bug fixes, documentation
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Version of the columnar artifact layout. Part of the canonical
/// serialization, so bumping it changes every fingerprint.
pub const ARTIFACT_SCHEMA_VERSION: &str = "calls.v1";
