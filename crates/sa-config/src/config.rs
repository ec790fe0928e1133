//! Typed configuration for the analytics pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default page size when a caller does not ask for one.
pub const DEFAULT_PER_PAGE: u32 = 50;
/// Hard upper bound on page size.
pub const MAX_PER_PAGE: u32 = 200;
/// Refresh attempts kept in memory for the history view.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;
/// Published artifacts kept on disk, including the live one.
pub const DEFAULT_RETAIN_ARTIFACTS: usize = 3;

/// Fully resolved configuration.
///
/// Built once at process start and passed by reference to each component
/// constructor. Nothing downstream reads the environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Root for default input and output locations.
    pub data_dir: PathBuf,
    /// Raw calls source (`.json`, `.jsonl`, or `.csv`).
    pub calls_path: PathBuf,
    /// Raw agent metadata source (`.json`, `.jsonl`, or `.csv`).
    pub agents_path: PathBuf,
    /// Live manifest location.
    pub manifest_path: PathBuf,
    /// Directory holding content-addressed artifacts.
    pub artifact_dir: PathBuf,
    pub query: QueryConfig,
    pub refresh: RefreshConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryConfig {
    pub default_per_page: u32,
    pub max_per_page: u32,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_per_page: DEFAULT_PER_PAGE,
            max_per_page: MAX_PER_PAGE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshConfig {
    pub history_limit: usize,
    pub retain_artifacts: usize,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            retain_artifacts: DEFAULT_RETAIN_ARTIFACTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive, e.g. `info` or `sa_core=debug`.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AnalyticsConfig {
    /// Conventional layout under `data_dir`.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            calls_path: data_dir.join("sample_calls.json"),
            agents_path: data_dir.join("agents.csv"),
            manifest_path: data_dir.join("manifest.json"),
            artifact_dir: data_dir.join("artifacts"),
            data_dir,
            query: QueryConfig::default(),
            refresh: RefreshConfig::default(),
            log: LogConfig::default(),
        }
    }

    /// Path used for the refresh history log.
    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join("refresh_history.jsonl")
    }

    pub fn manifest_dir(&self) -> &Path {
        self.manifest_path.parent().unwrap_or_else(|| Path::new("."))
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self::with_data_dir("data")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_matches_documented_paths() {
        let config = AnalyticsConfig::default();
        assert_eq!(config.calls_path, PathBuf::from("data/sample_calls.json"));
        assert_eq!(config.agents_path, PathBuf::from("data/agents.csv"));
        assert_eq!(config.manifest_path, PathBuf::from("data/manifest.json"));
        assert_eq!(config.query.max_per_page, 200);
    }

    #[test]
    fn manifest_dir_is_parent() {
        let config = AnalyticsConfig::with_data_dir("/srv/analytics");
        assert_eq!(config.manifest_dir(), Path::new("/srv/analytics"));
        assert_eq!(
            config.history_path(),
            PathBuf::from("/srv/analytics/refresh_history.jsonl")
        );
    }
}
