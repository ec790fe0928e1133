//! Config resolution: CLI → env → TOML file → defaults.
//!
//! Resolution happens exactly once, in the binary's `main`. The environment
//! is read through an injected lookup so tests never touch process state.

use crate::config::{AnalyticsConfig, QueryConfig, RefreshConfig};
use crate::validate::{validate_config, ValidationError};
use crate::ENV_PREFIX;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

const DEFAULT_CONFIG_FILE: &str = "config.toml";
const CONFIG_DIR_NAME: &str = "support-analytics";

/// Errors from config resolution.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {key}: {value}")]
    InvalidEnv { key: String, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(#[from] ValidationError),
}

/// Values supplied on the command line. `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub calls_path: Option<PathBuf>,
    pub agents_path: Option<PathBuf>,
    pub manifest_path: Option<PathBuf>,
    pub artifact_dir: Option<PathBuf>,
    pub log_level: Option<String>,
    pub log_json: Option<bool>,
}

/// On-disk TOML shape. Every field is optional; absent fields fall through.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    data_dir: Option<PathBuf>,
    calls_path: Option<PathBuf>,
    agents_path: Option<PathBuf>,
    manifest_path: Option<PathBuf>,
    artifact_dir: Option<PathBuf>,
    #[serde(default)]
    query: Option<QueryConfig>,
    #[serde(default)]
    refresh: Option<RefreshConfig>,
    #[serde(default)]
    log: Option<FileLogConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileLogConfig {
    level: Option<String>,
    json: Option<bool>,
}

/// Resolve configuration against the real process environment.
pub fn resolve_config(overrides: &ConfigOverrides) -> Result<AnalyticsConfig, ConfigError> {
    resolve_config_with(overrides, |key| std::env::var(key).ok())
}

/// Resolve configuration with an explicit environment lookup.
pub fn resolve_config_with<F>(
    overrides: &ConfigOverrides,
    env: F,
) -> Result<AnalyticsConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| env(&format!("{ENV_PREFIX}{name}")).filter(|v| !v.is_empty());

    let file_path = overrides
        .config_path
        .clone()
        .or_else(|| var("CONFIG").map(PathBuf::from));
    let file = match file_path {
        Some(path) => read_config_file(&path)?,
        None => match default_config_path().filter(|p| p.exists()) {
            Some(path) => read_config_file(&path)?,
            None => ConfigFile::default(),
        },
    };

    let data_dir = overrides
        .data_dir
        .clone()
        .or_else(|| var("DATA_DIR").map(PathBuf::from))
        .or_else(|| file.data_dir.clone());
    let mut config = match data_dir {
        Some(dir) => AnalyticsConfig::with_data_dir(dir),
        None => AnalyticsConfig::default(),
    };

    // File layer.
    apply_path(&mut config.calls_path, file.calls_path);
    apply_path(&mut config.agents_path, file.agents_path);
    apply_path(&mut config.manifest_path, file.manifest_path);
    apply_path(&mut config.artifact_dir, file.artifact_dir);
    if let Some(query) = file.query {
        config.query = query;
    }
    if let Some(refresh) = file.refresh {
        config.refresh = refresh;
    }
    if let Some(log) = file.log {
        if let Some(level) = log.level {
            config.log.level = level;
        }
        if let Some(json) = log.json {
            config.log.json = json;
        }
    }

    // Env layer.
    apply_path(&mut config.calls_path, var("CALLS_PATH").map(PathBuf::from));
    apply_path(&mut config.agents_path, var("AGENTS_PATH").map(PathBuf::from));
    apply_path(&mut config.manifest_path, var("MANIFEST_PATH").map(PathBuf::from));
    apply_path(&mut config.artifact_dir, var("ARTIFACT_DIR").map(PathBuf::from));
    if let Some(level) = var("LOG_LEVEL") {
        config.log.level = level;
    }
    if let Some(raw) = var("LOG_JSON") {
        config.log.json = parse_bool(&raw).ok_or_else(|| ConfigError::InvalidEnv {
            key: format!("{ENV_PREFIX}LOG_JSON"),
            value: raw.clone(),
        })?;
    }
    if let Some(raw) = var("MAX_PER_PAGE") {
        config.query.max_per_page = raw.parse().map_err(|_| ConfigError::InvalidEnv {
            key: format!("{ENV_PREFIX}MAX_PER_PAGE"),
            value: raw.clone(),
        })?;
    }

    // CLI layer.
    apply_path(&mut config.calls_path, overrides.calls_path.clone());
    apply_path(&mut config.agents_path, overrides.agents_path.clone());
    apply_path(&mut config.manifest_path, overrides.manifest_path.clone());
    apply_path(&mut config.artifact_dir, overrides.artifact_dir.clone());
    if let Some(level) = &overrides.log_level {
        config.log.level = level.clone();
    }
    if let Some(json) = overrides.log_json {
        config.log.json = json;
    }

    validate_config(&config)?;
    Ok(config)
}

/// `$XDG_CONFIG_HOME/support-analytics/config.toml` (or platform equivalent).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(DEFAULT_CONFIG_FILE))
}

fn read_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn apply_path(slot: &mut PathBuf, value: Option<PathBuf>) {
    if let Some(v) = value {
        *slot = v;
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
