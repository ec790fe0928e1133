//! Support analytics configuration loading and validation.
//!
//! This crate provides:
//! - The explicit [`AnalyticsConfig`] struct every component receives by reference
//! - Config resolution (CLI → env → TOML file → defaults), performed once at startup
//! - Semantic validation

pub mod config;
pub mod resolve;
pub mod validate;

pub use config::{
    AnalyticsConfig, LogConfig, QueryConfig, RefreshConfig, DEFAULT_PER_PAGE, MAX_PER_PAGE,
};
pub use resolve::{resolve_config, resolve_config_with, ConfigError, ConfigOverrides};
pub use validate::{validate_config, ValidationError};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";

/// Prefix for every environment override.
pub const ENV_PREFIX: &str = "SA_";
