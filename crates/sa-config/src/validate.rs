//! Semantic validation of a resolved configuration.

use crate::config::{AnalyticsConfig, MAX_PER_PAGE};
use thiserror::Error;

/// A configuration value that parses but cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    EmptyPath { field: &'static str },

    #[error("query.max_per_page must be in [1, 200], got {0}")]
    MaxPerPage(u32),

    #[error("query.default_per_page must be in [1, max_per_page={max}], got {value}")]
    DefaultPerPage { value: u32, max: u32 },

    #[error("refresh.retain_artifacts must be at least 1")]
    RetainArtifacts,

    #[error("refresh.history_limit must be at least 1")]
    HistoryLimit,

    #[error("calls_path and agents_path must differ")]
    SameSource,
}

/// Validate semantic constraints that serde cannot express.
pub fn validate_config(config: &AnalyticsConfig) -> Result<(), ValidationError> {
    for (field, path) in [
        ("calls_path", &config.calls_path),
        ("agents_path", &config.agents_path),
        ("manifest_path", &config.manifest_path),
        ("artifact_dir", &config.artifact_dir),
    ] {
        if path.as_os_str().is_empty() {
            return Err(ValidationError::EmptyPath { field });
        }
    }
    if config.calls_path == config.agents_path {
        return Err(ValidationError::SameSource);
    }

    let query = &config.query;
    if query.max_per_page == 0 || query.max_per_page > MAX_PER_PAGE {
        return Err(ValidationError::MaxPerPage(query.max_per_page));
    }
    if query.default_per_page == 0 || query.default_per_page > query.max_per_page {
        return Err(ValidationError::DefaultPerPage {
            value: query.default_per_page,
            max: query.max_per_page,
        });
    }

    if config.refresh.retain_artifacts == 0 {
        return Err(ValidationError::RetainArtifacts);
    }
    if config.refresh.history_limit == 0 {
        return Err(ValidationError::HistoryLimit);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&AnalyticsConfig::default()).is_ok());
    }

    #[test]
    fn page_bounds_enforced() {
        let mut config = AnalyticsConfig::default();
        config.query.max_per_page = 500;
        assert_eq!(
            validate_config(&config),
            Err(ValidationError::MaxPerPage(500))
        );

        let mut config = AnalyticsConfig::default();
        config.query.default_per_page = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ValidationError::DefaultPerPage { .. })
        ));
    }

    #[test]
    fn empty_path_rejected() {
        let mut config = AnalyticsConfig::default();
        config.manifest_path = PathBuf::new();
        assert_eq!(
            validate_config(&config),
            Err(ValidationError::EmptyPath {
                field: "manifest_path"
            })
        );
    }

    #[test]
    fn identical_sources_rejected() {
        let mut config = AnalyticsConfig::default();
        config.agents_path = config.calls_path.clone();
        assert_eq!(validate_config(&config), Err(ValidationError::SameSource));
    }
}
