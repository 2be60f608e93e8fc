//! Service configuration.
//!
//! Loaded from TOML. Every field has a default, so an empty document is a
//! valid configuration:
//!
//! ```toml
//! default_validity_days = 365
//! max_identity_attempts = 3
//! default_page_size = 20
//! max_page_size = 100
//! statistics_window_days = 30
//! artifact_extension = "html"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use certa_contracts::error::{CertError, CertResult};

/// Upper bound for day-valued settings, roughly a century.
pub const MAX_PERIOD_DAYS: u32 = 36_500;

/// Tunables of the certificate orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Validity period of new certificates. `None` means they never expire by date.
    pub default_validity_days: Option<u32>,
    /// How many times identifiers are regenerated after a hash or code collision.
    pub max_identity_attempts: u32,
    pub default_page_size: u32,
    pub max_page_size: u32,
    /// Trailing window used for "recently issued" statistics.
    pub statistics_window_days: u32,
    /// File extension of stored artifacts.
    pub artifact_extension: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            default_validity_days: None,
            max_identity_attempts: 3,
            default_page_size: 20,
            max_page_size: 100,
            statistics_window_days: 30,
            artifact_extension: "html".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Parse `s` as TOML and validate the result.
    pub fn from_toml_str(s: &str) -> CertResult<Self> {
        let config: ServiceConfig = toml::from_str(s).map_err(|e| CertError::ConfigError {
            reason: format!("failed to parse service config TOML: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse the TOML file at `path`.
    pub fn from_file(path: &Path) -> CertResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| CertError::ConfigError {
            reason: format!("failed to read service config '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> CertResult<()> {
        if self.max_identity_attempts == 0 {
            return Err(CertError::ConfigError {
                reason: "max_identity_attempts must be at least 1".to_string(),
            });
        }
        if self.default_page_size == 0 || self.max_page_size == 0 {
            return Err(CertError::ConfigError {
                reason: "page sizes must be at least 1".to_string(),
            });
        }
        if self.default_page_size > self.max_page_size {
            return Err(CertError::ConfigError {
                reason: format!(
                    "default_page_size ({}) exceeds max_page_size ({})",
                    self.default_page_size, self.max_page_size
                ),
            });
        }
        if let Some(days) = self.default_validity_days.filter(|d| *d > MAX_PERIOD_DAYS) {
            return Err(CertError::ConfigError {
                reason: format!("default_validity_days ({days}) exceeds {MAX_PERIOD_DAYS} days"),
            });
        }
        if self.statistics_window_days > MAX_PERIOD_DAYS {
            return Err(CertError::ConfigError {
                reason: format!(
                    "statistics_window_days ({}) exceeds {MAX_PERIOD_DAYS} days",
                    self.statistics_window_days
                ),
            });
        }
        if self.artifact_extension.trim().is_empty() {
            return Err(CertError::ConfigError {
                reason: "artifact_extension must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Normalize a requested (page, page_size) pair: page 0 becomes 1, size 0
    /// becomes the default, oversize requests are clamped.
    pub fn paging(&self, page: u32, page_size: u32) -> (u32, u32) {
        let page = page.max(1);
        let size = match page_size {
            0 => self.default_page_size,
            n => n.min(self.max_page_size),
        };
        (page, size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = ServiceConfig::from_toml_str("").unwrap();
        assert_eq!(config, ServiceConfig::default());
        assert!(config.default_validity_days.is_none());
    }

    #[test]
    fn partial_document_overrides_only_given_fields() {
        let config = ServiceConfig::from_toml_str(
            r#"
            default_validity_days = 365
            max_page_size = 50
        "#,
        )
        .unwrap();
        assert_eq!(config.default_validity_days, Some(365));
        assert_eq!(config.max_page_size, 50);
        assert_eq!(config.max_identity_attempts, 3);
    }

    #[test]
    fn zero_attempts_is_rejected() {
        let err = ServiceConfig::from_toml_str("max_identity_attempts = 0").unwrap_err();
        assert!(matches!(err, CertError::ConfigError { .. }));
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let err = ServiceConfig::from_toml_str("max_page_size = \"lots\"").unwrap_err();
        match err {
            CertError::ConfigError { reason } => assert!(reason.contains("service config")),
            other => panic!("expected ConfigError, got {:?}", other),
        }
    }

    #[test]
    fn oversized_day_periods_are_rejected() {
        let err = ServiceConfig::from_toml_str("default_validity_days = 100000000").unwrap_err();
        match err {
            CertError::ConfigError { reason } => assert!(reason.contains("default_validity_days")),
            other => panic!("expected ConfigError, got {:?}", other),
        }

        let err = ServiceConfig::from_toml_str("statistics_window_days = 4000000000").unwrap_err();
        match err {
            CertError::ConfigError { reason } => assert!(reason.contains("statistics_window_days")),
            other => panic!("expected ConfigError, got {:?}", other),
        }

        let at_limit = format!(
            "default_validity_days = {MAX_PERIOD_DAYS}\nstatistics_window_days = {MAX_PERIOD_DAYS}"
        );
        assert!(ServiceConfig::from_toml_str(&at_limit).is_ok());
    }

    #[test]
    fn paging_normalizes_requests() {
        let config = ServiceConfig::default();
        assert_eq!(config.paging(0, 0), (1, 20));
        assert_eq!(config.paging(3, 500), (3, 100));
        assert_eq!(config.paging(2, 5), (2, 5));
    }
}
