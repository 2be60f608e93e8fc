//! Requirement rule types and configuration schema.
//!
//! A `RequirementConfig` is deserialized from TOML and holds one
//! `TypeRequirement` per certificate type. A type without a rule is never
//! eligible: the validator denies by default.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use certa_contracts::{
    certificate::CertificateType,
    directory::{ActivityRole, Role},
    error::{CertError, CertResult},
};

/// Requirements an owner must meet to receive one certificate type.
///
/// Every check is optional; a rule with only `certificate_type` set makes
/// the type unconditionally available.
///
/// Example in TOML:
/// ```toml
/// [[rules]]
/// id = "attendance-75"
/// certificate_type = "attendance"
/// requires_enrollment = true
/// min_attendance_percent = 75.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeRequirement {
    /// Stable identifier reported in eligibility details. Defaults to the type name.
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub description: String,

    pub certificate_type: CertificateType,

    /// An activity id must be supplied and must exist.
    #[serde(default)]
    pub requires_activity: bool,

    /// The owner must be enrolled in the activity.
    #[serde(default)]
    pub requires_enrollment: bool,

    /// Minimum recorded attendance, 0.0 to 100.0.
    #[serde(default)]
    pub min_attendance_percent: Option<f64>,

    #[serde(default)]
    pub min_participation_minutes: Option<u32>,

    /// The owner must hold at least one of these system roles.
    #[serde(default)]
    pub required_roles: Vec<Role>,

    /// The owner must be listed on the activity in this capacity.
    #[serde(default)]
    pub activity_role: Option<ActivityRole>,
}

impl TypeRequirement {
    pub fn rule_id(&self) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| self.certificate_type.as_str().to_string())
    }

    /// Whether evaluating this rule needs an enrollment record.
    pub fn needs_enrollment(&self) -> bool {
        self.requires_enrollment
            || self.min_attendance_percent.is_some()
            || self.min_participation_minutes.is_some()
    }

    /// Whether evaluating this rule needs an activity id.
    pub fn needs_activity(&self) -> bool {
        self.requires_activity || self.activity_role.is_some() || self.needs_enrollment()
    }
}

/// The top-level structure deserialized from a TOML requirements file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequirementConfig {
    #[serde(default)]
    pub rules: Vec<TypeRequirement>,
}

/// The rule set shipped with the crate.
const BUILTIN_RULES: &str = include_str!("../rules/default.toml");

impl RequirementConfig {
    /// Parse `s` as TOML and validate the result.
    ///
    /// Returns `CertError::ConfigError` if the TOML is malformed, does not
    /// match the schema, or carries an out-of-range threshold.
    pub fn from_toml_str(s: &str) -> CertResult<Self> {
        let config: RequirementConfig = toml::from_str(s).map_err(|e| CertError::ConfigError {
            reason: format!("failed to parse requirement TOML: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> CertResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| CertError::ConfigError {
            reason: format!("failed to read requirement file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// The default rules: enrollment-backed attendance and participation,
    /// activity-role-backed speaker, organizer, and winner.
    pub fn builtin() -> CertResult<Self> {
        Self::from_toml_str(BUILTIN_RULES)
    }

    pub fn validate(&self) -> CertResult<()> {
        let mut seen = HashSet::new();
        for rule in &self.rules {
            if let Some(pct) = rule.min_attendance_percent {
                if !(0.0..=100.0).contains(&pct) {
                    return Err(CertError::ConfigError {
                        reason: format!(
                            "rule '{}': min_attendance_percent {} is outside 0..=100",
                            rule.rule_id(),
                            pct
                        ),
                    });
                }
            }
            if !seen.insert(rule.certificate_type) {
                warn!(
                    rule_id = %rule.rule_id(),
                    certificate_type = %rule.certificate_type,
                    "duplicate requirement rule ignored; the first rule for a type wins"
                );
            }
        }
        Ok(())
    }

    /// The rule governing `certificate_type`, if any. First match wins.
    pub fn rule_for(&self, certificate_type: CertificateType) -> Option<&TypeRequirement> {
        self.rules
            .iter()
            .find(|r| r.certificate_type == certificate_type)
    }
}
