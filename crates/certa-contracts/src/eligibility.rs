//! Eligibility decision types.
//!
//! Ineligibility is an expected business outcome, so validators return an
//! `EligibilityResult` with `is_eligible = false` instead of an error.

use serde::{Deserialize, Serialize};

use crate::directory::Role;

/// The decision for one (owner, type, activity) request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityResult {
    pub is_eligible: bool,
    /// Human-readable explanation. Names the first failed check when not eligible.
    pub message: String,
    pub details: EligibilityDetails,
}

impl EligibilityResult {
    pub fn eligible(details: EligibilityDetails) -> Self {
        Self {
            is_eligible: true,
            message: "eligible".to_string(),
            details,
        }
    }

    pub fn ineligible(message: impl Into<String>, details: EligibilityDetails) -> Self {
        Self {
            is_eligible: false,
            message: message.into(),
            details,
        }
    }
}

/// What the validator observed while deciding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EligibilityDetails {
    /// Identifier of the requirement rule applied, if any matched.
    pub rule_id: Option<String>,
    pub owner_role: Option<Role>,
    pub enrollment_found: Option<bool>,
    pub attendance_percent: Option<f64>,
    pub required_attendance_percent: Option<f64>,
    pub participation_minutes: Option<u32>,
    pub required_participation_minutes: Option<u32>,
    /// Every failed check, in evaluation order. Empty when eligible.
    pub failed_checks: Vec<String>,
}
