//! Rule-driven eligibility validator.
//!
//! `RuleEligibilityValidator` applies a `RequirementConfig` and implements
//! the `EligibilityValidator` trait from certa-core.
//!
//! Evaluation algorithm:
//!
//! 1. Find the rule for the requested certificate type. No rule → not
//!    eligible, "denied by default".
//! 2. Run every check the rule enables, in a fixed order: activity, activity
//!    role, owner role, enrollment, attendance, participation time.
//! 3. Collect each failing check into `details.failed_checks`. The result is
//!    eligible only if that list is empty; the message names the first failure.
//!
//! Collaborator errors propagate. They are faults, not ineligibility.

use std::sync::Arc;

use tracing::{debug, warn};

use certa_contracts::{
    certificate::{ActivityId, CertificateType, EnrollmentId, OwnerId},
    directory::ActivityRole,
    eligibility::{EligibilityDetails, EligibilityResult},
    error::CertResult,
};
use certa_core::traits::{
    ActivityDirectory, CertificateRepository, Clock, EligibilityValidator, OwnerDirectory,
    ParticipationRecords,
};

use crate::rule::{RequirementConfig, TypeRequirement};

/// The collaborators the validator reads from.
pub struct EligibilitySources {
    pub owners: Arc<dyn OwnerDirectory>,
    pub activities: Arc<dyn ActivityDirectory>,
    pub participation: Arc<dyn ParticipationRecords>,
    pub repository: Arc<dyn CertificateRepository>,
    pub clock: Arc<dyn Clock>,
}

/// An `EligibilityValidator` driven by a TOML requirement document.
///
/// ```rust,ignore
/// use certa_eligibility::{RequirementConfig, RuleEligibilityValidator};
///
/// let config = RequirementConfig::from_file(Path::new("rules/event.toml"))?;
/// let validator = RuleEligibilityValidator::new(config, sources);
/// ```
pub struct RuleEligibilityValidator {
    config: RequirementConfig,
    sources: EligibilitySources,
}

impl RuleEligibilityValidator {
    pub fn new(config: RequirementConfig, sources: EligibilitySources) -> Self {
        Self { config, sources }
    }

    pub fn config(&self) -> &RequirementConfig {
        &self.config
    }

    fn evaluate(
        &self,
        rule: &TypeRequirement,
        owner_id: &OwnerId,
        activity_id: Option<&ActivityId>,
        enrollment_id: Option<&EnrollmentId>,
        details: &mut EligibilityDetails,
    ) -> CertResult<()> {
        let fail = |details: &mut EligibilityDetails, check: String| {
            details.failed_checks.push(check);
        };

        // ── Activity ─────────────────────────────────────────────────────────
        let activity = match activity_id {
            Some(id) if rule.requires_activity || rule.activity_role.is_some() => {
                let found = self.sources.activities.activity(id)?;
                if found.is_none() {
                    fail(details, format!("activity '{}' does not exist", id));
                }
                found
            }
            Some(_) => None,
            None => {
                if rule.needs_activity() {
                    fail(
                        details,
                        format!("{} certificates require an activity", rule.certificate_type),
                    );
                }
                None
            }
        };

        if let (Some(role), Some(activity)) = (rule.activity_role, activity.as_ref()) {
            if !activity.has_role(owner_id, role) {
                fail(
                    details,
                    format!(
                        "owner is not listed as {} of activity '{}'",
                        activity_role_name(role),
                        activity.activity_id
                    ),
                );
            }
        }

        // ── Owner role ───────────────────────────────────────────────────────
        if !rule.required_roles.is_empty() {
            match self.sources.owners.owner(owner_id)? {
                Some(owner) => {
                    details.owner_role = Some(owner.role);
                    if !rule.required_roles.contains(&owner.role) {
                        let wanted: Vec<&str> =
                            rule.required_roles.iter().map(|r| r.as_str()).collect();
                        fail(
                            details,
                            format!(
                                "role '{}' is not one of [{}]",
                                owner.role,
                                wanted.join(", ")
                            ),
                        );
                    }
                }
                None => fail(details, format!("owner '{}' is not registered", owner_id)),
            }
        }

        // ── Enrollment and participation ─────────────────────────────────────
        if rule.needs_enrollment() {
            if let Some(activity_id) = activity_id {
                let enrollment = self.sources.participation.enrollment(owner_id, activity_id)?;
                details.enrollment_found = Some(enrollment.is_some());
                details.required_attendance_percent = rule.min_attendance_percent;
                details.required_participation_minutes = rule.min_participation_minutes;

                match enrollment {
                    None => fail(
                        details,
                        format!("owner is not enrolled in activity '{}'", activity_id),
                    ),
                    Some(record) => {
                        details.attendance_percent = Some(record.attendance_percent);
                        details.participation_minutes = Some(record.participation_minutes);

                        if let Some(expected) = enrollment_id {
                            if &record.enrollment_id != expected {
                                fail(
                                    details,
                                    format!(
                                        "enrollment '{}' does not belong to this owner and activity",
                                        expected
                                    ),
                                );
                            }
                        }
                        if let Some(min) = rule.min_attendance_percent {
                            if record.attendance_percent < min {
                                fail(
                                    details,
                                    format!(
                                        "attendance {:.1}% is below the required {:.1}%",
                                        record.attendance_percent, min
                                    ),
                                );
                            }
                        }
                        if let Some(min) = rule.min_participation_minutes {
                            if record.participation_minutes < min {
                                fail(
                                    details,
                                    format!(
                                        "participation of {} minutes is below the required {}",
                                        record.participation_minutes, min
                                    ),
                                );
                            }
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

impl EligibilityValidator for RuleEligibilityValidator {
    fn validate_eligibility(
        &self,
        owner_id: &OwnerId,
        certificate_type: CertificateType,
        activity_id: Option<&ActivityId>,
        enrollment_id: Option<&EnrollmentId>,
    ) -> CertResult<EligibilityResult> {
        debug!(
            owner_id = %owner_id,
            certificate_type = %certificate_type,
            activity_id = ?activity_id,
            "evaluating eligibility"
        );

        let Some(rule) = self.config.rule_for(certificate_type) else {
            warn!(
                certificate_type = %certificate_type,
                "no requirement rule for certificate type; denying by default"
            );
            let reason = format!(
                "denied by default: no requirement rule for certificate type '{}'",
                certificate_type
            );
            let details = EligibilityDetails {
                failed_checks: vec![reason.clone()],
                ..EligibilityDetails::default()
            };
            return Ok(EligibilityResult::ineligible(reason, details));
        };

        let mut details = EligibilityDetails {
            rule_id: Some(rule.rule_id()),
            ..EligibilityDetails::default()
        };
        self.evaluate(rule, owner_id, activity_id, enrollment_id, &mut details)?;

        match details.failed_checks.first().cloned() {
            None => {
                debug!(rule_id = %rule.rule_id(), "owner is eligible");
                Ok(EligibilityResult::eligible(details))
            }
            Some(first) => {
                debug!(
                    rule_id = %rule.rule_id(),
                    failed = details.failed_checks.len(),
                    "owner is not eligible"
                );
                Ok(EligibilityResult::ineligible(first, details))
            }
        }
    }

    fn has_existing_certificate(
        &self,
        owner_id: &OwnerId,
        certificate_type: CertificateType,
        activity_id: Option<&ActivityId>,
    ) -> CertResult<bool> {
        let now = self.sources.clock.now();
        Ok(self
            .sources
            .repository
            .find_active(owner_id, certificate_type, activity_id, now)?
            .is_some())
    }
}

fn activity_role_name(role: ActivityRole) -> &'static str {
    match role {
        ActivityRole::Speaker => "speaker",
        ActivityRole::Organizer => "organizer",
        ActivityRole::Winner => "winner",
    }
}
