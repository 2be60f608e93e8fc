//! # certa-eligibility
//!
//! A TOML-driven, deny-by-default eligibility validator for certificates.
//!
//! ## Overview
//!
//! This crate provides [`RuleEligibilityValidator`], which implements the
//! [`EligibilityValidator`](certa_core::traits::EligibilityValidator) trait.
//! Requirements are declared per certificate type in a TOML file. A type with
//! no rule is never eligible.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use certa_eligibility::{RequirementConfig, RuleEligibilityValidator};
//!
//! let config = RequirementConfig::from_file(Path::new("rules/event.toml"))?;
//! let validator = RuleEligibilityValidator::new(config, sources);
//! ```

pub mod engine;
pub mod rule;

pub use engine::{EligibilitySources, RuleEligibilityValidator};
pub use rule::{RequirementConfig, TypeRequirement};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};

    use certa_contracts::{
        certificate::{
            ActivityId, CertificateMetadata, CertificateType, EnrollmentId, NewCertificate,
            OwnerId,
        },
        directory::{ActivityInfo, EnrollmentRecord, OwnerData, Role},
        error::{CertError, CertResult},
    };
    use certa_core::{
        clock::FixedClock,
        traits::{
            ActivityDirectory, CertificateRepository, EligibilityValidator, OwnerDirectory,
            ParticipationRecords,
        },
    };
    use certa_store::InMemoryCertificateRepository;

    use crate::{EligibilitySources, RequirementConfig, RuleEligibilityValidator};

    // ── Helpers ───────────────────────────────────────────────────────────────

    #[derive(Default)]
    struct Directory {
        owners: HashMap<OwnerId, OwnerData>,
        activities: HashMap<ActivityId, ActivityInfo>,
        enrollments: Vec<EnrollmentRecord>,
        offline: bool,
    }

    impl OwnerDirectory for Directory {
        fn owner(&self, owner_id: &OwnerId) -> CertResult<Option<OwnerData>> {
            if self.offline {
                return Err(CertError::Storage {
                    reason: "directory offline".to_string(),
                });
            }
            Ok(self.owners.get(owner_id).cloned())
        }
    }

    impl ActivityDirectory for Directory {
        fn activity(&self, activity_id: &ActivityId) -> CertResult<Option<ActivityInfo>> {
            if self.offline {
                return Err(CertError::Storage {
                    reason: "directory offline".to_string(),
                });
            }
            Ok(self.activities.get(activity_id).cloned())
        }
    }

    impl ParticipationRecords for Directory {
        fn enrollment(
            &self,
            owner_id: &OwnerId,
            activity_id: &ActivityId,
        ) -> CertResult<Option<EnrollmentRecord>> {
            Ok(self
                .enrollments
                .iter()
                .find(|e| &e.owner_id == owner_id && &e.activity_id == activity_id)
                .cloned())
        }
    }

    fn u(id: &str) -> OwnerId {
        OwnerId::new(id)
    }

    fn a(id: &str) -> ActivityId {
        ActivityId::new(id)
    }

    fn directory() -> Directory {
        let owner = |id: &str, role: Role| OwnerData {
            owner_id: u(id),
            full_name: id.to_uppercase(),
            email: format!("{id}@example.org"),
            role,
            title: None,
        };
        let enrollment = |id: &str, owner: &str, pct: f64, minutes: u32| EnrollmentRecord {
            enrollment_id: EnrollmentId::new(id),
            owner_id: u(owner),
            activity_id: a("talk"),
            attendance_percent: pct,
            participation_minutes: minutes,
        };
        Directory {
            owners: [
                owner("ann", Role::Participant),
                owner("ben", Role::Participant),
                owner("sam", Role::Speaker),
                owner("ola", Role::Organizer),
            ]
            .into_iter()
            .map(|o| (o.owner_id.clone(), o))
            .collect(),
            activities: HashMap::from([(
                a("talk"),
                ActivityInfo {
                    activity_id: a("talk"),
                    name: "Keynote".to_string(),
                    starts_at: None,
                    duration_minutes: Some(60),
                    speakers: vec![u("sam")],
                    organizers: vec![u("ola"), u("ann")],
                    winners: vec![],
                },
            )]),
            enrollments: vec![
                enrollment("e-ann", "ann", 90.0, 55),
                enrollment("e-ben", "ben", 40.0, 10),
            ],
            offline: false,
        }
    }

    fn validator_with(
        toml: &str,
        directory: Directory,
    ) -> (RuleEligibilityValidator, Arc<InMemoryCertificateRepository>) {
        let directory = Arc::new(directory);
        let repository = Arc::new(InMemoryCertificateRepository::new());
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2026, 5, 4, 12, 0, 0).unwrap(),
        ));
        let config = RequirementConfig::from_toml_str(toml).unwrap();
        let validator = RuleEligibilityValidator::new(
            config,
            EligibilitySources {
                owners: directory.clone(),
                activities: directory.clone(),
                participation: directory,
                repository: repository.clone(),
                clock,
            },
        );
        (validator, repository)
    }

    fn validator(toml: &str) -> RuleEligibilityValidator {
        validator_with(toml, directory()).0
    }

    const ATTENDANCE: &str = r#"
        [[rules]]
        id = "attendance-75"
        certificate_type = "attendance"
        requires_enrollment = true
        min_attendance_percent = 75.0
        min_participation_minutes = 30
    "#;

    // ── 1. deny-by-default ────────────────────────────────────────────────────

    /// When no rule exists for the type, nobody is eligible.
    #[test]
    fn test_deny_by_default() {
        let v = validator("rules = []");
        let result = v
            .validate_eligibility(&u("ann"), CertificateType::Attendance, Some(&a("talk")), None)
            .unwrap();

        assert!(!result.is_eligible);
        assert!(
            result.message.contains("denied by default"),
            "unexpected message: {}",
            result.message
        );
    }

    // ── 2. thresholds ─────────────────────────────────────────────────────────

    #[test]
    fn test_attendance_threshold_met() {
        let v = validator(ATTENDANCE);
        let result = v
            .validate_eligibility(&u("ann"), CertificateType::Attendance, Some(&a("talk")), None)
            .unwrap();

        assert!(result.is_eligible, "unexpected: {}", result.message);
        assert_eq!(result.details.rule_id.as_deref(), Some("attendance-75"));
        assert_eq!(result.details.attendance_percent, Some(90.0));
        assert_eq!(result.details.enrollment_found, Some(true));
        assert!(result.details.failed_checks.is_empty());
    }

    /// Every failing check is reported; the message names the first.
    #[test]
    fn test_all_failures_collected() {
        let v = validator(ATTENDANCE);
        let result = v
            .validate_eligibility(&u("ben"), CertificateType::Attendance, Some(&a("talk")), None)
            .unwrap();

        assert!(!result.is_eligible);
        assert_eq!(result.details.failed_checks.len(), 2);
        assert!(result.message.contains("attendance 40.0%"));
        assert!(result.details.failed_checks[1].contains("10 minutes"));
    }

    #[test]
    fn test_missing_enrollment() {
        let v = validator(ATTENDANCE);
        let result = v
            .validate_eligibility(&u("sam"), CertificateType::Attendance, Some(&a("talk")), None)
            .unwrap();

        assert!(!result.is_eligible);
        assert_eq!(result.details.enrollment_found, Some(false));
        assert!(result.message.contains("not enrolled"));
    }

    #[test]
    fn test_enrollment_id_must_match() {
        let v = validator(ATTENDANCE);
        let result = v
            .validate_eligibility(
                &u("ann"),
                CertificateType::Attendance,
                Some(&a("talk")),
                Some(&EnrollmentId::new("e-ben")),
            )
            .unwrap();

        assert!(!result.is_eligible);
        assert!(result.message.contains("e-ben"));
    }

    #[test]
    fn test_activity_required_for_enrollment_rules() {
        let v = validator(ATTENDANCE);
        let result = v
            .validate_eligibility(&u("ann"), CertificateType::Attendance, None, None)
            .unwrap();

        assert!(!result.is_eligible);
        assert!(result.message.contains("require an activity"));
    }

    // ── 3. roles ──────────────────────────────────────────────────────────────

    const ORGANIZER: &str = r#"
        [[rules]]
        certificate_type = "organizer"
        requires_activity = true
        activity_role = "organizer"
        required_roles = ["organizer", "staff"]
    "#;

    #[test]
    fn test_activity_and_system_role_both_required() {
        let v = validator(ORGANIZER);

        let ola = v
            .validate_eligibility(&u("ola"), CertificateType::Organizer, Some(&a("talk")), None)
            .unwrap();
        assert!(ola.is_eligible, "unexpected: {}", ola.message);
        assert_eq!(ola.details.rule_id.as_deref(), Some("organizer"));

        // Listed on the activity, but a participant by role.
        let ann = v
            .validate_eligibility(&u("ann"), CertificateType::Organizer, Some(&a("talk")), None)
            .unwrap();
        assert!(!ann.is_eligible);
        assert_eq!(ann.details.owner_role, Some(Role::Participant));
        assert!(ann.message.contains("role 'participant'"));

        // Neither listed nor in role.
        let ben = v
            .validate_eligibility(&u("ben"), CertificateType::Organizer, Some(&a("talk")), None)
            .unwrap();
        assert_eq!(ben.details.failed_checks.len(), 2);
        assert!(ben.message.contains("not listed as organizer"));
    }

    #[test]
    fn test_unknown_activity_fails_the_check() {
        let v = validator(ORGANIZER);
        let result = v
            .validate_eligibility(&u("ola"), CertificateType::Organizer, Some(&a("nope")), None)
            .unwrap();
        assert!(!result.is_eligible);
        assert!(result.message.contains("does not exist"));
    }

    // ── 4. builtin rules ──────────────────────────────────────────────────────

    #[test]
    fn test_builtin_rules_cover_every_type() {
        let config = RequirementConfig::builtin().unwrap();
        for t in CertificateType::ALL {
            assert!(config.rule_for(t).is_some(), "no builtin rule for {t}");
        }
    }

    #[test]
    fn test_builtin_speaker_rule() {
        let directory = Arc::new(directory());
        let repository = Arc::new(InMemoryCertificateRepository::new());
        let builtin = RuleEligibilityValidator::new(
            RequirementConfig::builtin().unwrap(),
            EligibilitySources {
                owners: directory.clone(),
                activities: directory.clone(),
                participation: directory,
                repository,
                clock: Arc::new(FixedClock::new(Utc::now())),
            },
        );
        let sam = builtin
            .validate_eligibility(&u("sam"), CertificateType::Speaker, Some(&a("talk")), None)
            .unwrap();
        assert!(sam.is_eligible);
        let ann = builtin
            .validate_eligibility(&u("ann"), CertificateType::Speaker, Some(&a("talk")), None)
            .unwrap();
        assert!(!ann.is_eligible);
    }

    // ── 5. configuration errors ───────────────────────────────────────────────

    #[test]
    fn test_out_of_range_attendance_rejected() {
        let err = RequirementConfig::from_toml_str(
            r#"
            [[rules]]
            certificate_type = "attendance"
            min_attendance_percent = 120.0
        "#,
        )
        .unwrap_err();
        assert!(matches!(err, CertError::ConfigError { .. }));
    }

    #[test]
    fn test_unknown_certificate_type_rejected() {
        let err = RequirementConfig::from_toml_str(
            r#"
            [[rules]]
            certificate_type = "bravery"
        "#,
        )
        .unwrap_err();
        match err {
            CertError::ConfigError { reason } => assert!(reason.contains("requirement TOML")),
            other => panic!("expected ConfigError, got {:?}", other),
        }
    }

    #[test]
    fn test_first_rule_for_a_type_wins() {
        let config = RequirementConfig::from_toml_str(
            r#"
            [[rules]]
            id = "first"
            certificate_type = "winner"

            [[rules]]
            id = "second"
            certificate_type = "winner"
            requires_activity = true
        "#,
        )
        .unwrap();
        assert_eq!(
            config.rule_for(CertificateType::Winner).and_then(|r| r.id.as_deref()),
            Some("first")
        );
    }

    // ── 6. collaborator faults and duplicates ─────────────────────────────────

    /// A directory outage is an error, never a silent "not eligible".
    #[test]
    fn test_collaborator_fault_propagates() {
        let mut dir = directory();
        dir.offline = true;
        let (v, _) = validator_with(ORGANIZER, dir);
        let err = v
            .validate_eligibility(&u("ola"), CertificateType::Organizer, Some(&a("talk")), None)
            .unwrap_err();
        assert!(matches!(err, CertError::Storage { .. }));
    }

    #[test]
    fn test_has_existing_certificate_sees_active_records() {
        let (v, repository) = validator_with(ATTENDANCE, directory());
        assert!(!v
            .has_existing_certificate(&u("ann"), CertificateType::Attendance, Some(&a("talk")))
            .unwrap());

        repository
            .create(NewCertificate {
                hash: "h1".to_string(),
                verification_code: "C1".to_string(),
                certificate_type: CertificateType::Attendance,
                owner_id: u("ann"),
                activity_id: Some(a("talk")),
                enrollment_id: None,
                issued_at: Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap(),
                expires_at: None,
                metadata: CertificateMetadata::default(),
                download_url: "mem://h1".to_string(),
            })
            .unwrap();

        assert!(v
            .has_existing_certificate(&u("ann"), CertificateType::Attendance, Some(&a("talk")))
            .unwrap());
        // Different activity slot is free.
        assert!(!v
            .has_existing_certificate(&u("ann"), CertificateType::Attendance, None)
            .unwrap());
    }
}
