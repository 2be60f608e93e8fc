//! # certa-contracts
//!
//! Shared data model, request/response types, and errors for the Certa
//! certificate core.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate: only data definitions, small derived predicates, and error
//! types.

pub mod audit;
pub mod capability;
pub mod certificate;
pub mod directory;
pub mod eligibility;
pub mod error;
pub mod request;

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use audit::{AuditAction, AuditLogEntry, AuditQuery};
    use capability::{Capability, CapabilitySet};
    use certificate::{
        Certificate, CertificateContext, CertificateId, CertificateMetadata, CertificateStatus,
        CertificateType, NewCertificate, OwnerId,
    };
    use directory::Role;
    use error::{CertError, UniqueConstraint};

    fn sample(expires_in: Option<Duration>) -> Certificate {
        let issued_at = Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap();
        Certificate::from_new(
            CertificateId(7),
            NewCertificate {
                hash: "ab".repeat(32),
                verification_code: "ABCDE-FGHJK".to_string(),
                certificate_type: CertificateType::Speaker,
                owner_id: OwnerId::new("u1"),
                activity_id: None,
                enrollment_id: None,
                issued_at,
                expires_at: expires_in.map(|d| issued_at + d),
                metadata: CertificateMetadata::default(),
                download_url: "mem://ab.html".to_string(),
            },
        )
    }

    // ── Status state machine ─────────────────────────────────────────────────

    #[test]
    fn only_active_records_transition() {
        use CertificateStatus::*;
        assert!(Active.can_transition_to(Revoked));
        assert!(Active.can_transition_to(Expired));
        assert!(!Revoked.can_transition_to(Active));
        assert!(!Revoked.can_transition_to(Revoked));
        assert!(!Expired.can_transition_to(Active));
        assert!(!Expired.can_transition_to(Revoked));
        assert!(!Active.can_transition_to(Active));
    }

    #[test]
    fn new_certificate_starts_active() {
        let cert = sample(None);
        assert_eq!(cert.status, CertificateStatus::Active);
        assert!(cert.revoked_at.is_none());
        assert!(cert.revocation_reason.is_none());
    }

    #[test]
    fn expiry_is_derived_not_persisted() {
        let cert = sample(Some(Duration::days(1)));
        let before = cert.issued_at + Duration::hours(23);
        let after = cert.issued_at + Duration::days(2);

        assert!(cert.is_valid_at(before));
        assert_eq!(cert.effective_status(after), CertificateStatus::Expired);
        assert!(!cert.is_valid_at(after));
        // Persisted status is untouched.
        assert_eq!(cert.status, CertificateStatus::Active);
    }

    #[test]
    fn certificate_without_expiry_never_expires() {
        let cert = sample(None);
        let far_future = cert.issued_at + Duration::days(365 * 50);
        assert!(cert.is_valid_at(far_future));
    }

    #[test]
    fn revoked_status_wins_over_expiry() {
        let mut cert = sample(Some(Duration::days(1)));
        cert.status = CertificateStatus::Revoked;
        let after = cert.issued_at + Duration::days(2);
        assert_eq!(cert.effective_status(after), CertificateStatus::Revoked);
    }

    // ── Type catalog ─────────────────────────────────────────────────────────

    #[test]
    fn every_type_has_a_profile_requiring_event_name() {
        for t in CertificateType::ALL {
            let profile = t.profile();
            assert!(profile.required_fields.contains(&"event_name"), "{t} must require event_name");
            assert!(!profile.template_id.is_empty());
        }
        assert!(CertificateType::Speaker.profile().required_fields.contains(&"speaker"));
        assert!(CertificateType::Winner.profile().required_fields.contains(&"award"));
    }

    #[test]
    fn certificate_type_parses_case_insensitively() {
        assert_eq!("Speaker".parse::<CertificateType>().unwrap(), CertificateType::Speaker);
        assert_eq!(" winner ".parse::<CertificateType>().unwrap(), CertificateType::Winner);
        assert!("keynote".parse::<CertificateType>().is_err());
    }

    // ── Metadata blob ────────────────────────────────────────────────────────

    #[test]
    fn metadata_blob_omits_absent_fields() {
        let metadata = CertificateMetadata {
            event_name: Some("RustConf Week".to_string()),
            duration_minutes: Some(90),
            ..Default::default()
        };
        let blob = metadata.to_blob().unwrap();
        assert!(blob.contains("event_name"));
        assert!(!blob.contains("instructor"));
        assert_eq!(CertificateMetadata::from_blob(&blob).unwrap(), metadata);
    }

    #[test]
    fn empty_blob_is_empty_metadata() {
        assert_eq!(CertificateMetadata::from_blob("").unwrap(), CertificateMetadata::default());
        assert!(CertificateMetadata::from_blob("{not json").is_err());
    }

    #[test]
    fn reissue_context_drops_verification_code() {
        let context = CertificateContext {
            event_name: Some("Workshop".to_string()),
            speaker: Some("Dr. Lovelace".to_string()),
            verification_code: Some("OLD-CODE".to_string()),
            ..Default::default()
        };
        let metadata = CertificateMetadata::from_context(&context);
        assert_eq!(metadata.instructor.as_deref(), Some("Dr. Lovelace"));

        let seeded = metadata.to_context();
        assert_eq!(seeded.speaker.as_deref(), Some("Dr. Lovelace"));
        assert!(seeded.verification_code.is_none());
    }

    // ── Capabilities ─────────────────────────────────────────────────────────

    #[test]
    fn admin_capability_implies_everything() {
        let admin = CapabilitySet::for_role(Role::Admin);
        assert!(admin.has(Capability::REVOKE));
        assert!(admin.has(Capability::GENERATE_ANY));
        assert!(admin.has(Capability::VIEW_STATISTICS));
    }

    #[test]
    fn participant_can_only_self_serve() {
        let caps = CapabilitySet::for_role(Role::Participant);
        assert!(caps.has(Capability::GENERATE_SELF));
        assert!(!caps.has(Capability::GENERATE_ANY));
        assert!(!caps.has(Capability::REVOKE));
    }

    #[test]
    fn capability_set_duplicate_grant_is_idempotent() {
        let mut caps = CapabilitySet::default();
        caps.grant(Capability::new(Capability::REVOKE));
        caps.grant(Capability::new(Capability::REVOKE));
        assert_eq!(caps.all().count(), 1);
    }

    // ── Audit query ──────────────────────────────────────────────────────────

    #[test]
    fn audit_query_owner_matches_subject_or_actor() {
        let now = Utc::now();
        let u1 = OwnerId::new("u1");
        let staff = OwnerId::new("staff");
        let entry = AuditLogEntry::new(AuditAction::Generation, now)
            .actor(Some(&staff))
            .owner(Some(&u1));

        let by_owner = AuditQuery { owner_id: Some(u1), ..Default::default() };
        let by_actor = AuditQuery { owner_id: Some(staff), ..Default::default() };
        let other = AuditQuery { owner_id: Some(OwnerId::new("u2")), ..Default::default() };

        assert!(by_owner.matches(&entry));
        assert!(by_actor.matches(&entry));
        assert!(!other.matches(&entry));
    }

    #[test]
    fn failed_entry_carries_message() {
        let entry = AuditLogEntry::new(AuditAction::FailedAttempt, Utc::now()).failed("duplicate");
        assert!(!entry.success);
        assert_eq!(entry.error_message.as_deref(), Some("duplicate"));
    }

    // ── Errors ───────────────────────────────────────────────────────────────

    #[test]
    fn business_failures_keep_their_message() {
        let err = CertError::InvalidTransition {
            reason: "certificate 3 is already revoked".to_string(),
        };
        assert!(err.is_business_failure());
        assert!(err.public_message().contains("already revoked"));
    }

    #[test]
    fn internal_failures_are_reduced_to_generic_message() {
        let err = CertError::Storage {
            reason: "connection refused to 10.0.0.5".to_string(),
        };
        assert!(!err.is_business_failure());
        assert_eq!(err.public_message(), CertError::GENERIC_MESSAGE);
        assert!(!err.public_message().contains("10.0.0.5"));
    }

    #[test]
    fn unique_violation_names_the_constraint() {
        let err = CertError::UniqueViolation {
            constraint: UniqueConstraint::ActiveTuple,
        };
        assert!(err.to_string().contains("active_tuple"));
    }
}
