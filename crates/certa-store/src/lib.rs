//! # certa-store
//!
//! Storage backends for certificates and their rendered artifacts.
//!
//! [`InMemoryCertificateRepository`] implements
//! [`CertificateRepository`](certa_core::traits::CertificateRepository) with
//! the uniqueness guarantees the orchestrator relies on: unique hash, unique
//! verification code, and at most one effectively active certificate per
//! (owner, type, activity).

pub mod artifact;
pub mod repository;
pub mod row;

pub use artifact::{DirectoryArtifactStorage, InMemoryArtifactStorage};
pub use repository::InMemoryCertificateRepository;
pub use row::CertificateRow;

#[cfg(test)]
mod tests {
    use std::sync::Barrier;

    use chrono::{DateTime, Duration, TimeZone, Utc};

    use certa_contracts::{
        certificate::{
            ActivityId, Certificate, CertificateId, CertificateMetadata, CertificateStatus,
            CertificateType, NewCertificate, OwnerId,
        },
        error::{CertError, UniqueConstraint},
    };
    use certa_core::traits::{ArtifactStorage, CertificateRepository};

    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0).unwrap()
    }

    fn new_cert(n: u32, owner: &str, certificate_type: CertificateType) -> NewCertificate {
        NewCertificate {
            hash: format!("hash{n:04}"),
            verification_code: format!("CODE{n:04}"),
            certificate_type,
            owner_id: OwnerId::new(owner),
            activity_id: Some(ActivityId::new("A1")),
            enrollment_id: None,
            issued_at: t0() + Duration::minutes(i64::from(n)),
            expires_at: None,
            metadata: CertificateMetadata {
                event_name: Some("Workshop".to_string()),
                ..CertificateMetadata::default()
            },
            download_url: format!("memory://certificates/hash{n:04}.html"),
        }
    }

    // ── Row mapping ──────────────────────────────────────────────────────────

    #[test]
    fn row_mapping_preserves_every_field() {
        let mut cert =
            Certificate::from_new(CertificateId(7), new_cert(1, "u1", CertificateType::Winner));
        cert.status = CertificateStatus::Revoked;
        cert.revocation_reason = Some("typo".to_string());
        cert.revoked_at = Some(t0());

        let row = CertificateRow::try_from(&cert).unwrap();
        assert_eq!(row.status, "revoked");
        assert_eq!(row.certificate_type, "winner");
        assert!(row.metadata.contains("Workshop"));

        let back = Certificate::try_from(&row).unwrap();
        assert_eq!(back, cert);
    }

    #[test]
    fn corrupt_rows_are_storage_errors() {
        let cert =
            Certificate::from_new(CertificateId(1), new_cert(1, "u1", CertificateType::Speaker));
        let mut row = CertificateRow::try_from(&cert).unwrap();
        row.status = "archived".to_string();
        assert!(matches!(Certificate::try_from(&row), Err(CertError::Storage { .. })));

        let mut row = CertificateRow::try_from(&cert).unwrap();
        row.metadata = "{not json".to_string();
        assert!(matches!(Certificate::try_from(&row), Err(CertError::Storage { .. })));

        let mut row = CertificateRow::try_from(&cert).unwrap();
        row.certificate_type = "bravery".to_string();
        assert!(matches!(Certificate::try_from(&row), Err(CertError::Storage { .. })));
    }

    // ── Uniqueness ───────────────────────────────────────────────────────────

    #[test]
    fn create_assigns_sequential_ids_and_indexes() {
        let repo = InMemoryCertificateRepository::new();
        let a = repo.create(new_cert(1, "u1", CertificateType::Attendance)).unwrap();
        let b = repo.create(new_cert(2, "u2", CertificateType::Attendance)).unwrap();

        assert_eq!(a.id, CertificateId(1));
        assert_eq!(b.id, CertificateId(2));
        assert_eq!(a.status, CertificateStatus::Active);
        assert_eq!(repo.get_by_hash("hash0002").unwrap().map(|c| c.id), Some(b.id));
        assert_eq!(repo.get_by_verification_code("CODE0001").unwrap().map(|c| c.id), Some(a.id));
        assert!(repo.get_by_hash("nope").unwrap().is_none());
        assert!(repo.get_by_id(CertificateId(u64::MAX)).unwrap().is_none());
    }

    #[test]
    fn hash_and_code_collisions_are_reported_by_constraint() {
        let repo = InMemoryCertificateRepository::new();
        repo.create(new_cert(1, "u1", CertificateType::Attendance)).unwrap();

        let mut same_hash = new_cert(2, "u2", CertificateType::Attendance);
        same_hash.hash = "hash0001".to_string();
        assert!(matches!(
            repo.create(same_hash),
            Err(CertError::UniqueViolation { constraint: UniqueConstraint::Hash })
        ));

        let mut same_code = new_cert(3, "u3", CertificateType::Attendance);
        same_code.verification_code = "CODE0001".to_string();
        assert!(matches!(
            repo.create(same_code),
            Err(CertError::UniqueViolation { constraint: UniqueConstraint::VerificationCode })
        ));
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn active_tuple_is_exclusive_until_revoked_or_expired() {
        let repo = InMemoryCertificateRepository::new();
        let mut first = new_cert(1, "u1", CertificateType::Speaker);
        first.expires_at = Some(t0() + Duration::days(1));
        let first = repo.create(first).unwrap();

        assert!(matches!(
            repo.create(new_cert(2, "u1", CertificateType::Speaker)),
            Err(CertError::UniqueViolation { constraint: UniqueConstraint::ActiveTuple })
        ));

        // Same owner and type, different activity: a separate slot.
        let mut other_activity = new_cert(3, "u1", CertificateType::Speaker);
        other_activity.activity_id = None;
        repo.create(other_activity).unwrap();

        // Once the first has expired by date, the slot is free again.
        let mut later = new_cert(4, "u1", CertificateType::Speaker);
        later.issued_at = t0() + Duration::days(2);
        let later = repo.create(later).unwrap();
        assert_ne!(later.id, first.id);

        // Revocation frees it too.
        let revoked_at = t0() + Duration::days(2);
        repo.update_status(later.id, CertificateStatus::Revoked, Some("wrong"), revoked_at)
            .unwrap();
        let mut again = new_cert(5, "u1", CertificateType::Speaker);
        again.issued_at = t0() + Duration::days(3);
        repo.create(again).unwrap();
    }

    #[test]
    fn concurrent_creates_for_one_tuple_admit_one() {
        let repo = InMemoryCertificateRepository::new();
        let threads = 16;
        let barrier = Barrier::new(threads);

        let results: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..threads as u32)
                .map(|n| {
                    let repo = &repo;
                    let barrier = &barrier;
                    s.spawn(move || {
                        let mut cert = new_cert(n, "u1", CertificateType::Attendance);
                        cert.issued_at = t0();
                        barrier.wait();
                        repo.create(cert)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(repo.len(), 1);
    }

    // ── Status transitions ───────────────────────────────────────────────────

    #[test]
    fn update_status_is_compare_and_set() {
        let repo = InMemoryCertificateRepository::new();
        let cert = repo.create(new_cert(1, "u1", CertificateType::Attendance)).unwrap();
        let at = t0() + Duration::hours(1);

        assert!(repo
            .update_status(cert.id, CertificateStatus::Revoked, Some("fraud"), at)
            .unwrap());
        let stored = repo.get_by_id(cert.id).unwrap().unwrap();
        assert_eq!(stored.status, CertificateStatus::Revoked);
        assert_eq!(stored.revocation_reason.as_deref(), Some("fraud"));
        assert_eq!(stored.revoked_at, Some(at));

        assert!(matches!(
            repo.update_status(cert.id, CertificateStatus::Revoked, Some("again"), at),
            Err(CertError::InvalidTransition { .. })
        ));
        assert!(matches!(
            repo.update_status(cert.id, CertificateStatus::Active, None, at),
            Err(CertError::InvalidTransition { .. })
        ));
        assert!(!repo
            .update_status(CertificateId(404), CertificateStatus::Revoked, None, at)
            .unwrap());
    }

    // ── Listing and counts ───────────────────────────────────────────────────

    #[test]
    fn list_by_owner_pages_newest_first() {
        let repo = InMemoryCertificateRepository::new();
        for (n, t) in CertificateType::ALL.into_iter().enumerate() {
            repo.create(new_cert(n as u32, "u1", t)).unwrap();
        }
        repo.create(new_cert(10, "u2", CertificateType::Attendance)).unwrap();
        repo.update_status(CertificateId(1), CertificateStatus::Revoked, None, t0()).unwrap();

        let owner = OwnerId::new("u1");
        assert_eq!(repo.count_by_owner(&owner, true).unwrap(), 5);
        assert_eq!(repo.count_by_owner(&owner, false).unwrap(), 4);

        let page1 = repo.list_by_owner(&owner, true, 1, 2).unwrap();
        let ids: Vec<u64> = page1.iter().map(|c| c.id.0).collect();
        assert_eq!(ids, vec![5, 4]);
        let page3 = repo.list_by_owner(&owner, true, 3, 2).unwrap();
        assert_eq!(page3.iter().map(|c| c.id.0).collect::<Vec<_>>(), vec![1]);
        assert!(repo.list_by_owner(&owner, true, 4, 2).unwrap().is_empty());

        let visible = repo.list_by_owner(&owner, false, 1, 10).unwrap();
        assert!(visible.iter().all(|c| c.status != CertificateStatus::Revoked));
    }

    #[test]
    fn counts_use_effective_status() {
        let repo = InMemoryCertificateRepository::new();
        let mut expiring = new_cert(1, "u1", CertificateType::Attendance);
        expiring.expires_at = Some(t0() + Duration::days(1));
        repo.create(expiring).unwrap();
        repo.create(new_cert(2, "u2", CertificateType::Winner)).unwrap();
        repo.create(new_cert(3, "u2", CertificateType::Speaker)).unwrap();
        repo.update_status(CertificateId(3), CertificateStatus::Revoked, None, t0()).unwrap();

        let counts = repo.counts(t0() + Duration::days(2), t0()).unwrap();
        assert_eq!(counts.total, 3);
        assert_eq!(counts.by_status.get(&CertificateStatus::Expired), Some(&1));
        assert_eq!(counts.by_status.get(&CertificateStatus::Active), Some(&1));
        assert_eq!(counts.by_status.get(&CertificateStatus::Revoked), Some(&1));
        assert_eq!(counts.by_type.get(&CertificateType::Winner), Some(&1));
        assert_eq!(counts.issued_since, 3);
        assert_eq!(counts.distinct_owners, 2);
    }

    // ── Artifacts ────────────────────────────────────────────────────────────

    #[test]
    fn memory_storage_round_trips_and_discards() {
        let storage = InMemoryArtifactStorage::new();
        let reference = storage.store("abc.html", b"<html/>").unwrap();
        assert_eq!(reference, "memory://certificates/abc.html");
        assert_eq!(storage.get(&reference).as_deref(), Some(&b"<html/>"[..]));

        storage.discard(&reference).unwrap();
        assert!(storage.is_empty());
        assert!(storage.store("../escape", b"x").is_err());
    }

    #[test]
    fn directory_storage_writes_and_removes_files() {
        let dir = tempfile::tempdir().unwrap();
        let storage =
            DirectoryArtifactStorage::new(dir.path().join("certs"), "https://certs.example.org/files/")
                .unwrap();

        let reference = storage.store("abc.html", b"<html/>").unwrap();
        assert_eq!(reference, "https://certs.example.org/files/abc.html");
        let path = storage.path_for(&reference).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"<html/>");

        storage.discard(&reference).unwrap();
        assert!(!path.exists());
        // Discarding twice, or a foreign reference, is harmless.
        storage.discard(&reference).unwrap();
        storage.discard("https://elsewhere/abc.html").unwrap();

        assert!(matches!(storage.store("a/b.html", b"x"), Err(CertError::Storage { .. })));
    }
}
