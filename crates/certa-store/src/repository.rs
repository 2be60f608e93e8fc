//! In-memory `CertificateRepository`.
//!
//! Rows live in a `BTreeMap` keyed by id, with unique indexes on hash and
//! verification code. All three uniqueness rules are checked and the row is
//! inserted under one write lock, so concurrent `create` calls for the same
//! (owner, type, activity) tuple admit exactly one winner. `update_status`
//! is a compare-and-set under the same lock.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use tracing::debug;

use certa_contracts::{
    certificate::{
        ActivityId, Certificate, CertificateId, CertificateStatus, CertificateType,
        NewCertificate, OwnerId,
    },
    error::{CertError, CertResult, UniqueConstraint},
};
use certa_core::traits::{CertificateRepository, RepositoryCounts};

use crate::row::CertificateRow;

#[derive(Default)]
struct RepositoryState {
    rows: BTreeMap<i64, CertificateRow>,
    by_hash: HashMap<String, i64>,
    by_code: HashMap<String, i64>,
    next_id: i64,
}

impl RepositoryState {
    fn row(&self, id: i64) -> Option<&CertificateRow> {
        self.rows.get(&id)
    }

    fn owned_by<'a>(
        &'a self,
        owner_id: &'a OwnerId,
        include_revoked: bool,
    ) -> impl Iterator<Item = &'a CertificateRow> + 'a {
        let revoked = CertificateStatus::Revoked.as_str();
        self.rows
            .values()
            .filter(move |r| r.owner_id == owner_id.as_str())
            .filter(move |r| include_revoked || r.status != revoked)
    }
}

/// A thread-safe, non-durable certificate store.
#[derive(Default)]
pub struct InMemoryCertificateRepository {
    state: RwLock<RepositoryState>,
}

impl InMemoryCertificateRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, RepositoryState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, RepositoryState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn len(&self) -> usize {
        self.read().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A copy of every stored row, in id order.
    pub fn rows(&self) -> Vec<CertificateRow> {
        self.read().rows.values().cloned().collect()
    }
}

fn row_id(id: CertificateId) -> Option<i64> {
    i64::try_from(id.0).ok()
}

impl CertificateRepository for InMemoryCertificateRepository {
    fn create(&self, new: NewCertificate) -> CertResult<Certificate> {
        let mut state = self.write();

        if state.by_hash.contains_key(&new.hash) {
            return Err(CertError::UniqueViolation {
                constraint: UniqueConstraint::Hash,
            });
        }
        if state.by_code.contains_key(&new.verification_code) {
            return Err(CertError::UniqueViolation {
                constraint: UniqueConstraint::VerificationCode,
            });
        }
        let occupied = state.rows.values().any(|r| {
            r.matches_tuple(&new.owner_id, new.certificate_type, new.activity_id.as_ref())
                && r.is_effectively_active(new.issued_at)
        });
        if occupied {
            return Err(CertError::UniqueViolation {
                constraint: UniqueConstraint::ActiveTuple,
            });
        }

        let id = state.next_id + 1;
        let certificate = Certificate::from_new(
            CertificateId(u64::try_from(id).map_err(|_| CertError::Storage {
                reason: "certificate id space exhausted".to_string(),
            })?),
            new,
        );
        let row = CertificateRow::try_from(&certificate)?;

        state.next_id = id;
        state.by_hash.insert(row.hash.clone(), id);
        state.by_code.insert(row.verification_code.clone(), id);
        state.rows.insert(id, row);

        debug!(certificate_id = id, owner_id = %certificate.owner_id, "certificate row inserted");
        Ok(certificate)
    }

    fn get_by_id(&self, id: CertificateId) -> CertResult<Option<Certificate>> {
        let state = self.read();
        row_id(id)
            .and_then(|id| state.row(id))
            .map(Certificate::try_from)
            .transpose()
    }

    fn get_by_hash(&self, hash: &str) -> CertResult<Option<Certificate>> {
        let state = self.read();
        state
            .by_hash
            .get(hash)
            .and_then(|id| state.row(*id))
            .map(Certificate::try_from)
            .transpose()
    }

    fn get_by_verification_code(&self, code: &str) -> CertResult<Option<Certificate>> {
        let state = self.read();
        state
            .by_code
            .get(code)
            .and_then(|id| state.row(*id))
            .map(Certificate::try_from)
            .transpose()
    }

    fn find_active(
        &self,
        owner_id: &OwnerId,
        certificate_type: CertificateType,
        activity_id: Option<&ActivityId>,
        now: DateTime<Utc>,
    ) -> CertResult<Option<Certificate>> {
        let state = self.read();
        state
            .rows
            .values()
            .find(|r| {
                r.matches_tuple(owner_id, certificate_type, activity_id)
                    && r.is_effectively_active(now)
            })
            .map(Certificate::try_from)
            .transpose()
    }

    fn list_by_owner(
        &self,
        owner_id: &OwnerId,
        include_revoked: bool,
        page: u32,
        page_size: u32,
    ) -> CertResult<Vec<Certificate>> {
        let state = self.read();
        let mut owned: Vec<&CertificateRow> = state.owned_by(owner_id, include_revoked).collect();
        owned.sort_by(|a, b| b.issued_at.cmp(&a.issued_at).then(b.id.cmp(&a.id)));

        let skip = page.saturating_sub(1) as usize * page_size as usize;
        owned
            .into_iter()
            .skip(skip)
            .take(page_size as usize)
            .map(Certificate::try_from)
            .collect()
    }

    fn count_by_owner(&self, owner_id: &OwnerId, include_revoked: bool) -> CertResult<u64> {
        Ok(self.read().owned_by(owner_id, include_revoked).count() as u64)
    }

    fn update_status(
        &self,
        id: CertificateId,
        status: CertificateStatus,
        reason: Option<&str>,
        at: DateTime<Utc>,
    ) -> CertResult<bool> {
        let mut state = self.write();
        let Some(row) = row_id(id).and_then(|id| state.rows.get_mut(&id)) else {
            return Ok(false);
        };

        let current = row.status()?;
        if !current.can_transition_to(status) {
            return Err(CertError::InvalidTransition {
                reason: format!("certificate {} cannot move from {} to {}", id, current, status),
            });
        }

        row.status = status.as_str().to_string();
        if status == CertificateStatus::Revoked {
            row.revocation_reason = reason.map(str::to_string);
            row.revoked_at = Some(at);
        }

        debug!(certificate_id = %id, from = %current, to = %status, "certificate status updated");
        Ok(true)
    }

    fn counts(
        &self,
        now: DateTime<Utc>,
        issued_since: DateTime<Utc>,
    ) -> CertResult<RepositoryCounts> {
        let state = self.read();
        let mut counts = RepositoryCounts::default();
        let mut owners = HashSet::new();

        for row in state.rows.values() {
            let certificate = Certificate::try_from(row)?;
            counts.total += 1;
            *counts
                .by_status
                .entry(certificate.effective_status(now))
                .or_insert(0) += 1;
            *counts.by_type.entry(certificate.certificate_type).or_insert(0) += 1;
            if certificate.issued_at >= issued_since {
                counts.issued_since += 1;
            }
            owners.insert(row.owner_id.as_str());
        }

        counts.distinct_owners = owners.len() as u64;
        Ok(counts)
    }
}
