//! Audit ledger entry and query types.
//!
//! Every certificate-related action produces exactly one `AuditLogEntry`.
//! Entries are append-only: ledgers never update or delete them.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::certificate::{CertificateId, OwnerId};

/// The kind of action an audit entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Generation,
    Validation,
    Revocation,
    Reissuance,
    /// A generate, revoke, or reissue attempt that was rejected or failed.
    FailedAttempt,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Generation => "generation",
            AuditAction::Validation => "validation",
            AuditAction::Revocation => "revocation",
            AuditAction::Reissuance => "reissuance",
            AuditAction::FailedAttempt => "failed_attempt",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-form detail map attached to an audit entry.
pub type AuditDetails = BTreeMap<String, Value>;

/// One immutable record of an action against the certificate subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    /// Ledger-assigned sequence id. Zero until the entry has been appended.
    pub id: u64,
    pub action: AuditAction,
    /// Who acted. `None` for anonymous validations.
    pub actor_id: Option<OwnerId>,
    /// Owner of the subject certificate, when known.
    pub owner_id: Option<OwnerId>,
    /// Subject certificate. `None` for failed attempts with no certificate yet.
    pub certificate_id: Option<CertificateId>,
    pub details: AuditDetails,
    pub success: bool,
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AuditLogEntry {
    /// Start a successful entry for `action` at `timestamp`.
    pub fn new(action: AuditAction, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            action,
            actor_id: None,
            owner_id: None,
            certificate_id: None,
            details: AuditDetails::new(),
            success: true,
            error_message: None,
            timestamp,
        }
    }

    pub fn actor(mut self, actor_id: Option<&OwnerId>) -> Self {
        self.actor_id = actor_id.cloned();
        self
    }

    pub fn owner(mut self, owner_id: Option<&OwnerId>) -> Self {
        self.owner_id = owner_id.cloned();
        self
    }

    pub fn certificate(mut self, certificate_id: Option<CertificateId>) -> Self {
        self.certificate_id = certificate_id;
        self
    }

    pub fn detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    /// Mark the entry as a failure carrying `message`.
    pub fn failed(mut self, message: impl Into<String>) -> Self {
        self.success = false;
        self.error_message = Some(message.into());
        self
    }
}

/// Filter for reading entries back from a ledger.
///
/// An entry matches when it satisfies every populated field. `owner_id`
/// matches either the subject owner or the actor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditQuery {
    pub owner_id: Option<OwnerId>,
    pub certificate_id: Option<CertificateId>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    /// Maximum number of entries, newest first. `None` returns all.
    pub limit: Option<usize>,
}

impl AuditQuery {
    pub fn matches(&self, entry: &AuditLogEntry) -> bool {
        if let Some(owner) = &self.owner_id {
            let subject = entry.owner_id.as_ref() == Some(owner);
            let actor = entry.actor_id.as_ref() == Some(owner);
            if !subject && !actor {
                return false;
            }
        }
        if let Some(id) = self.certificate_id {
            if entry.certificate_id != Some(id) {
                return false;
            }
        }
        if let Some(since) = self.since {
            if entry.timestamp < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if entry.timestamp > until {
                return false;
            }
        }
        true
    }
}

/// Aggregate counts over a window of the audit ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStatistics {
    pub total: u64,
    pub generated: u64,
    pub validated: u64,
    pub validation_succeeded: u64,
    pub validation_failed: u64,
    pub revoked: u64,
    pub reissued: u64,
    pub failed_attempts: u64,
}
