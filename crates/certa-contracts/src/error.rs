//! Error types for the certificate lifecycle.
//!
//! All fallible operations in the Certa crates return `CertResult<T>`.
//! Business-rule failures (ineligible, duplicate, not found, illegal
//! transition) are typed variants the caller maps to a user-facing response;
//! everything else is an internal fault that is logged in full and reduced
//! to a generic message at the boundary.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The uniqueness constraint a repository insert collided with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UniqueConstraint {
    /// Another certificate already carries the same verification hash.
    Hash,
    /// Another certificate already carries the same verification code.
    VerificationCode,
    /// An effectively active certificate already exists for the
    /// (owner, type, activity) tuple.
    ActiveTuple,
}

impl fmt::Display for UniqueConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UniqueConstraint::Hash => "hash",
            UniqueConstraint::VerificationCode => "verification_code",
            UniqueConstraint::ActiveTuple => "active_tuple",
        };
        f.write_str(name)
    }
}

/// The unified error type for the certificate core.
#[derive(Debug, Error)]
pub enum CertError {
    /// The owner does not meet the requirements for the certificate type.
    #[error("not eligible: {reason}")]
    Ineligible { reason: String },

    /// An active certificate already exists for the (owner, type, activity) tuple.
    #[error(
        "an active {certificate_type} certificate already exists for owner '{owner_id}' and activity '{activity_id}'"
    )]
    DuplicateCertificate {
        owner_id: String,
        certificate_type: String,
        activity_id: String,
    },

    /// A certificate, owner, activity, or enrollment could not be found.
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    /// The requested status change is not legal from the current state.
    #[error("invalid transition: {reason}")]
    InvalidTransition { reason: String },

    /// The artifact generator or the artifact storage failed.
    #[error("certificate generation failed: {reason}")]
    GenerationFailure { reason: String },

    /// The audit ledger could not persist an entry.
    ///
    /// Never surfaced by the orchestrator; only observed through logs and the
    /// audit failure counter.
    #[error("audit write failed: {reason}")]
    AuditWriteFailed { reason: String },

    /// A repository insert violated a uniqueness constraint.
    #[error("unique constraint '{constraint}' violated")]
    UniqueViolation { constraint: UniqueConstraint },

    /// The persistence backend failed.
    #[error("storage error: {reason}")]
    Storage { reason: String },

    /// The caller cancelled the operation before it reached a persistence write.
    #[error("operation cancelled before {stage}")]
    Cancelled { stage: &'static str },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// Any other unexpected failure.
    #[error("internal error: {reason}")]
    Internal { reason: String },
}

impl CertError {
    /// Message returned to callers when the failure is not a business outcome.
    pub const GENERIC_MESSAGE: &'static str = "an internal error occurred while processing the certificate request";

    /// True for the expected business outcomes a caller maps to a user-facing
    /// response: ineligible, duplicate, not found, and illegal transitions.
    pub fn is_business_failure(&self) -> bool {
        matches!(
            self,
            CertError::Ineligible { .. }
                | CertError::DuplicateCertificate { .. }
                | CertError::NotFound { .. }
                | CertError::InvalidTransition { .. }
        )
    }

    /// The message safe to show outside the service.
    ///
    /// Business failures keep their full text; internal faults collapse to
    /// [`CertError::GENERIC_MESSAGE`].
    pub fn public_message(&self) -> String {
        if self.is_business_failure() {
            self.to_string()
        } else {
            Self::GENERIC_MESSAGE.to_string()
        }
    }

    /// Shorthand for a [`CertError::NotFound`] naming the missing entity.
    pub fn not_found(entity: &'static str, id: impl fmt::Display) -> Self {
        CertError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Convenience alias used throughout the Certa crates.
pub type CertResult<T> = Result<T, CertError>;
