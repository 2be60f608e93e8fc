//! Summit reference runtime scenarios.
//!
//! Each scenario wires an `EventRuntime`, drives the certificate lifecycle
//! through it, narrates every step, and fails with an error if an outcome
//! differs from what the scenario expects.

pub mod audit_outage;
pub mod concurrent_issuance;
pub mod expiry_reissue;
pub mod lifecycle;

use certa_contracts::error::{CertError, CertResult};

/// Fail the scenario unless `condition` holds.
pub(crate) fn ensure(condition: bool, expectation: &str) -> CertResult<()> {
    if condition {
        Ok(())
    } else {
        Err(CertError::Internal {
            reason: format!("scenario expectation failed: {expectation}"),
        })
    }
}

/// Narrate an integrity check of the audit chain.
pub(crate) fn print_integrity(intact: bool) {
    println!(
        "  Audit chain integrity: {}",
        if intact { "VERIFIED" } else { "FAILED" }
    );
}
