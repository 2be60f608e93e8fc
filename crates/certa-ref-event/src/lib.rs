//! # certa-ref-event
//!
//! Reference runtime for the Certa certificate core, modelled on a fictional
//! multi-day conference, the Harbor Systems Summit 2026.
//!
//! Demonstrates four scenarios using mock data:
//!
//! 1. **Lifecycle**: issue, duplicate rejection, revoke, reissue, and
//!    validation of both the revoked original and its replacement.
//! 2. **Concurrent Issuance**: racing issuance and revocation settle on a
//!    single winner each.
//! 3. **Audit Outage**: every operation succeeds while the audit store is
//!    down; the lost entries are only counted.
//! 4. **Expiry and Reissue**: date-based expiry, reissue of an expired
//!    certificate, and caller cancellation.
//!
//! All data is hardcoded and fictional. No external systems are contacted.

pub mod mock_data;
pub mod runtime;
pub mod scenarios;

pub use mock_data::EventDirectory;
pub use runtime::{EventRuntime, Gate};
