//! # certa-core
//!
//! The certificate lifecycle engine.
//!
//! This crate provides:
//! - The collaborator traits (`CertificateRepository`, `AuditLedger`,
//!   `CertificateGenerator`, `ArtifactStorage`, the directories, `EligibilityValidator`)
//! - The `AuditService` that turns lifecycle events into ledger entries
//! - The `CertificatesService` that wires them together in the order
//!   generate, persist, audit
//!
//! ## Usage
//!
//! ```rust,ignore
//! use certa_core::{CertificatesService, ServiceParts, config::ServiceConfig};
//! ```

pub mod audit;
pub mod authz;
pub mod cancel;
pub mod clock;
pub mod config;
pub mod service;
pub mod traits;

pub use audit::AuditService;
pub use service::{CertificatesService, ServiceParts};
