//! # certa-render
//!
//! The reference certificate generator.
//!
//! [`TemplateGenerator`] implements
//! [`CertificateGenerator`](certa_core::traits::CertificateGenerator): salted
//! SHA-256 verification hashes, short random verification codes, and HTML
//! artifacts rendered from per-type templates. Each template carries a JSON
//! Schema for its rendering context, checked with the `jsonschema` crate
//! before anything is rendered.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use certa_render::{TemplateCatalog, TemplateGenerator};
//!
//! let generator = TemplateGenerator::new(TemplateCatalog::builtin(), salt, "Certa Events");
//! ```

pub mod generator;
pub mod template;

pub use generator::TemplateGenerator;
pub use template::{CertificateTemplate, TemplateCatalog};

// ── Tests ─────────────────────────────────────────────────────────────────────
