//! Reference `CertificateGenerator`.
//!
//! `TemplateGenerator` produces the three things the orchestrator asks of a
//! generator:
//!
//! 1. **Hash**: SHA-256 over a server-side salt, the owner, the type, the
//!    issuance instant, and a random nonce. Without the salt the hash cannot
//!    be predicted from public facts.
//! 2. **Verification code**: 12 random uppercase hex digits in three groups
//!    (`7F3A-09C2-B1E4`), short enough to type from a printout.
//! 3. **Artifact**: the type's HTML template, filled from the rendering
//!    context after the context passes the template's JSON Schema.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use uuid::Uuid;

use certa_contracts::{
    certificate::{CertificateContext, CertificateType, OwnerId},
    directory::OwnerData,
    error::{CertError, CertResult},
    request::GenerateRequest,
};
use certa_core::traits::CertificateGenerator;

use crate::template::{fill_placeholders, TemplateCatalog};

/// Renders certificates from a `TemplateCatalog`.
pub struct TemplateGenerator {
    catalog: TemplateCatalog,
    salt: String,
    issuer: String,
}

impl TemplateGenerator {
    /// `salt` keys the verification hash; keep it secret and stable.
    pub fn new(
        catalog: TemplateCatalog,
        salt: impl Into<String>,
        issuer: impl Into<String>,
    ) -> Self {
        Self {
            catalog,
            salt: salt.into(),
            issuer: issuer.into(),
        }
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    /// Check `context` against the template schema for `certificate_type`.
    ///
    /// Every violation is collected so the failure names all missing fields.
    pub fn check_context(
        &self,
        certificate_type: CertificateType,
        context: &CertificateContext,
    ) -> CertResult<()> {
        let template = self.catalog.get(certificate_type)?;
        let instance = serde_json::to_value(context).map_err(|e| CertError::GenerationFailure {
            reason: format!("rendering context is not serializable: {e}"),
        })?;

        let validator = jsonschema::validator_for(&template.context_schema).map_err(|e| {
            CertError::GenerationFailure {
                reason: format!(
                    "template '{}' has an invalid context schema: {e}",
                    template.template_id
                ),
            }
        })?;

        let violations: Vec<String> = validator
            .iter_errors(&instance)
            .map(|error| format!("{} ({})", error, error.instance_path))
            .collect();

        if violations.is_empty() {
            return Ok(());
        }
        warn!(
            template_id = %template.template_id,
            violations = violations.len(),
            "rendering context rejected by template schema"
        );
        Err(CertError::GenerationFailure {
            reason: format!(
                "context for template '{}' is incomplete: {}",
                template.template_id,
                violations.join("; ")
            ),
        })
    }
}

fn insert(fields: &mut Map<String, Value>, key: &str, value: Option<String>) {
    if let Some(value) = value {
        fields.insert(key.to_string(), Value::String(value));
    }
}

impl CertificateGenerator for TemplateGenerator {
    fn generate_hash(
        &self,
        owner_id: &OwnerId,
        certificate_type: CertificateType,
        issued_at: DateTime<Utc>,
    ) -> String {
        let nonce = Uuid::new_v4();

        let mut hasher = Sha256::new();
        hasher.update(self.salt.as_bytes());
        hasher.update([0u8]);
        hasher.update(owner_id.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(certificate_type.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(issued_at.to_rfc3339_opts(SecondsFormat::Nanos, true).as_bytes());
        hasher.update(nonce.as_bytes());

        hex::encode(hasher.finalize())
    }

    fn generate_verification_code(&self) -> String {
        let raw = Uuid::new_v4().simple().to_string().to_ascii_uppercase();
        format!("{}-{}-{}", &raw[0..4], &raw[4..8], &raw[8..12])
    }

    fn generate_artifact(
        &self,
        request: &GenerateRequest,
        owner: &OwnerData,
        context: &CertificateContext,
    ) -> CertResult<Vec<u8>> {
        self.check_context(request.certificate_type, context)?;
        let template = self.catalog.get(request.certificate_type)?;

        let mut fields = Map::new();
        insert(&mut fields, "template_id", Some(template.template_id.clone()));
        insert(&mut fields, "certificate_title", Some(template.title.clone()));
        insert(&mut fields, "statement", Some(template.statement.clone()));
        insert(&mut fields, "issuer", Some(self.issuer.clone()));
        insert(&mut fields, "participant_name", Some(owner.full_name.clone()));
        insert(&mut fields, "participant_title", context.participant_title.clone());
        insert(&mut fields, "event_name", context.event_name.clone());
        insert(
            &mut fields,
            "event_date",
            context.event_date.map(|d| d.format("%B %-d, %Y").to_string()),
        );
        insert(
            &mut fields,
            "duration",
            context.duration_minutes.map(|m| format!("({m} minutes)")),
        );
        insert(&mut fields, "speaker", context.speaker.clone());
        insert(&mut fields, "award", context.award.clone());
        insert(&mut fields, "verification_code", context.verification_code.clone());

        let html = fill_placeholders(&template.body, &fields);
        debug!(
            template_id = %template.template_id,
            owner_id = %owner.owner_id,
            bytes = html.len(),
            "certificate rendered"
        );
        Ok(html.into_bytes())
    }
}
