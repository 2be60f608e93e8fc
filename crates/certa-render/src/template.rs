//! Certificate templates and the per-type catalog.
//!
//! A template is an HTML body with `{{field}}` placeholders plus a JSON
//! Schema describing the rendering context it needs. The builtin catalog
//! derives both from each type's `TypeProfile`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use certa_contracts::{
    certificate::CertificateType,
    error::{CertError, CertResult},
};

const BASE_LAYOUT: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>{{certificate_title}}</title></head>
<body class="certificate {{template_id}}">
  <h1>{{certificate_title}}</h1>
  <p class="recipient">{{participant_title}} {{participant_name}}</p>
  <p class="statement">{{statement}}</p>
  <p class="event">{{event_name}}</p>
  <p class="details">{{event_date}} {{duration}}</p>
  <p class="award">{{award}}</p>
  <p class="speaker">{{speaker}}</p>
  <footer>
    <p class="issuer">{{issuer}}</p>
    <p class="verification">Verification code: {{verification_code}}</p>
  </footer>
</body>
</html>
"#;

/// One renderable certificate layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateTemplate {
    pub template_id: String,
    pub title: String,
    /// Sentence printed between the recipient and the event name.
    pub statement: String,
    /// HTML with `{{field}}` placeholders.
    pub body: String,
    /// JSON Schema the serialized rendering context must satisfy.
    pub context_schema: Value,
}

impl CertificateTemplate {
    /// The default template for `certificate_type`.
    pub fn builtin(certificate_type: CertificateType) -> Self {
        let profile = certificate_type.profile();
        let statement = match certificate_type {
            CertificateType::Attendance => "attended",
            CertificateType::Participation => "actively participated in",
            CertificateType::Speaker => "presented at",
            CertificateType::Organizer => "helped organize",
            CertificateType::Winner => "received an award at",
        };
        Self {
            template_id: profile.template_id.to_string(),
            title: profile.title.to_string(),
            statement: statement.to_string(),
            body: BASE_LAYOUT.to_string(),
            context_schema: required_fields_schema(profile.required_fields),
        }
    }
}

/// A schema requiring each named field to be a non-empty string.
pub fn required_fields_schema(fields: &[&str]) -> Value {
    let properties: serde_json::Map<String, Value> = fields
        .iter()
        .map(|f| (f.to_string(), json!({ "type": "string", "minLength": 1 })))
        .collect();
    json!({
        "type": "object",
        "required": fields,
        "properties": properties,
    })
}

/// Templates keyed by certificate type.
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    templates: HashMap<CertificateType, CertificateTemplate>,
}

impl TemplateCatalog {
    /// A catalog with the builtin template for every type.
    pub fn builtin() -> Self {
        Self {
            templates: CertificateType::ALL
                .into_iter()
                .map(|t| (t, CertificateTemplate::builtin(t)))
                .collect(),
        }
    }

    /// Replace the template used for `certificate_type`.
    pub fn register(&mut self, certificate_type: CertificateType, template: CertificateTemplate) {
        self.templates.insert(certificate_type, template);
    }

    pub fn get(&self, certificate_type: CertificateType) -> CertResult<&CertificateTemplate> {
        self.templates
            .get(&certificate_type)
            .ok_or_else(|| CertError::GenerationFailure {
                reason: format!("no template registered for certificate type '{certificate_type}'"),
            })
    }
}

impl Default for TemplateCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Replace every `{{key}}` in `body` with the HTML-escaped string value of
/// `fields[key]`. Unknown or non-string keys render as empty.
pub fn fill_placeholders(body: &str, fields: &serde_json::Map<String, Value>) -> String {
    let mut out = String::with_capacity(body.len());
    let mut rest = body;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = after[..end].trim();
                if let Some(value) = fields.get(key).and_then(Value::as_str) {
                    out.push_str(&escape_html(value));
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
