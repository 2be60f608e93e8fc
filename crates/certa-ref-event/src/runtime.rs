//! Wiring of the summit reference runtime.
//!
//! `EventRuntime` assembles real Certa components around the mock
//! `EventDirectory`: the in-memory repository and artifact store, the
//! rule-driven eligibility validator loaded from `rules/event.toml`, the
//! template generator, and a caller-supplied audit ledger. The clock is a
//! `FixedClock` starting at [`summit_opening`] so scenarios can move time.
//!
//! The orchestrator performs no role checks. The runtime is its caller, so
//! the `*_as` methods consult `CapabilityAuthorization` first and return
//! [`Gate::Denied`] without touching the service when the actor lacks the
//! capability.

use std::sync::Arc;

use tracing::info;

use certa_audit::InMemoryAuditLedger;
use certa_contracts::{
    capability::Actor,
    certificate::{Certificate, OwnerId},
    error::{CertError, CertResult},
    request::{
        CertificateStatistics, GenerateRequest, ReissueOutcome, ReissueRequest, RevokeRequest,
    },
};
use certa_core::{
    authz::CapabilityAuthorization,
    clock::FixedClock,
    config::ServiceConfig,
    traits::{AuditLedger, AuthorizationPolicy, OwnerDirectory},
    AuditService, CertificatesService, ServiceParts,
};
use certa_eligibility::{EligibilitySources, RequirementConfig, RuleEligibilityValidator};
use certa_render::{TemplateCatalog, TemplateGenerator};
use certa_store::{InMemoryArtifactStorage, InMemoryCertificateRepository};

use crate::mock_data::{summit_opening, EventDirectory};

// ── Shipped configuration ────────────────────────────────────────────────────

/// Requirement rules of the summit.
pub const EVENT_RULES: &str = include_str!("../rules/event.toml");

/// Orchestrator settings of the summit.
pub const SERVICE_CONFIG: &str = include_str!("../config/service.toml");

const ISSUER: &str = "Harbor Systems Summit 2026";
const HASH_SALT: &str = "harbor-summit-2026-reference-salt";

/// Outcome of an authorization-gated call.
#[derive(Debug)]
pub enum Gate<T> {
    Allowed(T),
    Denied { action: &'static str },
}

impl<T> Gate<T> {
    pub fn is_denied(&self) -> bool {
        matches!(self, Gate::Denied { .. })
    }

    /// The allowed value, or an `Internal` error naming the denied action.
    pub fn allowed(self) -> CertResult<T> {
        match self {
            Gate::Allowed(value) => Ok(value),
            Gate::Denied { action } => Err(CertError::Internal {
                reason: format!("{action} was denied by authorization"),
            }),
        }
    }
}

/// A fully wired certificate service plus handles for inspection.
pub struct EventRuntime {
    pub service: CertificatesService,
    pub repository: Arc<InMemoryCertificateRepository>,
    pub storage: Arc<InMemoryArtifactStorage>,
    pub directory: Arc<EventDirectory>,
    pub clock: Arc<FixedClock>,
    pub authorization: CapabilityAuthorization,
}

impl EventRuntime {
    /// Wire the runtime with the shipped configuration and `ledger`.
    pub fn new(ledger: Arc<dyn AuditLedger>) -> CertResult<Self> {
        Self::with_config(ledger, ServiceConfig::from_toml_str(SERVICE_CONFIG)?)
    }

    /// Wire the runtime around a fresh `InMemoryAuditLedger`, returning a
    /// handle to it for integrity checks.
    pub fn with_memory_ledger() -> CertResult<(Self, Arc<InMemoryAuditLedger>)> {
        let ledger = Arc::new(InMemoryAuditLedger::new());
        let runtime = Self::new(ledger.clone())?;
        Ok((runtime, ledger))
    }

    pub fn with_config(ledger: Arc<dyn AuditLedger>, config: ServiceConfig) -> CertResult<Self> {
        let clock = Arc::new(FixedClock::new(summit_opening()));
        let directory = Arc::new(EventDirectory::summit());
        let repository = Arc::new(InMemoryCertificateRepository::new());
        let storage = Arc::new(InMemoryArtifactStorage::new());

        let rules = RequirementConfig::from_toml_str(EVENT_RULES)?;
        let eligibility = RuleEligibilityValidator::new(
            rules,
            EligibilitySources {
                owners: directory.clone(),
                activities: directory.clone(),
                participation: directory.clone(),
                repository: repository.clone(),
                clock: clock.clone(),
            },
        );
        let generator = TemplateGenerator::new(TemplateCatalog::builtin(), HASH_SALT, ISSUER);

        let service = CertificatesService::new(
            ServiceParts {
                repository: repository.clone(),
                eligibility: Arc::new(eligibility),
                generator: Arc::new(generator),
                storage: storage.clone(),
                owners: directory.clone(),
                activities: directory.clone(),
                audit: AuditService::new(ledger, clock.clone()),
                clock: clock.clone(),
            },
            config,
        )?;

        info!(
            owners = directory.owner_count(),
            activities = directory.activity_count(),
            "summit runtime wired"
        );

        Ok(Self {
            service,
            repository,
            storage,
            directory,
            clock,
            authorization: CapabilityAuthorization,
        })
    }

    /// The acting identity of a registered owner, with its role's capabilities.
    pub fn actor(&self, id: &str) -> CertResult<Actor> {
        let owner_id = OwnerId::new(id);
        let owner = self
            .directory
            .owner(&owner_id)?
            .ok_or_else(|| CertError::not_found("owner", &owner_id))?;
        Ok(Actor::with_role(owner.owner_id, owner.role))
    }

    // ── Authorization-gated operations ───────────────────────────────────────

    pub fn generate_as(
        &self,
        actor: &Actor,
        request: GenerateRequest,
    ) -> CertResult<Gate<Certificate>> {
        if !self.authorization.can_generate_for(actor, &request.owner_id) {
            return Ok(Gate::Denied { action: "generate" });
        }
        self.service.generate(request, &actor.id).map(Gate::Allowed)
    }

    pub fn revoke_as(
        &self,
        actor: &Actor,
        request: &RevokeRequest,
    ) -> CertResult<Gate<Certificate>> {
        if !self.authorization.can_revoke(actor) {
            return Ok(Gate::Denied { action: "revoke" });
        }
        self.service.revoke(request, &actor.id).map(Gate::Allowed)
    }

    pub fn reissue_as(
        &self,
        actor: &Actor,
        request: ReissueRequest,
    ) -> CertResult<Gate<ReissueOutcome>> {
        if !self.authorization.can_reissue(actor) {
            return Ok(Gate::Denied { action: "reissue" });
        }
        self.service.reissue(request, &actor.id).map(Gate::Allowed)
    }

    pub fn statistics_as(&self, actor: &Actor) -> CertResult<Gate<CertificateStatistics>> {
        if !self.authorization.can_view_statistics(actor) {
            return Ok(Gate::Denied { action: "view statistics" });
        }
        self.service.statistics().map(Gate::Allowed)
    }
}
