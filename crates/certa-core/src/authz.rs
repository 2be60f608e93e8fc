//! Capability-based authorization predicates.
//!
//! Three access shapes are supported:
//!
//! - self-service: an owner issues certificates for themselves
//! - staff scope: staff issue for anyone, reissue, and read statistics
//! - admin override: the admin capability satisfies every predicate

use tracing::debug;

use certa_contracts::{
    capability::{Actor, Capability},
    certificate::OwnerId,
};

use crate::traits::AuthorizationPolicy;

/// The default `AuthorizationPolicy`, driven purely by the actor's capabilities.
#[derive(Debug, Clone, Copy, Default)]
pub struct CapabilityAuthorization;

impl AuthorizationPolicy for CapabilityAuthorization {
    fn can_generate_for(&self, actor: &Actor, target: &OwnerId) -> bool {
        let allowed = actor.capabilities.has(Capability::GENERATE_ANY)
            || (&actor.id == target && actor.capabilities.has(Capability::GENERATE_SELF));
        debug!(actor = %actor.id, target = %target, allowed, "generate authorization");
        allowed
    }

    fn can_revoke(&self, actor: &Actor) -> bool {
        actor.capabilities.has(Capability::REVOKE)
    }

    fn can_reissue(&self, actor: &Actor) -> bool {
        actor.capabilities.has(Capability::REISSUE)
    }

    fn can_view_statistics(&self, actor: &Actor) -> bool {
        actor.capabilities.has(Capability::VIEW_STATISTICS)
    }
}
