//! Capability-based authorization types.
//!
//! Callers of the certificate core are authorized before they reach it. An
//! acting user holds a set of capabilities derived from their role; the
//! authorization policy checks those capabilities against the operation.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::certificate::OwnerId;
use crate::directory::Role;

/// An opaque capability token, e.g. `"certificates:revoke"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Capability(pub String);

impl Capability {
    /// Construct a capability from any string-like value.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Admin override: implies every other capability.
    pub const ADMIN: &'static str = "certificates:admin";
    /// Issue certificates for oneself.
    pub const GENERATE_SELF: &'static str = "certificates:generate:self";
    /// Issue certificates for any owner.
    pub const GENERATE_ANY: &'static str = "certificates:generate:any";
    pub const REVOKE: &'static str = "certificates:revoke";
    pub const REISSUE: &'static str = "certificates:reissue";
    pub const VIEW_STATISTICS: &'static str = "statistics:view";
}

/// The set of capabilities an acting user holds.
#[derive(Debug, Clone, Default)]
pub struct CapabilitySet {
    inner: HashSet<Capability>,
}

impl CapabilitySet {
    /// Grant a capability to this set.
    pub fn grant(&mut self, capability: Capability) {
        self.inner.insert(capability);
    }

    /// Return true if the set contains the given capability by name.
    ///
    /// The admin capability satisfies every check.
    pub fn has(&self, name: &str) -> bool {
        self.inner.contains(&Capability::new(name))
            || self.inner.contains(&Capability::new(Capability::ADMIN))
    }

    /// Return an iterator over all granted capabilities.
    pub fn all(&self) -> impl Iterator<Item = &Capability> {
        self.inner.iter()
    }

    /// The default capability grant for a role.
    pub fn for_role(role: Role) -> Self {
        let names: &[&str] = match role {
            Role::Participant | Role::Speaker => &[Capability::GENERATE_SELF],
            Role::Organizer => &[Capability::GENERATE_SELF, Capability::VIEW_STATISTICS],
            Role::Staff => &[
                Capability::GENERATE_SELF,
                Capability::GENERATE_ANY,
                Capability::REISSUE,
                Capability::VIEW_STATISTICS,
            ],
            Role::Admin => &[Capability::ADMIN],
        };
        let mut set = Self::default();
        for name in names {
            set.grant(Capability::new(*name));
        }
        set
    }
}

/// An authenticated user acting on the certificate core.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: OwnerId,
    pub capabilities: CapabilitySet,
}

impl Actor {
    /// An actor carrying the default capabilities of `role`.
    pub fn with_role(id: OwnerId, role: Role) -> Self {
        Self {
            id,
            capabilities: CapabilitySet::for_role(role),
        }
    }
}
