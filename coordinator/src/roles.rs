//! Role-based access control for coordinator operations.

use tracing::warn;

use poolclear_common::{ActorId, PoolClearError, Result, Role};

use crate::config::CoordinatorConfig;

/// Checks caller identities against the configured role holders.
///
/// Role bindings are fixed at construction; the gate itself holds no other
/// state and has no side effects beyond the check and a denial log line.
#[derive(Debug, Clone)]
pub struct RoleGate {
    intake: ActorId,
    purge_authority: ActorId,
}

impl RoleGate {
    /// Bind the role holders.
    pub fn new(intake: ActorId, purge_authority: ActorId) -> Self {
        Self {
            intake,
            purge_authority,
        }
    }

    /// Bind role holders from configuration.
    pub fn from_config(config: &CoordinatorConfig) -> Self {
        Self::new(config.intake_actor, config.purge_authority_actor)
    }

    /// The actor bound to a role.
    pub fn holder(&self, role: Role) -> ActorId {
        match role {
            Role::Intake => self.intake,
            Role::PurgeAuthority => self.purge_authority,
        }
    }

    /// Whether an actor holds a role.
    pub fn check(&self, actor: ActorId, role: Role) -> bool {
        actor == self.holder(role)
    }

    /// Require that an actor holds a role; denial is a hard failure.
    pub fn require(&self, actor: ActorId, role: Role) -> Result<()> {
        if self.check(actor, role) {
            Ok(())
        } else {
            warn!(actor = %actor, role = %role, "role denied");
            Err(PoolClearError::RoleDenied { actor, role })
        }
    }
}
