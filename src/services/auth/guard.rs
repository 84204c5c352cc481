//! Ownership-or-admin authorization.

use std::str::FromStr;

use thiserror::Error;

use crate::services::auth::identity::{Capability, Identity};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden")]
    Forbidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthDecisionReason {
    Owner,
    Admin,
    NotOwner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthDecision {
    pub allowed: bool,
    pub reason: AuthDecisionReason,
}

/// How a denial is shown to the client.
///
/// `NotFound` hides whether the resource exists at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DenialPolicy {
    #[default]
    Forbidden,
    NotFound,
}

impl FromStr for DenialPolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "forbidden" | "403" => Ok(Self::Forbidden),
            "not_found" | "notfound" | "404" => Ok(Self::NotFound),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizationGuard {
    denial: DenialPolicy,
}

impl AuthorizationGuard {
    pub fn new(denial: DenialPolicy) -> Self {
        Self { denial }
    }

    pub fn denial_policy(&self) -> DenialPolicy {
        self.denial
    }

    /// Admin wins even when ownership also holds.
    pub fn decide(&self, identity: &Identity, owner_id: i64) -> AuthDecision {
        if identity.roles.grants(Capability::BypassOwnership) {
            AuthDecision {
                allowed: true,
                reason: AuthDecisionReason::Admin,
            }
        } else if identity.id == owner_id
            && identity.roles.grants(Capability::AccessOwnResources)
        {
            AuthDecision {
                allowed: true,
                reason: AuthDecisionReason::Owner,
            }
        } else {
            AuthDecision {
                allowed: false,
                reason: AuthDecisionReason::NotOwner,
            }
        }
    }

    pub fn can_access(&self, identity: &Identity, owner_id: i64) -> bool {
        self.decide(identity, owner_id).allowed
    }

    pub fn require_access(&self, identity: &Identity, owner_id: i64) -> Result<(), AuthzError> {
        let decision = self.decide(identity, owner_id);
        if decision.allowed {
            Ok(())
        } else {
            tracing::info!(
                user_id = identity.id,
                owner_id,
                "access denied: not the owner"
            );
            Err(AuthzError::Forbidden)
        }
    }
}
