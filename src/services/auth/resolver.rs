//! Verified claims → live `Identity`.
//!
//! The subject is looked up in the user store on every call; roles always come
//! from that live record, never from the token.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::repos::error::RepoError;
use crate::services::auth::identity::{Identity, RoleMapping};
use crate::services::auth::token_codec::Claims;

/// User record as held by the external user store.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub roles: Vec<String>,
    pub enabled: bool,
}

/// Account to be created by registration.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub roles: Vec<String>,
}

/// Seam to the external user store.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError>;

    /// Fails with `RepoError::Conflict` when the username or email is taken.
    async fn create_user(&self, user: NewUser) -> Result<UserRecord, RepoError>;
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error(transparent)]
    Store(#[from] RepoError),
    #[error("user lookup timed out after {0:?}")]
    TimedOut(Duration),
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ResolveError {
    /// The subject no longer exists (deleted after the token was issued).
    #[error("user no longer exists")]
    UserVanished,
    #[error("user account is disabled")]
    Disabled,
    /// Store failure or lookup timeout.
    #[error("user lookup failed")]
    LookupFailed,
}

#[derive(Clone)]
pub struct IdentityResolver {
    store: Arc<dyn UserStore>,
    roles: RoleMapping,
    lookup_timeout: Duration,
}

impl std::fmt::Debug for IdentityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityResolver")
            .field("roles", &self.roles)
            .field("lookup_timeout", &self.lookup_timeout)
            .finish()
    }
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn UserStore>, roles: RoleMapping, lookup_timeout: Duration) -> Self {
        Self {
            store,
            roles,
            lookup_timeout,
        }
    }

    pub fn store(&self) -> &dyn UserStore {
        self.store.as_ref()
    }

    pub fn role_mapping(&self) -> &RoleMapping {
        &self.roles
    }

    /// Store lookup bounded by the configured timeout. Shared by token
    /// resolution and password login.
    pub async fn lookup(&self, username: &str) -> Result<Option<UserRecord>, LookupError> {
        let lookup = self.store.find_by_username(username);

        match tokio::time::timeout(self.lookup_timeout, lookup).await {
            Ok(found) => Ok(found?),
            Err(_) => Err(LookupError::TimedOut(self.lookup_timeout)),
        }
    }

    pub async fn resolve(&self, claims: &Claims) -> Result<Identity, ResolveError> {
        let record = match self.lookup(&claims.subject).await {
            Ok(Some(record)) => record,
            Ok(None) => return Err(ResolveError::UserVanished),
            Err(err) => {
                tracing::warn!(error = %err, "user lookup failed during authentication");
                return Err(ResolveError::LookupFailed);
            }
        };

        if !record.enabled {
            return Err(ResolveError::Disabled);
        }

        Ok(self.identity_from(record))
    }

    pub fn identity_from(&self, record: UserRecord) -> Identity {
        let roles = self.roles.role_set(record.roles.iter().map(String::as_str));
        Identity {
            id: record.id,
            username: record.username,
            email: record.email,
            roles,
        }
    }
}
