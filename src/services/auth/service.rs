use std::panic::AssertUnwindSafe;

use axum::http::{HeaderMap, header};
use chrono::Utc;
use futures::FutureExt;
use thiserror::Error;

use crate::repos::error::RepoError;
use crate::services::auth::identity::{Identity, Role};
use crate::services::auth::password::{
    PasswordError, hash_password, verify_password, verify_without_account,
};
use crate::services::auth::resolver::{IdentityResolver, LookupError, NewUser};
use crate::services::auth::token_codec::{TokenCodec, TokenCodecError};

/// Outcome of authenticating one request. Lives in the request's extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authentication {
    Anonymous,
    Authenticated(Identity),
}

impl Authentication {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Authentication::Anonymous => None,
            Authentication::Authenticated(identity) => Some(identity),
        }
    }
}

/// Why the Authorization header did not yield a bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BearerRejection {
    NoHeader,
    NotUtf8,
    WrongScheme,
    EmptyToken,
}

/// `Authorization: Bearer <token>`; the scheme is matched case-insensitively.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, BearerRejection> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(BearerRejection::NoHeader)?
        .to_str()
        .map_err(|_| BearerRejection::NotUtf8)?;

    let (scheme, token) = value.split_once(' ').unwrap_or((value, ""));
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return Err(BearerRejection::WrongScheme);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(BearerRejection::EmptyToken);
    }
    Ok(token)
}

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error(transparent)]
    Token(#[from] TokenCodecError),
}

#[derive(Debug, Error)]
pub enum RegisterError {
    #[error(transparent)]
    Store(#[from] RepoError),
    #[error(transparent)]
    Password(#[from] PasswordError),
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub token_type: &'static str,
    pub identity: Identity,
}

/// Token verification + identity resolution, shared read-only by all requests.
#[derive(Debug, Clone)]
pub struct AuthService {
    codec: TokenCodec,
    resolver: IdentityResolver,
}

impl AuthService {
    pub fn new(codec: TokenCodec, resolver: IdentityResolver) -> Self {
        Self { codec, resolver }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn resolver(&self) -> &IdentityResolver {
        &self.resolver
    }

    /// Never fails: every error path, including a panic, ends as `Anonymous`.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Authentication {
        match AssertUnwindSafe(self.try_authenticate(headers))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::error!("authentication panicked; treating request as anonymous");
                Authentication::Anonymous
            }
        }
    }

    async fn try_authenticate(&self, headers: &HeaderMap) -> Authentication {
        let token = match bearer_token(headers) {
            Ok(token) => token,
            Err(reason) => {
                if reason != BearerRejection::NoHeader {
                    tracing::debug!(?reason, "ignoring authorization header");
                }
                return Authentication::Anonymous;
            }
        };

        let claims = match self.codec.verify(token) {
            Ok(claims) => claims,
            Err(err) => {
                tracing::debug!(error = %err, "access token rejected");
                return Authentication::Anonymous;
            }
        };

        match self.resolver.resolve(&claims).await {
            Ok(identity) => Authentication::Authenticated(identity),
            Err(err) => {
                tracing::debug!(subject = %claims.subject, error = %err, "token subject not resolved");
                Authentication::Anonymous
            }
        }
    }

    /// Password login. Unknown users, wrong passwords and disabled accounts are
    /// indistinguishable to the caller.
    pub async fn login(&self, username: &str, password: &str) -> Result<IssuedToken, LoginError> {
        let Some(record) = self.resolver.lookup(username).await? else {
            // 存在しない user でも Argon2 を 1 回走らせて応答時間を揃える
            verify_without_account(password);
            return Err(LoginError::InvalidCredentials);
        };

        if !verify_password(password, &record.password_hash) {
            return Err(LoginError::InvalidCredentials);
        }
        if !record.enabled {
            tracing::info!(user_id = record.id, "login refused for disabled account");
            return Err(LoginError::InvalidCredentials);
        }

        let identity = self.resolver.identity_from(record);
        let token = self
            .codec
            .issue(&identity.username, &identity.roles.to_vec(), Utc::now())?;

        Ok(IssuedToken {
            token,
            token_type: "Bearer",
            identity,
        })
    }

    /// Create an account holding only the default `USER` role.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Identity, RegisterError> {
        let password_hash = hash_password(password)?;
        let record = self
            .resolver
            .store()
            .create_user(NewUser {
                username: username.to_string(),
                email: email.to_string(),
                password_hash,
                roles: vec![Role::User.as_str().to_string()],
            })
            .await?;

        Ok(self.resolver.identity_from(record))
    }
}
