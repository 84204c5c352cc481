/// Factory: build `AuthService` from application `Config`.
use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::repos::user_repo::PgUserStore;
use crate::services::auth::identity::RoleMapping;
use crate::services::auth::resolver::IdentityResolver;
use crate::services::auth::token_codec::{SigningSecret, TokenCodec, TokenCodecError};
use crate::services::auth::AuthService;

/// Fails (and so aborts startup) on a weak or undecodable secret.
pub fn build_auth_service(config: &Config, db: PgPool) -> Result<Arc<AuthService>, TokenCodecError> {
    let secret = SigningSecret::parse(&config.jwt_secret)?;
    let codec = TokenCodec::new(secret, config.jwt_expiration)?;

    let resolver = IdentityResolver::new(
        Arc::new(PgUserStore::new(db)),
        RoleMapping::new(config.admin_role.clone()),
        config.auth_lookup_timeout,
    );

    Ok(Arc::new(AuthService::new(codec, resolver)))
}
