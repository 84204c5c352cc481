use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::services::auth::{Authentication, Identity};

/// Handler で認証済み Identity を受け取るための extractor
/// middleware が `Authentication` を request.extensions() に insert 済みである前提
/// Anonymous / 未設定のどちらも同じ汎用 401 (理由は返さない)
#[derive(Debug, Clone)]
pub struct CurrentIdentity(pub Identity);

impl<S> FromRequestParts<S> for CurrentIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Authentication>() {
            Some(Authentication::Authenticated(identity)) => Ok(Self(identity.clone())),
            Some(Authentication::Anonymous) => Err(AppError::Unauthorized),
            None => {
                tracing::warn!(path = %parts.uri.path(), "authentication middleware not applied");
                Err(AppError::Unauthorized)
            }
        }
    }
}
