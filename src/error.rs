/*
 * Responsibility
 * - アプリ共通の AppError 定義
 * - IntoResponse 実装 (HTTP status / JSON error body)
 * - RepoError / AuthzError / LoginError / RegisterError を統一的に変換
 * - 認証失敗は常に汎用メッセージ (署名/形式の詳細は返さない)
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::repos::error::RepoError;
use crate::services::auth::guard::{AuthzError, DenialPolicy};
use crate::services::auth::resolver::LookupError;
use crate::services::auth::service::{LoginError, RegisterError};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{code}: {message}")]
    BadRequest { code: &'static str, message: String },
    #[error("not authenticated")]
    Unauthorized,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("access denied")]
    Forbidden,
    #[error("not found: {resource}")]
    NotFound { resource: &'static str },
    #[error("conflict: {field}")]
    Conflict { field: &'static str },
    #[error("internal server error")]
    Internal,
}

impl AppError {
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &'static str) -> Self {
        Self::NotFound { resource }
    }

    /// Translate an authorization denial according to the configured policy.
    pub fn denied(err: AuthzError, policy: DenialPolicy, resource: &'static str) -> Self {
        match (err, policy) {
            (AuthzError::Forbidden, DenialPolicy::Forbidden) => Self::Forbidden,
            (AuthzError::Forbidden, DenialPolicy::NotFound) => Self::not_found(resource),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::BadRequest { code, message } => (StatusCode::BAD_REQUEST, code, message),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "not authenticated".into(),
            ),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "invalid credentials".into(),
            ),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "you do not have permission to access this resource".into(),
            ),
            AppError::NotFound { resource } => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{resource} not found."),
            ),
            AppError::Conflict { field } => (
                StatusCode::CONFLICT,
                "CONFLICT",
                format!("{field} is already in use"),
            ),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
                "internal server error".into(),
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody { code, message },
        };

        (status, Json(body)).into_response()
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::Conflict { field } => AppError::Conflict { field },
            RepoError::Db(_) => {
                tracing::error!(error = ?e, "repository failure");
                AppError::Internal
            }
        }
    }
}

impl From<LoginError> for AppError {
    fn from(e: LoginError) -> Self {
        match e {
            LoginError::InvalidCredentials => AppError::InvalidCredentials,
            LoginError::Lookup(LookupError::Store(e)) => e.into(),
            LoginError::Lookup(e @ LookupError::TimedOut(_)) => {
                tracing::warn!(error = %e, "login aborted");
                AppError::Internal
            }
            LoginError::Token(e) => {
                tracing::error!(error = %e, "failed to issue token");
                AppError::Internal
            }
        }
    }
}

impl From<RegisterError> for AppError {
    fn from(e: RegisterError) -> Self {
        match e {
            RegisterError::Store(e) => e.into(),
            RegisterError::Password(e) => {
                tracing::error!(error = %e, "failed to hash password");
                AppError::Internal
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let res = err.into_response();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn unauthorized_is_generic() {
        let (status, body) = body_json(AppError::Unauthorized).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
        assert_eq!(body["error"]["message"], "not authenticated");
    }

    #[tokio::test]
    async fn denial_follows_policy() {
        let (status, _) = body_json(AppError::denied(
            AuthzError::Forbidden,
            DenialPolicy::Forbidden,
            "task",
        ))
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = body_json(AppError::denied(
            AuthzError::Forbidden,
            DenialPolicy::NotFound,
            "task",
        ))
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["message"], "task not found.");
    }

    #[tokio::test]
    async fn repo_failures_hide_details() {
        let err: AppError = RepoError::Db(sqlx::Error::PoolTimedOut).into();
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["message"], "internal server error");
    }

    #[tokio::test]
    async fn duplicate_account_is_conflict() {
        let err: AppError = RegisterError::Store(RepoError::Conflict { field: "email" }).into();
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(
            body,
            serde_json::json!({"error": {"code": "CONFLICT", "message": "email is already in use"}})
        );
    }

    #[tokio::test]
    async fn login_lookup_timeout_is_internal() {
        let err: AppError =
            LoginError::Lookup(LookupError::TimedOut(std::time::Duration::from_millis(20))).into();
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["message"], "internal server error");
    }
}
