/*
 * Responsibility
 * - POST /auth/register: 新規 user (role は USER のみ) を作成し 201
 * - POST /auth/login: username/password → Bearer token
 * - GET /auth/me: 認証済み Identity をそのまま返す
 * - 失敗理由 (unknown user / wrong password / disabled) は区別せず 401
 */
use axum::{Json, extract::State, http::StatusCode};

use crate::{
    api::v1::{
        dto::auth::{LoginRequest, LoginResponse, RegisterRequest, UserResponse},
        extractors::CurrentIdentity,
    },
    error::AppError,
    state::AppState,
};

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    req.validate()
        .map_err(|msg| AppError::bad_request("VALIDATION_ERROR", msg))?;

    let identity = state
        .auth
        .register(req.username.trim(), req.email.trim(), &req.password)
        .await?;
    tracing::info!(user_id = identity.id, "user registered");

    Ok((StatusCode::CREATED, Json(identity.into())))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    req.validate()
        .map_err(|msg| AppError::bad_request("VALIDATION_ERROR", msg))?;

    let issued = state.auth.login(req.username.trim(), &req.password).await?;
    tracing::info!(
        user_id = issued.identity.id,
        admin = issued.identity.is_admin(),
        "login succeeded"
    );

    Ok(Json(LoginResponse {
        token: issued.token,
        token_type: issued.token_type,
    }))
}

pub async fn me(CurrentIdentity(identity): CurrentIdentity) -> Json<UserResponse> {
    Json(identity.into())
}
