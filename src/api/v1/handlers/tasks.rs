/*
 * Responsibility
 * - /tasks 系 handler
 * - 作成時の owner / created_by は常に caller の Identity から決める (body からは受け取らない)
 * - 一覧は caller 自身のものだけ (status で絞り込み可)
 * - 個別操作は task を読んでから AuthorizationGuard (所有者 or admin) を通す
 * - 拒否は設定された DenialPolicy で 403 / 404 に変換
 */
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;

use crate::{
    api::v1::{
        dto::tasks::{
            CreateTaskRequest, DEFAULT_STATUS, ListTasksQuery, TaskResponse, UpdateTaskRequest,
        },
        extractors::CurrentIdentity,
    },
    error::AppError,
    repos::task_repo::{NewTask, TaskChanges, TaskRow},
    services::auth::Identity,
    state::AppState,
};

const LIST_LIMIT: i64 = 100;

fn validation_error(msg: &'static str) -> AppError {
    AppError::bad_request("VALIDATION_ERROR", msg)
}

async fn load_accessible(
    state: &AppState,
    identity: &Identity,
    task_id: i64,
) -> Result<TaskRow, AppError> {
    let row = state
        .tasks
        .get(task_id)
        .await?
        .ok_or(AppError::not_found("task"))?;

    state
        .guard
        .require_access(identity, row.owner_id)
        .map_err(|e| AppError::denied(e, state.guard.denial_policy(), "task"))?;

    Ok(row)
}

pub async fn list_tasks(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Query(query): Query<ListTasksQuery>,
) -> Result<Json<Vec<TaskResponse>>, AppError> {
    query.validate().map_err(validation_error)?;

    let rows = state
        .tasks
        .list_by_owner(identity.id, query.status.as_deref(), LIST_LIMIT)
        .await?;
    Ok(Json(
        rows.into_iter()
            .filter(|row| state.guard.can_access(&identity, row.owner_id))
            .map(TaskResponse::from)
            .collect(),
    ))
}

pub async fn create_task(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Json(req): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<TaskResponse>), AppError> {
    req.validate(Utc::now().date_naive())
        .map_err(validation_error)?;

    let (Some(title), Some(priority)) = (req.title, req.priority) else {
        return Err(validation_error("title and priority are required"));
    };

    let row = state
        .tasks
        .create(NewTask {
            title: title.trim().to_string(),
            description: req.description,
            priority,
            status: req.status.unwrap_or_else(|| DEFAULT_STATUS.to_string()),
            due_date: req.due_date,
            owner_id: identity.id,
            created_by: identity.username,
        })
        .await?;

    tracing::info!(task_id = row.id, user_id = identity.id, "task created");
    Ok((StatusCode::CREATED, Json(row.into())))
}

pub async fn get_task(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(task_id): Path<i64>,
) -> Result<Json<TaskResponse>, AppError> {
    let row = load_accessible(&state, &identity, task_id).await?;
    Ok(Json(row.into()))
}

pub async fn update_task(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(task_id): Path<i64>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<Json<TaskResponse>, AppError> {
    req.validate(Utc::now().date_naive())
        .map_err(validation_error)?;

    load_accessible(&state, &identity, task_id).await?;

    let changes = TaskChanges {
        title: req.title.map(|t| t.trim().to_string()),
        description: req.description,
        priority: req.priority,
        status: req.status,
        due_date: req.due_date,
        updated_by: identity.username,
    };

    // 直前の確認と更新の間に削除された場合も 404
    let row = state
        .tasks
        .update(task_id, changes)
        .await?
        .ok_or(AppError::not_found("task"))?;

    Ok(Json(row.into()))
}

pub async fn delete_task(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(task_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    load_accessible(&state, &identity, task_id).await?;

    if state.tasks.delete(task_id).await? {
        tracing::info!(task_id, user_id = identity.id, "task deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("task"))
    }
}
