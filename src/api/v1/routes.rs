/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - /health, /auth, /tasks
 * - 認証 middleware は app.rs で v1 全体に掛ける (匿名でも通過し、401 は extractor が返す)
 */
use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use crate::api::v1::handlers::{
    auth::{login, me, register},
    health::health,
    tasks::{create_task, delete_task, get_task, list_tasks, update_task},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
        .route("/tasks", get(list_tasks).post(create_task))
        .route(
            "/tasks/{task_id}",
            get(get_task).put(update_task).delete(delete_task),
        )
}
