/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - auth: AuthService (token 検証 + identity 解決), guard: 所有者/admin 認可
 *   - tasks: TaskStore (本番は PgTaskStore、test では in-memory)
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use std::sync::Arc;

use crate::repos::task_repo::TaskStore;
use crate::services::auth::{AuthService, AuthorizationGuard};

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub guard: AuthorizationGuard,
    pub tasks: Arc<dyn TaskStore>,
}

impl AppState {
    pub fn new(auth: Arc<AuthService>, guard: AuthorizationGuard, tasks: Arc<dyn TaskStore>) -> Self {
        Self { auth, guard, tasks }
    }
}
