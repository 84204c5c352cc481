/*
 * Responsibility
 * - tasks CRUD (所有者チェックは呼び出し側 = handler で AuthorizationGuard を通す)
 * - user_id (owner) の FK (CASCADE) 前提
 * - handler は TaskStore trait 越しに使う (PgTaskStore が本番実装)
 */
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use crate::repos::error::RepoError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TaskRow {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub priority: String,
    pub status: String,
    pub due_date: Option<NaiveDate>,

    #[sqlx(rename = "user_id")]
    pub owner_id: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Task to insert. `owner_id` and `created_by` always come from the caller's identity.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: String,
    pub status: String,
    pub due_date: Option<NaiveDate>,
    pub owner_id: i64,
    pub created_by: String,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub updated_by: String,
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn list_by_owner(
        &self,
        owner_id: i64,
        status: Option<&str>,
        limit: i64,
    ) -> Result<Vec<TaskRow>, RepoError>;

    async fn get(&self, task_id: i64) -> Result<Option<TaskRow>, RepoError>;

    async fn create(&self, task: NewTask) -> Result<TaskRow, RepoError>;

    /// `None` when the task no longer exists.
    async fn update(
        &self,
        task_id: i64,
        changes: TaskChanges,
    ) -> Result<Option<TaskRow>, RepoError>;

    async fn delete(&self, task_id: i64) -> Result<bool, RepoError>;
}

pub async fn list_by_owner(
    db: &PgPool,
    owner_id: i64,
    status: Option<&str>,
    limit: i64,
) -> Result<Vec<TaskRow>, RepoError> {
    let rows = sqlx::query_as::<_, TaskRow>(
        r#"
        SELECT
            id, title, description, priority, status, due_date, user_id, created_at, updated_at
        FROM tasks
        WHERE user_id = $1
          AND ($2::text IS NULL OR status = $2)
        ORDER BY id DESC
        LIMIT $3
        "#,
    )
    .bind(owner_id)
    .bind(status)
    .bind(limit)
    .fetch_all(db)
    .await?;

    Ok(rows)
}

pub async fn get(db: &PgPool, task_id: i64) -> Result<Option<TaskRow>, RepoError> {
    let row = sqlx::query_as::<_, TaskRow>(
        r#"
        SELECT
            id, title, description, priority, status, due_date, user_id, created_at, updated_at
        FROM tasks
        WHERE id = $1
        "#,
    )
    .bind(task_id)
    .fetch_optional(db)
    .await?;

    Ok(row)
}

pub async fn create(db: &PgPool, task: &NewTask) -> Result<TaskRow, RepoError> {
    let row = sqlx::query_as::<_, TaskRow>(
        r#"
        INSERT INTO tasks
            (title, description, priority, status, due_date, user_id, created_by, updated_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
        RETURNING
            id, title, description, priority, status, due_date, user_id, created_at, updated_at
        "#,
    )
    .bind(&task.title)
    .bind(&task.description)
    .bind(&task.priority)
    .bind(&task.status)
    .bind(task.due_date)
    .bind(task.owner_id)
    .bind(&task.created_by)
    .fetch_one(db)
    .await?;

    Ok(row)
}

pub async fn update(
    db: &PgPool,
    task_id: i64,
    changes: &TaskChanges,
) -> Result<Option<TaskRow>, RepoError> {
    let row = sqlx::query_as::<_, TaskRow>(
        r#"
        UPDATE tasks
        SET
            title = COALESCE($2, title),
            description = COALESCE($3, description),
            priority = COALESCE($4, priority),
            status = COALESCE($5, status),
            due_date = COALESCE($6, due_date),
            updated_by = $7,
            updated_at = now()
        WHERE id = $1
        RETURNING
            id, title, description, priority, status, due_date, user_id, created_at, updated_at
        "#,
    )
    .bind(task_id)
    .bind(&changes.title)
    .bind(&changes.description)
    .bind(&changes.priority)
    .bind(&changes.status)
    .bind(changes.due_date)
    .bind(&changes.updated_by)
    .fetch_optional(db)
    .await?;

    Ok(row)
}

pub async fn delete(db: &PgPool, task_id: i64) -> Result<bool, RepoError> {
    let result = sqlx::query(
        r#"
        DELETE FROM tasks
        WHERE id = $1
        "#,
    )
    .bind(task_id)
    .execute(db)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// `TaskStore` backed by PostgreSQL.
#[derive(Clone, Debug)]
pub struct PgTaskStore {
    pool: PgPool,
}

impl PgTaskStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn list_by_owner(
        &self,
        owner_id: i64,
        status: Option<&str>,
        limit: i64,
    ) -> Result<Vec<TaskRow>, RepoError> {
        list_by_owner(&self.pool, owner_id, status, limit).await
    }

    async fn get(&self, task_id: i64) -> Result<Option<TaskRow>, RepoError> {
        get(&self.pool, task_id).await
    }

    async fn create(&self, task: NewTask) -> Result<TaskRow, RepoError> {
        create(&self.pool, &task).await
    }

    async fn update(
        &self,
        task_id: i64,
        changes: TaskChanges,
    ) -> Result<Option<TaskRow>, RepoError> {
        update(&self.pool, task_id, &changes).await
    }

    async fn delete(&self, task_id: i64) -> Result<bool, RepoError> {
        delete(&self.pool, task_id).await
    }
}
