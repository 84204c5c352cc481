//! Test doubles shared by unit tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, OnceLock};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::repos::error::RepoError;
use crate::repos::task_repo::{NewTask, TaskChanges, TaskRow, TaskStore};
use crate::services::auth::password::hash_password;
use crate::services::auth::resolver::{NewUser, UserRecord, UserStore};

pub const TEST_SECRET: &str = "test-secret-key-that-is-long-enough-for-testing";

/// In-memory user store that counts lookups.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<String, UserRecord>>,
    lookups: AtomicUsize,
    failing: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: UserRecord) {
        self.users
            .lock()
            .unwrap()
            .insert(record.username.clone(), record);
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn fail_lookups(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepoError::Db(sqlx::Error::PoolTimedOut));
        }

        Ok(self.users.lock().unwrap().get(username).cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<UserRecord, RepoError> {
        let mut users = self.users.lock().unwrap();
        if users.contains_key(&user.username) {
            return Err(RepoError::Conflict { field: "username" });
        }
        if users.values().any(|u| u.email == user.email) {
            return Err(RepoError::Conflict { field: "email" });
        }

        let id = users.values().map(|u| u.id).max().unwrap_or(0) + 1;
        let record = UserRecord {
            id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            roles: user.roles,
            enabled: true,
        };
        users.insert(record.username.clone(), record.clone());
        Ok(record)
    }
}

pub fn user_record(id: i64, username: &str, roles: &[&str]) -> UserRecord {
    UserRecord {
        id,
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password_hash: default_password_hash().to_string(),
        roles: roles.iter().map(|r| r.to_string()).collect(),
        enabled: true,
    }
}

/// Hash of `"password"`, computed once per test binary.
pub fn default_password_hash() -> &'static str {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| hash_password("password").unwrap())
}

/// In-memory task store keyed by id.
#[derive(Debug, Default)]
pub struct MemoryTaskStore {
    tasks: Mutex<BTreeMap<i64, TaskRow>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, row: TaskRow) {
        self.tasks.lock().unwrap().insert(row.id, row);
    }

    pub fn contains(&self, task_id: i64) -> bool {
        self.tasks.lock().unwrap().contains_key(&task_id)
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn list_by_owner(
        &self,
        owner_id: i64,
        status: Option<&str>,
        limit: i64,
    ) -> Result<Vec<TaskRow>, RepoError> {
        let tasks = self.tasks.lock().unwrap();
        Ok(tasks
            .values()
            .rev()
            .filter(|t| t.owner_id == owner_id)
            .filter(|t| status.is_none_or(|s| t.status == s))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn get(&self, task_id: i64) -> Result<Option<TaskRow>, RepoError> {
        Ok(self.tasks.lock().unwrap().get(&task_id).cloned())
    }

    async fn create(&self, task: NewTask) -> Result<TaskRow, RepoError> {
        let mut tasks = self.tasks.lock().unwrap();
        let id = tasks.keys().next_back().copied().unwrap_or(0) + 1;
        let now = Utc::now();
        let row = TaskRow {
            id,
            title: task.title,
            description: task.description,
            priority: task.priority,
            status: task.status,
            due_date: task.due_date,
            owner_id: task.owner_id,
            created_at: now,
            updated_at: now,
        };
        tasks.insert(id, row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        task_id: i64,
        changes: TaskChanges,
    ) -> Result<Option<TaskRow>, RepoError> {
        let mut tasks = self.tasks.lock().unwrap();
        let Some(row) = tasks.get_mut(&task_id) else {
            return Ok(None);
        };
        if let Some(title) = changes.title {
            row.title = title;
        }
        if let Some(description) = changes.description {
            row.description = Some(description);
        }
        if let Some(priority) = changes.priority {
            row.priority = priority;
        }
        if let Some(status) = changes.status {
            row.status = status;
        }
        if let Some(due_date) = changes.due_date {
            row.due_date = Some(due_date);
        }
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn delete(&self, task_id: i64) -> Result<bool, RepoError> {
        Ok(self.tasks.lock().unwrap().remove(&task_id).is_some())
    }
}

pub fn task_row(id: i64, owner_id: i64, title: &str) -> TaskRow {
    let created: DateTime<Utc> = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
    TaskRow {
        id,
        title: title.to_string(),
        description: None,
        priority: "MEDIUM".to_string(),
        status: "TODO".to_string(),
        due_date: None,
        owner_id,
        created_at: created,
        updated_at: created,
    }
}
