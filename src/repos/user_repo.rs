/*
 * Responsibility
 * - users / user_roles テーブル向け SQLx 操作
 * - 認証で使う username 検索 (roles を集約して 1 行で返す)
 * - 登録: users + user_roles を 1 transaction で作成 (重複は RepoError::Conflict)
 * - DB エラーは RepoError に変換して返す
 */
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use crate::repos::error::RepoError;
use crate::services::auth::resolver::{NewUser, UserRecord, UserStore};

#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[sqlx(rename = "password")]
    pub password_hash: String,
    pub enabled: bool,
    pub roles: Vec<String>,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            roles: row.roles,
            enabled: row.enabled,
        }
    }
}

pub async fn find_by_username(db: &PgPool, username: &str) -> Result<Option<UserRow>, RepoError> {
    let row = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT
            u.id,
            u.username,
            u.email,
            u.password,
            u.enabled,
            COALESCE(
                array_agg(r.role) FILTER (WHERE r.role IS NOT NULL),
                '{}'
            ) AS roles
        FROM users u
        LEFT JOIN user_roles r ON r.user_id = u.id
        WHERE u.username = $1
        GROUP BY u.id
        "#,
    )
    .bind(username)
    .fetch_optional(db)
    .await?;

    Ok(row)
}

fn conflicting_field(constraint: &str) -> &'static str {
    if constraint.contains("email") {
        "email"
    } else {
        "username"
    }
}

pub async fn create(db: &PgPool, user: &NewUser) -> Result<UserRow, RepoError> {
    let mut tx = db.begin().await?;

    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO users (username, email, password, enabled)
        VALUES ($1, $2, $3, TRUE)
        RETURNING id
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.password_hash)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| RepoError::from_unique(e, conflicting_field))?;

    sqlx::query(
        r#"
        INSERT INTO user_roles (user_id, role)
        SELECT $1, UNNEST($2::text[])
        "#,
    )
    .bind(id)
    .bind(&user.roles)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(UserRow {
        id,
        username: user.username.clone(),
        email: user.email.clone(),
        password_hash: user.password_hash.clone(),
        enabled: true,
        roles: user.roles.clone(),
    })
}

/// `UserStore` backed by PostgreSQL.
#[derive(Clone, Debug)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        let row = find_by_username(&self.pool, username).await?;
        Ok(row.map(UserRecord::from))
    }

    async fn create_user(&self, user: NewUser) -> Result<UserRecord, RepoError> {
        let row = create(&self.pool, &user).await?;
        Ok(row.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_constraint_names_map_to_fields() {
        assert_eq!(conflicting_field("users_email_key"), "email");
        assert_eq!(conflicting_field("users_username_key"), "username");
        assert_eq!(conflicting_field(""), "username");
    }
}
