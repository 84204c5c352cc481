/*
 * Responsibility
 * - repo が上位に伝える意味の定義
 * - unique 制約違反は Conflict (どの項目が重複したか) として区別する
 */
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("{field} already exists")]
    Conflict { field: &'static str },
    #[error("db error")]
    Db(#[from] sqlx::Error),
}

impl RepoError {
    /// unique violation → Conflict、それ以外は Db のまま
    pub fn from_unique(err: sqlx::Error, field_of: impl Fn(&str) -> &'static str) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                let field = field_of(db_err.constraint().unwrap_or_default());
                return RepoError::Conflict { field };
            }
        }
        RepoError::Db(err)
    }
}
