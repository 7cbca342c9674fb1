//! Database errors

use thiserror::Error;

/// Database errors
#[derive(Error, Debug)]
pub enum DbError {
    /// SQLx error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Migration error
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// Unique constraint violated
    #[error("conflict: {0}")]
    Conflict(String),

    /// Record not found
    #[error("record not found")]
    NotFound,

    /// Stored value could not be decoded into a domain type
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// Database result type
pub type DbResult<T> = Result<T, DbError>;

impl DbError {
    /// Map unique-violation errors to [`DbError::Conflict`]
    pub(crate) fn from_insert(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::Conflict(db.constraint().unwrap_or("unique").to_string())
            }
            _ => Self::Sqlx(err),
        }
    }
}
