use thiserror::Error;

pub mod categories_db_operations;
pub mod comments_db_operations;
pub mod media_db_operations;
pub mod posts_db_operations;
pub mod profiles_db_operations;
pub mod programs_db_operations;
pub mod stats_db_operations;

#[derive(Error, Debug)]
pub enum DbError {
    // Shown to the user as-is, so the message stays the driver's own.
    #[error("{0}")]
    Rusqlite(#[from] rusqlite::Error),
    #[error("{0}")]
    Pool(#[from] r2d2::Error),
    #[error("Password hashing failed: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
    #[error("Item not found in database: {0}")]
    NotFound(String),
}

impl DbError {
    /// True when the failure is a UNIQUE constraint violation.
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            DbError::Rusqlite(rusqlite::Error::SqliteFailure(err, _))
                if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        )
    }
}

pub type DbResult<T> = Result<T, DbError>;

/// Generates a new primary key for any entity table.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Maps empty optional text to NULL.
pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}
