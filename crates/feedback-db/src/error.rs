use thiserror::Error;

pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("username is already taken")]
    DuplicateUsername,

    #[error("database lock poisoned")]
    LockPoisoned,

    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// True when `err` is SQLite rejecting a row for duplicating a primary or
/// unique key.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == rusqlite::ErrorCode::ConstraintViolation
                && (e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE)
        }
        _ => false,
    }
}
