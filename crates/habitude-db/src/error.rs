use habitude_core::Violation;
use thiserror::Error;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    /// One or more habit rules failed; carries every violation found.
    #[error("habit validation failed")]
    Invalid(Vec<Violation>),

    /// `linked_habit` does not resolve to a habit owned by the same user.
    #[error("linked habit not found")]
    LinkedHabitNotFound,

    #[error("record not found")]
    NotFound,

    /// UNIQUE violation on the email column — raced or repeated
    /// registration of the same address.
    #[error("email already registered")]
    DuplicateEmail,

    #[error("database lock poisoned")]
    LockPoisoned,

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}
