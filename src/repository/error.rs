// ==========================================
// Tabular Import - Repository error types
// ==========================================
// Tool: thiserror derive
// ==========================================

use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== Connection errors =====
    #[error("database connection failed: {0}")]
    DatabaseConnectionError(String),

    #[error("failed to acquire database lock: {0}")]
    LockError(String),

    /// Transient: another connection holds the write lock
    #[error("database busy: {0}")]
    Busy(String),

    // ===== Statement errors =====
    #[error("database transaction failed: {0}")]
    DatabaseTransactionError(String),

    #[error("database query failed: {0}")]
    DatabaseQueryError(String),

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// A single row refused by the binder or by SQLite. `row` is 1-based.
    #[error("row {row} rejected{}: {message}", .column.as_ref().map(|c| format!(" (column {c})")).unwrap_or_default())]
    RowRejected {
        row: usize,
        column: Option<String>,
        message: String,
    },
}

impl RepositoryError {
    pub fn is_busy(&self) -> bool {
        matches!(self, RepositoryError::Busy(_))
    }
}

impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, msg) => {
                let text = msg.clone().unwrap_or_else(|| err.to_string());
                match e.code {
                    ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => {
                        RepositoryError::Busy(text)
                    }
                    ErrorCode::CannotOpen
                    | ErrorCode::NotADatabase
                    | ErrorCode::DatabaseCorrupt
                    | ErrorCode::SystemIoFailure
                    | ErrorCode::ReadOnly => RepositoryError::DatabaseConnectionError(text),
                    ErrorCode::ConstraintViolation => RepositoryError::ConstraintViolation(text),
                    _ => RepositoryError::DatabaseQueryError(text),
                }
            }
            _ => RepositoryError::DatabaseQueryError(err.to_string()),
        }
    }
}

/// Result alias
pub type RepositoryResult<T> = Result<T, RepositoryError>;
