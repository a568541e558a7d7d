// ==========================================
// Tabular Import - Pipeline error types
// ==========================================
// Load-time: UnsupportedFormat / ParseError / EmptySource (abort job)
// Table-level: SchemaConflict (abort source)
// Row-level: RowInsertError (abort source transaction)
// Infrastructure: ConnectionError (abort job)
// Tool: thiserror derive
// ==========================================

use crate::domain::SourceError;
use crate::repository::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    // ===== Load-time errors =====
    #[error("unsupported file format: {0} (expected .csv/.xlsx/.xlsm/.xlsb/.xls/.ods)")]
    UnsupportedFormat(String),

    #[error("failed to parse {file}: {message}")]
    ParseError { file: String, message: String },

    #[error("no columns found in {0}")]
    EmptySource(String),

    #[error("invalid source: {0}")]
    InvalidSource(#[from] SourceError),

    // ===== Table-level errors =====
    #[error("table '{table}' exists with a different schema; differing columns: {}", .columns.join(", "))]
    SchemaConflict { table: String, columns: Vec<String> },

    // ===== Row-level errors =====
    #[error("{}", row_insert_message(.source_name, .table, .row, .column, .message))]
    RowInsertError {
        source_name: String,
        table: String,
        /// 1-based data row
        row: usize,
        column: Option<String>,
        message: String,
    },

    // ===== Infrastructure errors =====
    #[error("database connection failed: {0}")]
    ConnectionError(String),

    #[error("database error: {0}")]
    DatabaseError(String),

    // ===== Control flow =====
    #[error("import cancelled before source '{0}' started")]
    Cancelled(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn row_insert_message(
    source: &str,
    table: &str,
    row: &usize,
    column: &Option<String>,
    message: &str,
) -> String {
    match column {
        Some(column) => format!(
            "source '{source}' row {row} column '{column}' rejected by table '{table}': {message}"
        ),
        None => format!("source '{source}' row {row} rejected by table '{table}': {message}"),
    }
}

impl ImportError {
    pub fn parse(file: impl Into<String>, message: impl ToString) -> Self {
        ImportError::ParseError {
            file: file.into(),
            message: message.to_string(),
        }
    }

    /// Structural failure raised before any table work.
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            ImportError::UnsupportedFormat(_)
                | ImportError::ParseError { .. }
                | ImportError::EmptySource(_)
                | ImportError::InvalidSource(_)
        )
    }

    /// Failure that stops the remaining sources of a job.
    pub fn aborts_job(&self) -> bool {
        self.is_load_error() || matches!(self, ImportError::ConnectionError(_))
    }
}

impl From<RepositoryError> for ImportError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::LockError(msg) | RepositoryError::DatabaseConnectionError(msg) => {
                ImportError::ConnectionError(msg)
            }
            other => ImportError::DatabaseError(other.to_string()),
        }
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::parse("csv input", err)
    }
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::parse("input file", err)
    }
}

impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::parse("workbook", err)
    }
}

/// Result alias for pipeline operations
pub type PipelineResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        assert!(ImportError::UnsupportedFormat("txt".into()).aborts_job());
        assert!(ImportError::EmptySource("a.csv".into()).is_load_error());
        assert!(ImportError::ConnectionError("gone".into()).aborts_job());

        let conflict = ImportError::SchemaConflict {
            table: "t".into(),
            columns: vec!["a".into()],
        };
        assert!(!conflict.aborts_job());
        assert!(!conflict.is_load_error());
    }

    #[test]
    fn test_row_insert_message_names_row_and_column() {
        let err = ImportError::RowInsertError {
            source_name: "orders".into(),
            table: "orders".into(),
            row: 5,
            column: Some("amount".into()),
            message: "expected integer, found 'abc'".into(),
        };
        let text = err.to_string();
        assert!(text.contains("row 5"));
        assert!(text.contains("'amount'"));
    }

    #[test]
    fn test_lock_error_maps_to_connection_error() {
        let err: ImportError = RepositoryError::LockError("poisoned".into()).into();
        assert!(matches!(err, ImportError::ConnectionError(_)));
    }
}
