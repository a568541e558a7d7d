// ==========================================
// Tabular Import - Destination table repository
// ==========================================
// Responsibility: describe / create destination tables, transactional multi-row insert
// Red line: no naming or typing policy here, only SQL
// ==========================================

use crate::db::open_sqlite_connection;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, ErrorCode, TransactionBehavior};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Column of a table that already exists at the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingColumn {
    pub name: String,
    /// Declared type as written in the DDL, possibly empty
    pub declared_type: String,
    pub not_null: bool,
}

/// Column to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub name: String,
    pub sql_type: String,
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableState {
    Created,
    Existing(Vec<ExistingColumn>),
}

/// Refusal of a row before it reaches SQLite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowRejection {
    pub column: Option<String>,
    pub message: String,
}

/// Double-quoted SQL identifier.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

// ==========================================
// DestinationRepository
// ==========================================
pub struct DestinationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DestinationRepository {
    /// Open `db_path` with the unified connection PRAGMAs.
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(format!("{db_path}: {e}")))?;
        Ok(Self::from_connection(Arc::new(Mutex::new(conn))))
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// Columns of `table`, or `None` when it does not exist.
    pub fn describe_table(&self, table: &str) -> RepositoryResult<Option<Vec<ExistingColumn>>> {
        let conn = self.get_conn()?;
        Self::describe_table_tx(&conn, table)
    }

    fn describe_table_tx(
        conn: &Connection,
        table: &str,
    ) -> RepositoryResult<Option<Vec<ExistingColumn>>> {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_identifier(table)))?;
        let columns = stmt
            .query_map([], |row| {
                Ok(ExistingColumn {
                    name: row.get(1)?,
                    declared_type: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    not_null: row.get::<_, i64>(3)? != 0,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        if columns.is_empty() {
            Ok(None)
        } else {
            Ok(Some(columns))
        }
    }

    /// Check-then-create as one `BEGIN IMMEDIATE` unit.
    ///
    /// A concurrent creator either waits for the write lock and then sees
    /// the finished table, or gets `RepositoryError::Busy`.
    pub fn create_table_if_absent(
        &self,
        table: &str,
        columns: &[ColumnDefinition],
    ) -> RepositoryResult<TableState> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if let Some(existing) = Self::describe_table_tx(&tx, table)? {
            tx.commit()?;
            return Ok(TableState::Existing(existing));
        }

        let column_sql: Vec<String> = columns
            .iter()
            .map(|c| {
                let not_null = if c.nullable { "" } else { " NOT NULL" };
                format!("{} {}{}", quote_identifier(&c.name), c.sql_type, not_null)
            })
            .collect();
        let sql = format!(
            "CREATE TABLE {} ({})",
            quote_identifier(table),
            column_sql.join(", ")
        );
        debug!(table, sql = %sql, "creating table");

        tx.execute_batch(&sql)?;
        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(TableState::Created)
    }

    /// Insert every row in one transaction. Any failure rolls back all rows.
    ///
    /// Rows are numbered from 1 in the order `rows` yields them.
    pub fn insert_rows<I>(&self, table: &str, columns: &[String], rows: I) -> RepositoryResult<usize>
    where
        I: IntoIterator<Item = Result<Vec<Value>, RowRejection>>,
    {
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_identifier(table),
            columns
                .iter()
                .map(|c| quote_identifier(c))
                .collect::<Vec<_>>()
                .join(", "),
            placeholders.join(", ")
        );

        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut count = 0;
        {
            let mut stmt = tx.prepare(&sql)?;
            for (idx, row) in rows.into_iter().enumerate() {
                let row_no = idx + 1;
                let values = row.map_err(|r| RepositoryError::RowRejected {
                    row: row_no,
                    column: r.column,
                    message: r.message,
                })?;
                stmt.execute(params_from_iter(values.iter()))
                    .map_err(|e| classify_row_error(row_no, e))?;
                count += 1;
            }
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(count)
    }

    pub fn count_rows(&self, table: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let n: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_identifier(table)),
            [],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }

    /// User tables, sorted by name.
    pub fn table_names(&self) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }
}

/// Row-level failures become `RowRejected`; anything else keeps its class.
fn classify_row_error(row: usize, err: rusqlite::Error) -> RepositoryError {
    if let rusqlite::Error::SqliteFailure(e, msg) = &err {
        if matches!(e.code, ErrorCode::ConstraintViolation | ErrorCode::TypeMismatch) {
            let message = msg.clone().unwrap_or_else(|| err.to_string());
            return RepositoryError::RowRejected {
                row,
                column: constraint_column(&message),
                message,
            };
        }
    }
    RepositoryError::from(err)
}

/// `"NOT NULL constraint failed: orders.amount"` -> `Some("amount")`
fn constraint_column(message: &str) -> Option<String> {
    let (_, target) = message.split_once("failed: ")?;
    let first = target.split(',').next()?.trim();
    let column = first.rsplit('.').next()?.trim();
    if column.is_empty() || first.contains(' ') {
        None
    } else {
        Some(column.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_repo() -> DestinationRepository {
        let conn = Connection::open_in_memory().unwrap();
        DestinationRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    fn col(name: &str, sql_type: &str, nullable: bool) -> ColumnDefinition {
        ColumnDefinition {
            name: name.to_string(),
            sql_type: sql_type.to_string(),
            nullable,
        }
    }

    #[test]
    fn test_create_then_describe() {
        let repo = memory_repo();
        let columns = vec![col("id", "INTEGER", false), col("note", "TEXT", true)];

        assert_eq!(
            repo.create_table_if_absent("t", &columns).unwrap(),
            TableState::Created
        );
        match repo.create_table_if_absent("t", &columns).unwrap() {
            TableState::Existing(existing) => {
                assert_eq!(existing.len(), 2);
                assert_eq!(existing[0].declared_type, "INTEGER");
                assert!(existing[0].not_null);
                assert!(!existing[1].not_null);
            }
            other => panic!("expected existing table, got {other:?}"),
        }
        assert!(repo.describe_table("missing").unwrap().is_none());
    }

    #[test]
    fn test_insert_rolls_back_on_rejection() {
        let repo = memory_repo();
        repo.create_table_if_absent("t", &[col("a", "INTEGER", false)])
            .unwrap();
        let names = vec!["a".to_string()];

        let rows = vec![
            Ok(vec![Value::Integer(1)]),
            Ok(vec![Value::Null]),
            Ok(vec![Value::Integer(3)]),
        ];
        let err = repo.insert_rows("t", &names, rows).unwrap_err();

        match err {
            RepositoryError::RowRejected { row, column, .. } => {
                assert_eq!(row, 2);
                assert_eq!(column.as_deref(), Some("a"));
            }
            other => panic!("expected row rejection, got {other:?}"),
        }
        assert_eq!(repo.count_rows("t").unwrap(), 0);
    }

    #[test]
    fn test_binder_rejection_keeps_row_number() {
        let repo = memory_repo();
        repo.create_table_if_absent("t", &[col("a", "TEXT", true)])
            .unwrap();
        let rows = vec![
            Ok(vec![Value::Text("x".into())]),
            Err(RowRejection {
                column: Some("a".into()),
                message: "bad".into(),
            }),
        ];
        let err = repo
            .insert_rows("t", &["a".to_string()], rows)
            .unwrap_err();
        assert!(matches!(err, RepositoryError::RowRejected { row: 2, .. }));
        assert_eq!(repo.count_rows("t").unwrap(), 0);
    }

    #[test]
    fn test_quoting_allows_odd_names() {
        let repo = memory_repo();
        repo.create_table_if_absent("order", &[col("select", "TEXT", true)])
            .unwrap();
        let inserted = repo
            .insert_rows(
                "order",
                &["select".to_string()],
                vec![Ok(vec![Value::Text("v".into())])],
            )
            .unwrap();
        assert_eq!(inserted, 1);
        assert_eq!(repo.table_names().unwrap(), vec!["order".to_string()]);
    }

    #[test]
    fn test_constraint_column() {
        assert_eq!(
            constraint_column("NOT NULL constraint failed: orders.amount"),
            Some("amount".to_string())
        );
        assert_eq!(
            constraint_column("UNIQUE constraint failed: t.a, t.b"),
            Some("a".to_string())
        );
        assert_eq!(constraint_column("CHECK constraint failed: amount > 0"), None);
        assert_eq!(constraint_column("datatype mismatch"), None);
    }
}
