// ==========================================
// Tabular Import - Source importer
// ==========================================
// One TabularSource -> one destination table, one transaction.
// Events: start (info), success (info + rows) or failure (error).
// ==========================================

use crate::domain::{CellValue, ImportResult, InferredType, TabularSource};
use crate::events::EventEmitter;
use crate::importer::error::{ImportError, PipelineResult};
use crate::importer::table_manager::{Affinity, DestinationColumn, TableHandle};
use crate::importer::value_parser::{parse_boolean, parse_float, parse_integer, parse_timestamp};
use crate::repository::{DestinationRepository, RepositoryError, RowRejection};
use rusqlite::types::Value;
use std::sync::Arc;
use tracing::{info, instrument};

/// Bind one cell for a destination column.
///
/// Missing becomes NULL (NOT NULL columns are enforced by SQLite).
/// TEXT / BLOB affinity columns store the raw text as read.
/// Other columns get the value coerced the way the column type demands, nothing else.
pub fn bind_cell(cell: &CellValue, column: &DestinationColumn) -> Result<Value, RowRejection> {
    let raw = match cell {
        CellValue::Missing => return Ok(Value::Null),
        CellValue::Value(raw) => raw,
    };
    if matches!(column.affinity, Affinity::Text | Affinity::Blob) {
        return Ok(Value::Text(raw.clone()));
    }

    let bound = match column.column_type {
        InferredType::Integer => parse_integer(raw).map(Value::Integer),
        InferredType::Float => parse_float(raw).map(Value::Real),
        InferredType::Boolean => parse_boolean(raw).map(|b| Value::Integer(i64::from(b))),
        InferredType::Timestamp => parse_timestamp(raw).map(|_| Value::Text(raw.clone())),
        InferredType::Text => Some(Value::Text(raw.clone())),
    };

    bound.ok_or_else(|| RowRejection {
        column: Some(column.name.clone()),
        message: format!("expected {}, found '{}'", column.column_type, raw),
    })
}

pub struct Importer {
    repo: Arc<DestinationRepository>,
}

impl Importer {
    pub fn new(repo: Arc<DestinationRepository>) -> Self {
        Self { repo }
    }

    /// Insert every row of `source` into `table`, or none of them.
    ///
    /// Emits exactly one error event when the call fails.
    #[instrument(skip_all, fields(source = source.name(), table = %table.name))]
    pub fn import_source(
        &self,
        source: &TabularSource,
        table: &TableHandle,
        events: &EventEmitter,
    ) -> PipelineResult<ImportResult> {
        events.emit(
            events
                .info(format!("importing {} into {}", source.name(), table.name))
                .with_source(source.name()),
        );

        match self.insert_all(source, table) {
            Ok(rows_inserted) => {
                info!(rows = rows_inserted, "source imported");
                events.emit(
                    events
                        .info(format!(
                            "imported {} row(s) from {} into {}",
                            rows_inserted,
                            source.name(),
                            table.name
                        ))
                        .with_source(source.name())
                        .with_rows(rows_inserted),
                );
                Ok(ImportResult {
                    source_name: source.name().to_string(),
                    table_name: table.name.clone(),
                    rows_inserted,
                    table_created: table.created,
                })
            }
            Err(err) => {
                events.emit(
                    events
                        .error(format!("import of {} failed: {}", source.name(), err))
                        .with_source(source.name()),
                );
                Err(err)
            }
        }
    }

    fn insert_all(&self, source: &TabularSource, table: &TableHandle) -> PipelineResult<usize> {
        let mut bindings = Vec::with_capacity(table.columns.len());
        for column in &table.columns {
            let idx = source.column_index(&column.source_name).ok_or_else(|| {
                ImportError::SchemaConflict {
                    table: table.name.clone(),
                    columns: vec![column.name.clone()],
                }
            })?;
            bindings.push((idx, column));
        }

        // Rows are bound lazily so a rejected row stops the scan.
        let rows = source.rows().iter().map(|record| {
            bindings
                .iter()
                .map(|(idx, column)| {
                    let cell = record.get(*idx).unwrap_or(&CellValue::Missing);
                    bind_cell(cell, column)
                })
                .collect::<Result<Vec<Value>, RowRejection>>()
        });

        self.repo
            .insert_rows(&table.name, &table.column_names(), rows)
            .map_err(|err| match err {
                RepositoryError::RowRejected {
                    row,
                    column,
                    message,
                } => ImportError::RowInsertError {
                    source_name: source.name().to_string(),
                    table: table.name.clone(),
                    row,
                    column,
                    message,
                },
                other => ImportError::from(other),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(column_type: InferredType) -> DestinationColumn {
        DestinationColumn {
            source_name: "c".to_string(),
            name: "c".to_string(),
            column_type,
            affinity: Affinity::of_declared(column_type.sql_type()),
            nullable: true,
        }
    }

    #[test]
    fn test_bind_cell_per_type() {
        assert_eq!(
            bind_cell(&"42".into(), &column(InferredType::Integer)),
            Ok(Value::Integer(42))
        );
        assert_eq!(
            bind_cell(&"2.5".into(), &column(InferredType::Float)),
            Ok(Value::Real(2.5))
        );
        assert_eq!(
            bind_cell(&"TRUE".into(), &column(InferredType::Boolean)),
            Ok(Value::Integer(1))
        );
        assert_eq!(
            bind_cell(&"2024-01-01".into(), &column(InferredType::Timestamp)),
            Ok(Value::Text("2024-01-01".to_string()))
        );
        assert_eq!(
            bind_cell(&" padded ".into(), &column(InferredType::Text)),
            Ok(Value::Text(" padded ".to_string()))
        );
        assert_eq!(
            bind_cell(&CellValue::Missing, &column(InferredType::Integer)),
            Ok(Value::Null)
        );
    }

    #[test]
    fn test_text_affinity_keeps_raw_value() {
        let mut text_column = column(InferredType::Integer);
        text_column.affinity = Affinity::Text;
        assert_eq!(
            bind_cell(&"007".into(), &text_column),
            Ok(Value::Text("007".to_string()))
        );

        text_column.column_type = InferredType::Boolean;
        assert_eq!(
            bind_cell(&"TRUE".into(), &text_column),
            Ok(Value::Text("TRUE".to_string()))
        );

        let mut untyped = column(InferredType::Float);
        untyped.affinity = Affinity::Blob;
        assert_eq!(
            bind_cell(&"1e3".into(), &untyped),
            Ok(Value::Text("1e3".to_string()))
        );
    }

    #[test]
    fn test_bind_cell_rejects_incompatible_value() {
        let rejection = bind_cell(&"abc".into(), &column(InferredType::Integer)).unwrap_err();
        assert_eq!(rejection.column.as_deref(), Some("c"));
        assert!(rejection.message.contains("expected integer"));
    }
}
