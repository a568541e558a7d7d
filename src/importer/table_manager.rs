// ==========================================
// Tabular Import - Table manager
// ==========================================
// ensure_table(name, schema):
// - absent table: create it, one column per ColumnSchema
// - existing table: same column set with compatible types, else SchemaConflict
// - never alters or drops a table
// ==========================================

use crate::domain::{ColumnSchema, InferredType};
use crate::importer::error::{ImportError, PipelineResult};
use crate::importer::table_namer::{first_unused, sanitize_identifier};
use crate::repository::{
    ColumnDefinition, DestinationRepository, ExistingColumn, RepositoryError, TableState,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};

/// Destination column bound to a source column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationColumn {
    /// Column name in the TabularSource
    pub source_name: String,
    /// Column identifier in the destination table
    pub name: String,
    pub column_type: InferredType,
    /// Storage affinity of the destination column as declared
    pub affinity: Affinity,
    pub nullable: bool,
}

/// A destination table ready for inserts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableHandle {
    pub name: String,
    pub columns: Vec<DestinationColumn>,
    /// true when this call created the table
    pub created: bool,
}

impl TableHandle {
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

/// SQLite type affinity of a declared column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affinity {
    Integer,
    Text,
    Blob,
    Real,
    Numeric,
}

impl Affinity {
    /// SQLite's rules, applied in order.
    pub fn of_declared(declared: &str) -> Self {
        let t = declared.to_ascii_uppercase();
        if t.contains("INT") {
            Affinity::Integer
        } else if t.contains("CHAR") || t.contains("CLOB") || t.contains("TEXT") {
            Affinity::Text
        } else if t.contains("BLOB") || t.trim().is_empty() {
            Affinity::Blob
        } else if t.contains("REAL") || t.contains("FLOA") || t.contains("DOUB") {
            Affinity::Real
        } else {
            Affinity::Numeric
        }
    }

    /// Whether values of `inferred` fit this column without loss.
    pub fn accepts(&self, inferred: InferredType) -> bool {
        use InferredType::*;
        match self {
            Affinity::Text | Affinity::Blob => true,
            Affinity::Integer => matches!(inferred, Integer | Boolean),
            Affinity::Real => matches!(inferred, Integer | Float),
            Affinity::Numeric => !matches!(inferred, Text),
        }
    }
}

/// Destination identifiers for a schema, in schema order.
pub fn destination_columns(schema: &[ColumnSchema]) -> Vec<DestinationColumn> {
    let mut taken = HashSet::with_capacity(schema.len());
    schema
        .iter()
        .enumerate()
        .map(|(idx, col)| {
            let mut base = sanitize_identifier(&col.name);
            if base.is_empty() {
                base = format!("column_{}", idx + 1);
            }
            let name = first_unused(&base, &taken);
            taken.insert(name.clone());
            DestinationColumn {
                source_name: col.name.clone(),
                name,
                column_type: col.inferred_type,
                affinity: Affinity::of_declared(col.inferred_type.sql_type()),
                nullable: col.nullable,
            }
        })
        .collect()
}

pub struct TableManager {
    repo: Arc<DestinationRepository>,
}

impl TableManager {
    pub fn new(repo: Arc<DestinationRepository>) -> Self {
        Self { repo }
    }

    pub fn ensure_table(&self, name: &str, schema: &[ColumnSchema]) -> PipelineResult<TableHandle> {
        let columns = destination_columns(schema);
        let definitions: Vec<ColumnDefinition> = columns
            .iter()
            .map(|c| ColumnDefinition {
                name: c.name.clone(),
                sql_type: c.column_type.sql_type().to_string(),
                nullable: c.nullable,
            })
            .collect();

        let state = match self.repo.create_table_if_absent(name, &definitions) {
            Err(RepositoryError::Busy(msg)) => {
                warn!(table = name, reason = %msg, "destination busy, retrying table check once");
                self.repo.create_table_if_absent(name, &definitions)?
            }
            other => other?,
        };

        match state {
            TableState::Created => {
                info!(table = name, columns = columns.len(), "table created");
                Ok(TableHandle {
                    name: name.to_string(),
                    columns,
                    created: true,
                })
            }
            TableState::Existing(existing) => {
                let columns = reconcile(name, columns, &existing)?;
                info!(table = name, "existing table matches schema");
                Ok(TableHandle {
                    name: name.to_string(),
                    columns,
                    created: false,
                })
            }
        }
    }
}

/// Match wanted columns against an existing table.
///
/// SQLite identifiers are case-insensitive, so names compare lowercased.
fn reconcile(
    table: &str,
    wanted: Vec<DestinationColumn>,
    existing: &[ExistingColumn],
) -> PipelineResult<Vec<DestinationColumn>> {
    let by_name: HashMap<String, &ExistingColumn> = existing
        .iter()
        .map(|c| (c.name.to_lowercase(), c))
        .collect();
    let wanted_names: HashSet<String> = wanted.iter().map(|c| c.name.to_lowercase()).collect();

    let mut differing = Vec::new();
    let mut matched = Vec::with_capacity(wanted.len());
    for col in wanted {
        match by_name.get(&col.name.to_lowercase()) {
            None => differing.push(col.name.clone()),
            Some(found) if !Affinity::of_declared(&found.declared_type).accepts(col.column_type) => {
                warn!(
                    table,
                    column = %col.name,
                    inferred = %col.column_type,
                    declared = %found.declared_type,
                    "column type incompatible with existing table"
                );
                differing.push(col.name.clone());
            }
            Some(found) => matched.push(DestinationColumn {
                name: found.name.clone(),
                affinity: Affinity::of_declared(&found.declared_type),
                nullable: !found.not_null,
                ..col
            }),
        }
    }
    for col in existing {
        if !wanted_names.contains(&col.name.to_lowercase()) {
            differing.push(col.name.clone());
        }
    }

    if differing.is_empty() {
        Ok(matched)
    } else {
        Err(ImportError::SchemaConflict {
            table: table.to_string(),
            columns: differing,
        })
    }
}
