// ==========================================
// Tabular Import - TabularSource
// ==========================================
// One parsed sheet or file as an in-memory table.
// Invariant: columns are non-empty and unique, every record has
// exactly one cell per declared column.
// ==========================================

use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

/// Number of rows returned by `preview` when the caller has no preference.
pub const DEFAULT_PREVIEW_ROWS: usize = 10;

/// A single cell after missing-value normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CellValue {
    /// Empty cell, NA/NULL token or a not-a-number sentinel.
    Missing,
    /// Raw text as read from the file.
    Value(String),
}

impl CellValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Missing => None,
            CellValue::Value(v) => Some(v.as_str()),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, CellValue::Missing)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Value(value.to_string())
    }
}

/// One row, positionally aligned with `TabularSource::columns`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record(Vec<CellValue>);

impl Record {
    pub fn cells(&self) -> &[CellValue] {
        &self.0
    }

    pub fn get(&self, idx: usize) -> Option<&CellValue> {
        self.0.get(idx)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Construction failures of `TabularSource`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("source '{0}' declares no columns")]
    NoColumns(String),

    #[error("source '{source_name}' declares column '{column}' more than once")]
    DuplicateColumn { source_name: String, column: String },

    #[error("source '{source_name}' row {row}: expected {expected} cells, found {found}")]
    RowWidth {
        source_name: String,
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("source '{source_name}' row {row}: keys {keys:?} do not match the declared columns")]
    RowKeys {
        source_name: String,
        row: usize,
        keys: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabularSource {
    name: String,
    columns: Vec<String>,
    rows: Vec<Record>,
}

impl TabularSource {
    /// Build a source from positional rows.
    ///
    /// Row numbers in errors are 1-based data rows.
    pub fn new(
        name: impl Into<String>,
        columns: Vec<String>,
        rows: Vec<Vec<CellValue>>,
    ) -> Result<Self, SourceError> {
        let name = name.into();
        validate_columns(&name, &columns)?;

        let expected = columns.len();
        let mut records = Vec::with_capacity(rows.len());
        for (idx, cells) in rows.into_iter().enumerate() {
            if cells.len() != expected {
                return Err(SourceError::RowWidth {
                    source_name: name,
                    row: idx + 1,
                    expected,
                    found: cells.len(),
                });
            }
            records.push(Record(cells));
        }

        Ok(Self {
            name,
            columns,
            rows: records,
        })
    }

    /// Build a source from map-shaped records.
    ///
    /// Every record must carry exactly the declared column set.
    pub fn from_keyed_rows(
        name: impl Into<String>,
        columns: Vec<String>,
        rows: Vec<BTreeMap<String, CellValue>>,
    ) -> Result<Self, SourceError> {
        let name = name.into();
        validate_columns(&name, &columns)?;

        let mut positional = Vec::with_capacity(rows.len());
        for (idx, mut row) in rows.into_iter().enumerate() {
            let keys_match =
                row.len() == columns.len() && columns.iter().all(|c| row.contains_key(c));
            if !keys_match {
                return Err(SourceError::RowKeys {
                    source_name: name,
                    row: idx + 1,
                    keys: row.into_keys().collect(),
                });
            }
            let cells = columns
                .iter()
                .map(|c| row.remove(c).unwrap_or(CellValue::Missing))
                .collect();
            positional.push(cells);
        }

        Self::new(name, columns, positional)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Cell lookup by 0-based row index and column name.
    pub fn cell(&self, row: usize, column: &str) -> Option<&CellValue> {
        let col = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Iterate the values of one column in row order.
    pub fn column_values(&self, col: usize) -> impl Iterator<Item = &CellValue> + '_ {
        self.rows.iter().filter_map(move |r| r.get(col))
    }

    /// First `n` rows. Pure read.
    pub fn preview(&self, n: usize) -> &[Record] {
        &self.rows[..n.min(self.rows.len())]
    }

    /// Apply `f` to every present cell, turning values it rejects into `Missing`.
    pub fn map_values<F>(&self, mut f: F) -> Self
    where
        F: FnMut(&str) -> CellValue,
    {
        let rows = self
            .rows
            .iter()
            .map(|r| {
                Record(
                    r.0.iter()
                        .map(|c| match c {
                            CellValue::Missing => CellValue::Missing,
                            CellValue::Value(v) => f(v),
                        })
                        .collect(),
                )
            })
            .collect();

        Self {
            name: self.name.clone(),
            columns: self.columns.clone(),
            rows,
        }
    }
}

fn validate_columns(name: &str, columns: &[String]) -> Result<(), SourceError> {
    if columns.is_empty() {
        return Err(SourceError::NoColumns(name.to_string()));
    }
    let mut seen = HashSet::with_capacity(columns.len());
    for column in columns {
        if !seen.insert(column.as_str()) {
            return Err(SourceError::DuplicateColumn {
                source_name: name.to_string(),
                column: column.clone(),
            });
        }
    }
    Ok(())
}
