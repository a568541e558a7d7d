// ==========================================
// Tabular Import - Per-source import result
// ==========================================

use serde::{Deserialize, Serialize};

/// Successful load of one TabularSource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    pub source_name: String,
    pub table_name: String,
    pub rows_inserted: usize,
    /// false when the rows went into a table that already existed
    pub table_created: bool,
}
