// ==========================================
// Tabular Import - Domain layer
// ==========================================
// Responsibility: in-memory tables, inferred schema, events, outcomes
// Red line: no file access, no database access
// ==========================================

pub mod event;
pub mod outcome;
pub mod schema;
pub mod source;

// Re-export core types
pub use event::{EventLevel, ImportEvent};
pub use outcome::ImportResult;
pub use schema::{ColumnSchema, InferredType};
pub use source::{CellValue, Record, SourceError, TabularSource, DEFAULT_PREVIEW_ROWS};
