// ==========================================
// Tabular Import - Repository layer
// ==========================================
// Responsibility: all SQL against the destination database (rusqlite)
// Red line: no business rules, only data access
// ==========================================

pub mod destination_repo;
pub mod error;

pub use destination_repo::{
    quote_identifier, ColumnDefinition, DestinationRepository, ExistingColumn, RowRejection,
    TableState,
};
pub use error::{RepositoryError, RepositoryResult};
