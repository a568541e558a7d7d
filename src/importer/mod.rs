// ==========================================
// Tabular Import - Import pipeline
// ==========================================
// path -> FileLoader -> [TabularSource]
//      -> SchemaInferencer -> TableNamer -> TableManager -> Importer
// ImportJob sequences the stages for one input file.
// ==========================================

pub mod data_cleaner;
pub mod error;
pub mod file_loader;
pub mod import_job;
pub mod schema_inferencer;
pub mod source_importer;
pub mod table_manager;
pub mod table_namer;
pub mod value_parser;

// Re-export core types
pub use data_cleaner::DataCleaner;
pub use error::{ImportError, PipelineResult};
pub use file_loader::{
    CsvSourceParser, FileFormat, FileLoader, LoaderOptions, SourceParser, SpreadsheetSourceParser,
};
pub use import_job::{CancelToken, ImportJob, ImportJobHandle, SourceOutcome};
pub use schema_inferencer::SchemaInferencer;
pub use source_importer::Importer;
pub use table_manager::{DestinationColumn, TableHandle, TableManager};
pub use table_namer::TableNamer;
