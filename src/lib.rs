// ==========================================
// Tabular Import - Core library
// ==========================================
// CSV / spreadsheet files -> SQLite tables
// Stack: Rust + calamine + csv + rusqlite
// ==========================================

// ==========================================
// Modules
// ==========================================

// Domain layer - in-memory tables, schema, events
pub mod domain;

// Repository layer - destination SQL
pub mod repository;

// Import pipeline
pub mod importer;

// Event sinks (observers, durable log)
pub mod events;

// Configuration
pub mod config;

// Database infrastructure (connection setup / PRAGMAs)
pub mod db;

// Logging
pub mod logging;

// API layer - consumer entry point
pub mod api;

// ==========================================
// Re-exports
// ==========================================

pub use domain::{
    CellValue, ColumnSchema, EventLevel, ImportEvent, ImportResult, InferredType, TabularSource,
    DEFAULT_PREVIEW_ROWS,
};

pub use importer::{
    CancelToken, FileLoader, ImportError, ImportJob, ImportJobHandle, Importer, LoaderOptions,
    PipelineResult, SchemaInferencer, SourceOutcome, TableHandle, TableManager, TableNamer,
};

pub use events::{
    ChannelEventSink, CompositeEventSink, EventSink, FileEventSink, LogFormat, MemoryEventSink,
    NoOpEventSink, TracingEventSink,
};

pub use repository::DestinationRepository;

pub use config::ImportSettings;

pub use api::{ImportApi, ImportReport, SourcePreview};

// ==========================================
// Version
// ==========================================
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = "tabular-import";
