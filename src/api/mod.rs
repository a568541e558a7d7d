// ==========================================
// Tabular Import - API layer
// ==========================================
// Responsibility: programmatic surface for UI / CLI consumers
// ==========================================

pub mod import_api;

pub use import_api::{display_cell, ImportApi, ImportReport, SourcePreview, SourceReport};
