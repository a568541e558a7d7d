// ==========================================
// Tabular Import - Configuration layer
// ==========================================
// Responsibility: runtime settings for the importer and its consumers
// Storage: environment variables (no persisted configuration)
// ==========================================

pub mod import_settings;

pub use import_settings::{default_db_path, env_keys, ConfigError, ImportSettings};
