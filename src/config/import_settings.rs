// ==========================================
// Tabular Import - Import settings
// ==========================================
// Source: environment variables with the TABULAR_IMPORT_ prefix
// Unset or blank variables fall back to the defaults below
// ==========================================

use crate::domain::DEFAULT_PREVIEW_ROWS;
use crate::events::LogFormat;
use crate::importer::LoaderOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Environment variable names
pub mod env_keys {
    pub const DB_PATH: &str = "TABULAR_IMPORT_DB_PATH";
    pub const LOG_FILE: &str = "TABULAR_IMPORT_LOG_FILE";
    pub const LOG_FORMAT: &str = "TABULAR_IMPORT_LOG_FORMAT";
    pub const CSV_DELIMITER: &str = "TABULAR_IMPORT_CSV_DELIMITER";
    pub const PREVIEW_ROWS: &str = "TABULAR_IMPORT_PREVIEW_ROWS";
    pub const MISSING_TOKENS: &str = "TABULAR_IMPORT_MISSING_TOKENS";
}

pub const DEFAULT_LOG_FILE: &str = "import.log";
const DATA_DIR_NAME: &str = "tabular-import";
const DB_FILE_NAME: &str = "import.db";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}' ({message})")]
    InvalidValue {
        key: String,
        value: String,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSettings {
    /// Destination SQLite database
    pub db_path: PathBuf,
    /// Durable event log; `None` disables it
    pub log_file: Option<PathBuf>,
    pub log_format: LogFormat,
    pub csv_delimiter: u8,
    pub preview_rows: usize,
    /// Extra tokens normalized to missing, on top of the built-in ones
    pub extra_missing_tokens: Vec<String>,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            log_file: Some(PathBuf::from(DEFAULT_LOG_FILE)),
            log_format: LogFormat::Text,
            csv_delimiter: b',',
            preview_rows: DEFAULT_PREVIEW_ROWS,
            extra_missing_tokens: Vec::new(),
        }
    }
}

/// `<user data dir>/tabular-import/import.db`, or `./import.db` when no data dir is known.
pub fn default_db_path() -> PathBuf {
    match dirs::data_local_dir() {
        Some(dir) => dir.join(DATA_DIR_NAME).join(DB_FILE_NAME),
        None => PathBuf::from(".").join(DB_FILE_NAME),
    }
}

impl ImportSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup (environment, map, ...).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut settings = Self::default();

        if let Some(path) = get(env_keys::DB_PATH) {
            settings.db_path = PathBuf::from(path);
        }

        if let Some(file) = get(env_keys::LOG_FILE) {
            settings.log_file = match file.to_ascii_lowercase().as_str() {
                "off" | "none" => None,
                _ => Some(PathBuf::from(file)),
            };
        }

        if let Some(format) = get(env_keys::LOG_FORMAT) {
            settings.log_format = format
                .parse()
                .map_err(|message| invalid(env_keys::LOG_FORMAT, &format, message))?;
        }

        if let Some(delimiter) = lookup(env_keys::CSV_DELIMITER).filter(|v| !v.is_empty()) {
            settings.csv_delimiter = parse_delimiter(&delimiter)?;
        }

        if let Some(rows) = get(env_keys::PREVIEW_ROWS) {
            settings.preview_rows = rows.parse::<usize>().map_err(|e| {
                invalid(env_keys::PREVIEW_ROWS, &rows, e.to_string())
            })?;
        }

        if let Some(tokens) = get(env_keys::MISSING_TOKENS) {
            settings.extra_missing_tokens = tokens
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
        }

        Ok(settings)
    }

    pub fn loader_options(&self) -> LoaderOptions {
        LoaderOptions {
            csv_delimiter: self.csv_delimiter,
            extra_missing_tokens: self.extra_missing_tokens.clone(),
        }
    }

    pub fn db_path_str(&self) -> String {
        self.db_path.to_string_lossy().to_string()
    }
}

/// Single ASCII byte, or the names `tab` / `\t`.
fn parse_delimiter(raw: &str) -> Result<u8, ConfigError> {
    match raw {
        "\t" | "\\t" | "tab" | "TAB" => return Ok(b'\t'),
        _ => {}
    }
    match raw.as_bytes() {
        [b] if b.is_ascii() => Ok(*b),
        _ => Err(invalid(
            env_keys::CSV_DELIMITER,
            raw,
            "expected a single ASCII character".to_string(),
        )),
    }
}

fn invalid(key: &str, value: &str, message: String) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(pairs: &[(&str, &str)]) -> Result<ImportSettings, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ImportSettings::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        let settings = settings_from(&[]).unwrap();
        assert_eq!(settings.csv_delimiter, b',');
        assert_eq!(settings.preview_rows, 10);
        assert_eq!(settings.log_file, Some(PathBuf::from("import.log")));
        assert!(settings.db_path.ends_with("import.db"));
    }

    #[test]
    fn test_overrides() {
        let settings = settings_from(&[
            (env_keys::DB_PATH, "/tmp/x.db"),
            (env_keys::LOG_FILE, "off"),
            (env_keys::LOG_FORMAT, "json"),
            (env_keys::CSV_DELIMITER, "\t"),
            (env_keys::PREVIEW_ROWS, "25"),
            (env_keys::MISSING_TOKENS, "-, n/d ,"),
        ])
        .unwrap();

        assert_eq!(settings.db_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(settings.log_file, None);
        assert_eq!(settings.log_format, LogFormat::Json);
        assert_eq!(settings.csv_delimiter, b'\t');
        assert_eq!(settings.preview_rows, 25);
        assert_eq!(settings.extra_missing_tokens, vec!["-", "n/d"]);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            settings_from(&[(env_keys::PREVIEW_ROWS, "many")]),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(settings_from(&[(env_keys::CSV_DELIMITER, ";;")]).is_err());
        assert!(settings_from(&[(env_keys::LOG_FORMAT, "xml")]).is_err());
        assert_eq!(
            settings_from(&[(env_keys::CSV_DELIMITER, ";")])
                .unwrap()
                .csv_delimiter,
            b';'
        );
    }
}
