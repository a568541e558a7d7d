// ==========================================
// Tabular Import - Import events
// ==========================================
// Append-only progress/log records emitted by ImportJob and Importer.
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    Info,
    Warning,
    Error,
}

impl EventLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventLevel::Info => "INFO",
            EventLevel::Warning => "WARNING",
            EventLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for EventLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One log/progress record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportEvent {
    /// Job that emitted the event
    pub job_id: Uuid,
    /// UTC emission time
    pub timestamp: DateTime<Utc>,
    pub level: EventLevel,
    /// Source name, when the event concerns a single source
    pub source: Option<String>,
    pub message: String,
    pub rows_affected: Option<usize>,
}

impl ImportEvent {
    pub fn new(job_id: Uuid, level: EventLevel, message: impl Into<String>) -> Self {
        Self {
            job_id,
            timestamp: Utc::now(),
            level,
            source: None,
            message: message.into(),
            rows_affected: None,
        }
    }

    pub fn info(job_id: Uuid, message: impl Into<String>) -> Self {
        Self::new(job_id, EventLevel::Info, message)
    }

    pub fn warning(job_id: Uuid, message: impl Into<String>) -> Self {
        Self::new(job_id, EventLevel::Warning, message)
    }

    pub fn error(job_id: Uuid, message: impl Into<String>) -> Self {
        Self::new(job_id, EventLevel::Error, message)
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_rows(mut self, rows: usize) -> Self {
        self.rows_affected = Some(rows);
        self
    }

    /// `YYYY-MM-DD HH:MM:SS UTC | LEVEL | message` line used by the durable log.
    pub fn to_log_line(&self) -> String {
        let mut line = format!(
            "{} UTC | {} | {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.level,
            self.message
        );
        if let Some(rows) = self.rows_affected {
            line.push_str(&format!(" (rows: {rows})"));
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_log_line_format() {
        let mut event = ImportEvent::info(Uuid::nil(), "imported orders").with_rows(3);
        event.timestamp = Utc.with_ymd_and_hms(2024, 3, 1, 8, 5, 9).unwrap();

        assert_eq!(
            event.to_log_line(),
            "2024-03-01 08:05:09 UTC | INFO | imported orders (rows: 3)"
        );
    }

    #[test]
    fn test_event_json_shape() {
        let event = ImportEvent::error(Uuid::nil(), "boom").with_source("Jan");
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["level"], "error");
        assert_eq!(json["source"], "Jan");
        assert!(json["rows_affected"].is_null());
    }
}
