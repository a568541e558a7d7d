// ==========================================
// Tabular Import - Event sinks
// ==========================================
// ImportJob and Importer publish ImportEvent through an explicit
// EventSink handle; observers and the durable log are just sinks.
// ==========================================

use crate::domain::{EventLevel, ImportEvent};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

/// Receives events in emission order.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &ImportEvent);
}

// ==========================================
// Log line format
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}' (expected text or json)")),
        }
    }
}

// ==========================================
// Sinks
// ==========================================

#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
    fn emit(&self, _event: &ImportEvent) {}
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: &ImportEvent) {
        let job_id = event.job_id.to_string();
        let source = event.source.as_deref().unwrap_or("-");
        match event.level {
            EventLevel::Info => tracing::info!(
                job_id = %job_id,
                source,
                rows = ?event.rows_affected,
                "{}",
                event.message
            ),
            EventLevel::Warning => tracing::warn!(job_id = %job_id, source, "{}", event.message),
            EventLevel::Error => tracing::error!(job_id = %job_id, source, "{}", event.message),
        }
    }
}

/// Append-only durable log.
#[derive(Debug)]
pub struct FileEventSink {
    path: PathBuf,
    format: LogFormat,
    lock: Mutex<()>,
}

impl FileEventSink {
    pub fn new(path: impl AsRef<Path>, format: LogFormat) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            format,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn format_line(&self, event: &ImportEvent) -> String {
        match self.format {
            LogFormat::Text => event.to_log_line(),
            LogFormat::Json => {
                serde_json::to_string(event).unwrap_or_else(|_| event.to_log_line())
            }
        }
    }

    fn append_line(&self, line: &str) -> std::io::Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")
    }
}

impl EventSink for FileEventSink {
    fn emit(&self, event: &ImportEvent) {
        if let Err(e) = self.append_line(&self.format_line(event)) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to append import log");
        }
    }
}

/// Live observer feed. Events are dropped once the receiver is gone.
#[derive(Debug, Clone)]
pub struct ChannelEventSink {
    tx: UnboundedSender<ImportEvent>,
}

impl ChannelEventSink {
    pub fn new() -> (Self, UnboundedReceiver<ImportEvent>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: &ImportEvent) {
        let _ = self.tx.send(event.clone());
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<ImportEvent>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ImportEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn count(&self, level: EventLevel) -> usize {
        self.events().iter().filter(|e| e.level == level).count()
    }
}

impl EventSink for MemoryEventSink {
    fn emit(&self, event: &ImportEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Fans every event out to a list of sinks, in list order.
#[derive(Default)]
pub struct CompositeEventSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl CompositeEventSink {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }

    pub fn push(&mut self, sink: Arc<dyn EventSink>) {
        self.sinks.push(sink);
    }
}

impl fmt::Debug for CompositeEventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeEventSink")
            .field("sinks_len", &self.sinks.len())
            .finish()
    }
}

impl EventSink for CompositeEventSink {
    fn emit(&self, event: &ImportEvent) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}

// ==========================================
// EventEmitter
// ==========================================

/// Sink handle bound to one job id.
#[derive(Clone)]
pub struct EventEmitter {
    job_id: Uuid,
    sink: Arc<dyn EventSink>,
}

impl EventEmitter {
    pub fn new(job_id: Uuid, sink: Arc<dyn EventSink>) -> Self {
        Self { job_id, sink }
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    pub fn info(&self, message: impl Into<String>) -> ImportEvent {
        ImportEvent::info(self.job_id, message)
    }

    pub fn warning(&self, message: impl Into<String>) -> ImportEvent {
        ImportEvent::warning(self.job_id, message)
    }

    pub fn error(&self, message: impl Into<String>) -> ImportEvent {
        ImportEvent::error(self.job_id, message)
    }

    pub fn emit(&self, event: ImportEvent) {
        self.sink.emit(&event);
    }
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("job_id", &self.job_id)
            .finish()
    }
}
