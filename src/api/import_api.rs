// ==========================================
// Import API
// ==========================================
// Responsibility: entry point for UI / CLI consumers
// - preview a file without touching the database
// - run an import job (blocking or in the background)
// Every job gets its own connection.
// ==========================================

use crate::config::ImportSettings;
use crate::domain::TabularSource;
use crate::events::{CompositeEventSink, EventSink, FileEventSink, TracingEventSink};
use crate::importer::{
    FileLoader, ImportError, ImportJob, ImportJobHandle, PipelineResult, SourceOutcome,
};
use crate::repository::DestinationRepository;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// First rows of one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePreview {
    pub name: String,
    pub columns: Vec<String>,
    /// `None` marks a missing value
    pub rows: Vec<Vec<Option<String>>>,
    pub total_rows: usize,
}

impl SourcePreview {
    pub fn from_source(source: &TabularSource, n: usize) -> Self {
        let rows = source
            .preview(n)
            .iter()
            .map(|r| r.cells().iter().map(|c| c.as_str().map(str::to_string)).collect())
            .collect();
        Self {
            name: source.name().to_string(),
            columns: source.columns().to_vec(),
            rows,
            total_rows: source.row_count(),
        }
    }
}

/// Per-source line of an import report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReport {
    pub source_name: String,
    pub table_name: Option<String>,
    pub rows_inserted: usize,
    pub error: Option<String>,
}

impl From<&SourceOutcome> for SourceReport {
    fn from(outcome: &SourceOutcome) -> Self {
        match &outcome.result {
            Ok(result) => SourceReport {
                source_name: outcome.source_name.clone(),
                table_name: Some(result.table_name.clone()),
                rows_inserted: result.rows_inserted,
                error: None,
            },
            Err(err) => SourceReport {
                source_name: outcome.source_name.clone(),
                table_name: None,
                rows_inserted: 0,
                error: Some(err.to_string()),
            },
        }
    }
}

/// Serializable summary of one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub job_id: Uuid,
    pub file: String,
    pub sources: Vec<SourceReport>,
}

impl ImportReport {
    pub fn succeeded(&self) -> usize {
        self.sources.iter().filter(|s| s.error.is_none()).count()
    }

    pub fn failed(&self) -> usize {
        self.sources.len() - self.succeeded()
    }

    pub fn total_rows(&self) -> usize {
        self.sources.iter().map(|s| s.rows_inserted).sum()
    }
}

pub struct ImportApi {
    settings: ImportSettings,
    observers: Vec<Arc<dyn EventSink>>,
}

impl ImportApi {
    pub fn new(settings: ImportSettings) -> Self {
        Self {
            settings,
            observers: Vec::new(),
        }
    }

    /// Add a sink that receives every event of every job, after tracing and the log file.
    pub fn with_observer(mut self, observer: Arc<dyn EventSink>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn settings(&self) -> &ImportSettings {
        &self.settings
    }

    fn loader(&self) -> FileLoader {
        FileLoader::new(self.settings.loader_options())
    }

    fn event_sink(&self) -> Arc<dyn EventSink> {
        let tracing_sink: Arc<dyn EventSink> = Arc::new(TracingEventSink);
        let mut sink = CompositeEventSink::new(vec![tracing_sink]);
        if let Some(log_file) = &self.settings.log_file {
            sink.push(Arc::new(FileEventSink::new(log_file, self.settings.log_format)));
        }
        for observer in &self.observers {
            sink.push(observer.clone());
        }
        Arc::new(sink)
    }

    /// Load `path` and return the first `n` rows of every source (default from settings).
    pub fn preview_file<P: AsRef<Path>>(
        &self,
        path: P,
        n: Option<usize>,
    ) -> PipelineResult<Vec<SourcePreview>> {
        let n = n.unwrap_or(self.settings.preview_rows);
        let sources = self.loader().load(path)?;
        Ok(sources
            .iter()
            .map(|s| SourcePreview::from_source(s, n))
            .collect())
    }

    /// A job with a fresh connection to the destination database.
    pub fn new_job(&self) -> PipelineResult<ImportJob> {
        let repo = DestinationRepository::new(&self.settings.db_path_str())
            .map_err(|e| ImportError::ConnectionError(e.to_string()))?;
        Ok(ImportJob::new(Arc::new(repo), self.loader(), self.event_sink()))
    }

    /// Import `path` on the calling thread.
    pub fn import_file<P: AsRef<Path>>(&self, path: P) -> PipelineResult<ImportReport> {
        let path = path.as_ref();
        let job = self.new_job()?;
        info!(
            job_id = %job.id(),
            path = %path.display(),
            db = %self.settings.db_path.display(),
            "starting import"
        );

        let outcomes = job.run(path)?;
        Ok(ImportReport {
            job_id: job.id(),
            file: path.display().to_string(),
            sources: outcomes.iter().map(SourceReport::from).collect(),
        })
    }

    /// Import `path` on the tokio blocking pool.
    pub fn spawn_import(&self, path: impl Into<PathBuf>) -> PipelineResult<ImportJobHandle> {
        let job = self.new_job()?;
        Ok(job.spawn(path))
    }
}

/// Missing cells render as an empty string.
pub fn display_cell(cell: &Option<String>) -> &str {
    cell.as_deref().unwrap_or("")
}
