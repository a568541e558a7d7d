// ==========================================
// Tabular Import - Import job
// ==========================================
// load -> for each source, in order:
//     infer -> name -> ensure_table -> import_source
// Load failures and ConnectionError abort the job.
// Every other failure is recorded for its source and the job moves on.
// Cancellation is observed between sources only.
// ==========================================

use crate::domain::{ImportResult, TabularSource};
use crate::events::{EventEmitter, EventSink};
use crate::importer::error::{ImportError, PipelineResult};
use crate::importer::file_loader::FileLoader;
use crate::importer::schema_inferencer::SchemaInferencer;
use crate::importer::source_importer::Importer;
use crate::importer::table_manager::TableManager;
use crate::importer::table_namer::TableNamer;
use crate::repository::DestinationRepository;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Outcome of one source within a job.
#[derive(Debug)]
pub struct SourceOutcome {
    pub source_name: String,
    pub result: Result<ImportResult, ImportError>,
}

impl SourceOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn rows_inserted(&self) -> usize {
        self.result.as_ref().map(|r| r.rows_inserted).unwrap_or(0)
    }
}

/// Shared stop flag, checked before each source.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct ImportJob {
    id: Uuid,
    loader: FileLoader,
    inferencer: SchemaInferencer,
    namer: TableNamer,
    tables: TableManager,
    importer: Importer,
    events: EventEmitter,
    cancel: CancelToken,
}

impl ImportJob {
    /// The job owns `repo` for its whole run; concurrent jobs need their own repositories.
    pub fn new(
        repo: Arc<DestinationRepository>,
        loader: FileLoader,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            loader,
            inferencer: SchemaInferencer::new(),
            namer: TableNamer::new(),
            tables: TableManager::new(repo.clone()),
            importer: Importer::new(repo),
            events: EventEmitter::new(id, sink),
            cancel: CancelToken::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Import every source of `path`.
    ///
    /// # Errors
    /// - load-time errors, before any database work
    /// - `ConnectionError`, after the sources already processed
    #[instrument(skip(self, path), fields(job_id = %self.id, path = %path.as_ref().display()))]
    pub fn run<P: AsRef<Path>>(&self, path: P) -> PipelineResult<Vec<SourceOutcome>> {
        let path = path.as_ref();
        let file = path.display().to_string();

        let sources = match self.loader.load(path) {
            Ok(sources) => sources,
            Err(err) => {
                self.events
                    .emit(self.events.error(format!("failed to load {file}: {err}")));
                return Err(err);
            }
        };
        self.events.emit(
            self.events
                .info(format!("loaded {} source(s) from {}", sources.len(), file)),
        );

        self.run_sources(sources)
    }

    /// Import already-loaded sources, in order.
    pub fn run_sources(&self, sources: Vec<TabularSource>) -> PipelineResult<Vec<SourceOutcome>> {
        let mut existing_names: HashSet<String> = HashSet::new();
        let mut outcomes = Vec::with_capacity(sources.len());

        for source in &sources {
            if self.cancel.is_cancelled() {
                warn!(source = source.name(), "job cancelled, source skipped");
                self.events.emit(
                    self.events
                        .warning(format!("import cancelled, {} skipped", source.name()))
                        .with_source(source.name()),
                );
                outcomes.push(SourceOutcome {
                    source_name: source.name().to_string(),
                    result: Err(ImportError::Cancelled(source.name().to_string())),
                });
                continue;
            }

            match self.import_one(source, &mut existing_names) {
                Err(err) if err.aborts_job() => return Err(err),
                result => outcomes.push(SourceOutcome {
                    source_name: source.name().to_string(),
                    result,
                }),
            }
        }

        let ok = outcomes.iter().filter(|o| o.is_ok()).count();
        let failed = outcomes.len() - ok;
        info!(succeeded = ok, failed, "import finished");
        self.events.emit(
            self.events
                .info(format!("import finished: {ok} succeeded, {failed} failed"))
                .with_rows(outcomes.iter().map(SourceOutcome::rows_inserted).sum()),
        );
        Ok(outcomes)
    }

    fn import_one(
        &self,
        source: &TabularSource,
        existing_names: &mut HashSet<String>,
    ) -> PipelineResult<ImportResult> {
        let schema = self.inferencer.infer(source);
        let table_name = self.namer.name(source, existing_names);
        existing_names.insert(table_name.clone());

        let table = match self.tables.ensure_table(&table_name, &schema) {
            Ok(table) => table,
            Err(err) => {
                self.events.emit(
                    self.events
                        .error(format!(
                            "cannot prepare table {} for {}: {}",
                            table_name,
                            source.name(),
                            err
                        ))
                        .with_source(source.name()),
                );
                return Err(err);
            }
        };

        self.importer.import_source(source, &table, &self.events)
    }

    /// Run on tokio's blocking pool. Must be called inside a runtime.
    pub fn spawn(self, path: impl Into<PathBuf>) -> ImportJobHandle {
        let path = path.into();
        let job_id = self.id;
        let cancel = self.cancel.clone();
        let join = tokio::task::spawn_blocking(move || self.run(path));
        ImportJobHandle {
            job_id,
            cancel,
            join,
        }
    }
}

/// Background job handle.
#[derive(Debug)]
pub struct ImportJobHandle {
    job_id: Uuid,
    cancel: CancelToken,
    join: JoinHandle<PipelineResult<Vec<SourceOutcome>>>,
}

impl ImportJobHandle {
    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// Stop before the next source; the current source still commits or rolls back.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub async fn wait(self) -> PipelineResult<Vec<SourceOutcome>> {
        match self.join.await {
            Ok(result) => result,
            Err(e) => Err(ImportError::Other(anyhow::anyhow!("import task failed: {e}"))),
        }
    }
}
