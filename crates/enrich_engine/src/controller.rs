use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use enrich_core::{
    plan_queue, reconcile, BatchRun, ItemOutcome, ItemStage, PhaseError, RunMode, RunPhase,
    RunSummary, WorkItem,
};
use enrich_logging::{enrich_debug, enrich_error, enrich_info, enrich_warn};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::enrich::Enricher;
use crate::events::{BatchEvent, EventSink, NoopEventSink};
use crate::export::{export_failed_items, ExportError, ExportSummary};
use crate::pacing::{PacingSettings, Permit, RateLimiter};
use crate::progress_store::{ProgressStore, ProgressStoreError};
use crate::resume::{AlwaysResume, ResumePolicy};
use crate::sink::RecordSink;
use crate::source::{load_work_items, SourceColumns, SourceError};

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub progress_path: PathBuf,
    pub failed_export_path: PathBuf,
    pub columns: SourceColumns,
    pub pacing: PacingSettings,
    /// Upper bound on each enrichment or persistence call.
    pub call_timeout: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            progress_path: PathBuf::from("enrichment_progress.json"),
            failed_export_path: PathBuf::from("enrichment_failed.csv"),
            columns: SourceColumns::default(),
            pacing: PacingSettings::default(),
            call_timeout: Duration::from_secs(180),
        }
    }
}

/// Errors that stop a run. Item failures are never reported here.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("work source unreadable: {0}")]
    WorkSourceUnreadable(#[from] SourceError),
    #[error("progress store unavailable: {0}")]
    ProgressStoreUnavailable(#[from] ProgressStoreError),
    #[error("internal run state error: {0}")]
    InvalidTransition(#[from] PhaseError),
}

#[derive(Debug)]
pub struct RunReport {
    pub phase: RunPhase,
    pub summary: RunSummary,
    pub export: Result<ExportSummary, ExportError>,
}

impl RunReport {
    pub fn interrupted(&self) -> bool {
        self.phase == RunPhase::Interrupted
    }
}

/// Drives a work source through enrichment and persistence, one item at a
/// time, checkpointing progress after every item.
pub struct BatchController {
    settings: ControllerSettings,
    enricher: Arc<dyn Enricher>,
    sink: Arc<dyn RecordSink>,
    resume: Arc<dyn ResumePolicy>,
    events: Arc<dyn EventSink>,
    cancel: CancellationToken,
}

impl BatchController {
    pub fn new(
        settings: ControllerSettings,
        enricher: Arc<dyn Enricher>,
        sink: Arc<dyn RecordSink>,
    ) -> Self {
        Self {
            settings,
            enricher,
            sink,
            resume: Arc::new(AlwaysResume),
            events: Arc::new(NoopEventSink),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_resume_policy(mut self, resume: Arc<dyn ResumePolicy>) -> Self {
        self.resume = resume;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    /// Token that interrupts the run between items when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Fresh or resumed pass over the work source at `source`.
    pub async fn run(&self, source: &Path) -> Result<RunReport, BatchError> {
        self.execute(source, RunMode::Standard).await
    }

    /// Pass over the last failure export, with the failed set reset.
    pub async fn retry(&self) -> Result<RunReport, BatchError> {
        let source = self.settings.failed_export_path.clone();
        self.execute(&source, RunMode::Retry).await
    }

    pub async fn execute(&self, source: &Path, mode: RunMode) -> Result<RunReport, BatchError> {
        let mut run = BatchRun::new();
        self.events.emit(BatchEvent::PhaseChanged(run.phase()));

        let items = load_work_items(source, &self.settings.columns).map_err(|err| {
            enrich_error!("Cannot read work source {:?}: {}", source, err);
            BatchError::from(err)
        })?;
        let store = ProgressStore::new(&self.settings.progress_path);
        let previous = store
            .ensure_writable()
            .and_then(|()| store.load())
            .map_err(|err| {
                enrich_error!("Progress store {:?} unavailable: {}", store.path(), err);
                BatchError::from(err)
            })?;

        self.enter(&mut run, RunPhase::Reconciling)?;
        if let Some(previous) = &previous {
            self.events.emit(BatchEvent::PreviousProgress {
                completed: previous.completed().len(),
                failed: previous.failed().len(),
            });
        }
        let mut reconciled = reconcile(previous, mode, |state| self.resume.decide(state));
        if reconciled.changed {
            store.save(&mut reconciled.state)?;
        }
        enrich_info!(
            "Reconciled {:?} run (resumed: {}): {} completed, {} failed",
            mode,
            reconciled.resumed,
            reconciled.state.completed().len(),
            reconciled.state.failed().len()
        );
        run.set_progress(reconciled.state);

        let plan = plan_queue(&items, run.progress());
        self.events.emit(BatchEvent::Planned {
            total: items.len(),
            to_process: plan.queue.len(),
            skipped_completed: plan.skipped_completed.len(),
            skipped_failed: plan.skipped_failed.len(),
        });
        for name in &plan.skipped_failed {
            self.events.emit(BatchEvent::SkippedFailed { name: name.clone() });
        }

        if plan.is_empty() {
            enrich_info!("Nothing to process; all items already settled");
            self.enter(&mut run, RunPhase::Done)?;
            let (summary, export) = self.finish(&run, &items);
            return Ok(RunReport {
                phase: run.phase(),
                summary,
                export,
            });
        }

        self.enter(&mut run, RunPhase::Running)?;
        let interrupted = self.drive(&mut run, &items, &plan.queue, &store).await?;
        if interrupted {
            self.enter(&mut run, RunPhase::Interrupted)?;
            if mode == RunMode::Retry {
                let unattempted = plan.queue[run.attempted()..]
                    .iter()
                    .map(|&index| items[index].name.as_str());
                let restored = run.restore_unattempted(unattempted)?;
                if restored > 0 {
                    enrich_info!("Kept {} unattempted retry items as failed", restored);
                }
            }
            store.save(run.progress_mut())?;
            enrich_warn!("Interrupted after {} items; progress saved", run.attempted());
            self.events.emit(BatchEvent::Interrupted {
                processed: run.attempted(),
            });
        } else {
            self.enter(&mut run, RunPhase::Draining)?;
        }

        let (summary, export) = self.finish(&run, &items);
        if !interrupted {
            self.enter(&mut run, RunPhase::Done)?;
        }
        Ok(RunReport {
            phase: run.phase(),
            summary,
            export,
        })
    }

    /// Process the queue. Returns `true` when interrupted before it ran out.
    async fn drive(
        &self,
        run: &mut BatchRun,
        items: &[WorkItem],
        queue: &[usize],
        store: &ProgressStore,
    ) -> Result<bool, BatchError> {
        let mut limiter = RateLimiter::new(self.settings.pacing.clone());
        let of = queue.len();

        for (offset, &source_index) in queue.iter().enumerate() {
            let position = offset + 1;
            if limiter.acquire(&self.cancel).await == Permit::Cancelled {
                return Ok(true);
            }

            let item = &items[source_index];
            self.events.emit(BatchEvent::ItemStarted {
                position,
                of,
                source_index,
                name: item.name.clone(),
            });

            let outcome = self.process_item(source_index, item).await;
            match &outcome {
                ItemOutcome::Completed { .. } => {
                    enrich_info!("[{}/{}] enriched and saved {:?}", position, of, outcome.name())
                }
                ItemOutcome::Failed { failure, .. } => enrich_warn!(
                    "[{}/{}] {} (reached {:?})",
                    position,
                    of,
                    failure,
                    failure.stage_reached()
                ),
            }
            run.record(&outcome)?;
            store.save(run.progress_mut()).map_err(|err| {
                enrich_error!("Progress checkpoint failed after {:?}: {}", item.name, err);
                BatchError::from(err)
            })?;
            self.stage(item, outcome.stage());
            self.events.emit(BatchEvent::ItemFinished {
                position,
                of,
                outcome,
            });

            if position < of && limiter.is_checkpoint(position) {
                enrich_info!("Batch checkpoint after {} items", position);
                self.events.emit(BatchEvent::Checkpoint {
                    processed: position,
                    cooldown: limiter.settings().cooldown,
                });
                if limiter.cooldown(&self.cancel).await == Permit::Cancelled {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Enrich then persist one item. Every failure ends up in the outcome.
    async fn process_item(&self, source_index: usize, item: &WorkItem) -> ItemOutcome {
        let timeout = self.settings.call_timeout;

        let record = match tokio::time::timeout(timeout, self.enricher.enrich(item)).await {
            Ok(Ok(record)) => record,
            Ok(Err(err)) => {
                return ItemOutcome::enrichment_failed(source_index, &item.name, err.to_string())
            }
            Err(_) => {
                return ItemOutcome::enrichment_failed(
                    source_index,
                    &item.name,
                    format!("timed out after {timeout:?}"),
                )
            }
        };
        self.stage(item, ItemStage::Enriched);

        match tokio::time::timeout(timeout, self.sink.persist(item, &record)).await {
            Ok(Ok(())) => {
                self.stage(item, ItemStage::Persisted);
                ItemOutcome::completed(source_index, &item.name)
            }
            Ok(Err(err)) => {
                ItemOutcome::persistence_failed(source_index, &item.name, err.to_string())
            }
            Err(_) => ItemOutcome::persistence_failed(
                source_index,
                &item.name,
                format!("timed out after {timeout:?}"),
            ),
        }
    }

    /// Export failures and summarize. Runs on completion and on interruption.
    fn finish(
        &self,
        run: &BatchRun,
        items: &[WorkItem],
    ) -> (RunSummary, Result<ExportSummary, ExportError>) {
        let export = export_failed_items(
            &self.settings.failed_export_path,
            items,
            run.progress().failed(),
            &self.settings.columns,
        );
        match &export {
            Ok(summary) => self.events.emit(BatchEvent::Exported {
                path: summary.path.clone(),
                count: summary.count,
            }),
            Err(err) => {
                enrich_error!(
                    "Failed to export failed items to {:?}: {}",
                    self.settings.failed_export_path,
                    err
                );
                self.events.emit(BatchEvent::ExportFailed {
                    message: err.to_string(),
                });
            }
        }

        let summary = run.summary(items);
        enrich_info!(
            "Run {}: {}/{} completed, {} failed ({:.1}%)",
            run.phase(),
            summary.completed,
            summary.total,
            summary.failed,
            summary.success_rate()
        );
        self.events.emit(BatchEvent::Finished(summary.clone()));
        (summary, export)
    }

    fn enter(&self, run: &mut BatchRun, phase: RunPhase) -> Result<(), PhaseError> {
        run.advance(phase)?;
        enrich_debug!("Run phase -> {}", phase);
        self.events.emit(BatchEvent::PhaseChanged(phase));
        Ok(())
    }

    fn stage(&self, item: &WorkItem, stage: ItemStage) {
        self.events.emit(BatchEvent::ItemStage {
            name: item.name.clone(),
            stage,
        });
    }
}
