//! Batch job engine: submission, status reads and execution of one job.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{Map, Value};

use super::handlers::BatchHandlers;
use super::job::{BatchJob, JobOutcome, Progress};
use super::operation::{BatchOperation, ExecutionMode};
use super::repository::BatchJobRepository;
use crate::broadcast::{BatchPhase, BatchProgressEvent, ProgressReporter};
use crate::config::BatchConfig;
use crate::error::{panic_message, PdfSuiteError, Result};
use crate::worker::queue::{JobQueue, QueuedBatch};

#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub queue: String,
    pub timeout: Duration,
}

impl From<&BatchConfig> for BatchSettings {
    fn from(config: &BatchConfig) -> Self {
        Self {
            queue: config.queue.clone(),
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self::from(&BatchConfig::default())
    }
}

pub struct BatchEngine {
    repository: Arc<dyn BatchJobRepository>,
    queue: Arc<dyn JobQueue>,
    progress: Arc<dyn ProgressReporter>,
    settings: BatchSettings,
}

impl BatchEngine {
    pub fn new(
        repository: Arc<dyn BatchJobRepository>,
        queue: Arc<dyn JobQueue>,
        progress: Arc<dyn ProgressReporter>,
        settings: BatchSettings,
    ) -> Self {
        Self {
            repository,
            queue,
            progress,
            settings,
        }
    }

    pub fn settings(&self) -> &BatchSettings {
        &self.settings
    }

    /// Persists a `Queued` job and schedules it. Returns before execution
    /// starts.
    pub fn submit(
        &self,
        operation: &str,
        file_refs: Vec<String>,
        options: Map<String, Value>,
        owner: &str,
    ) -> Result<BatchJob> {
        let operation: BatchOperation = operation.parse()?;
        if file_refs.is_empty() {
            return Err(PdfSuiteError::validation("No files provided"));
        }

        let job = BatchJob::new(operation, file_refs, options, owner);
        self.repository.create(&job)?;

        self.progress.report(BatchProgressEvent::new(
            &job.id,
            &job.operation,
            BatchPhase::Queued,
            0,
            job.total_items,
            "Batch job queued",
        ));

        let queued = QueuedBatch {
            batch_id: job.id.clone(),
            queue: self.settings.queue.clone(),
            timeout: self.settings.timeout,
        };
        if let Err(e) = self.queue.enqueue(queued) {
            tracing::error!(batch_id = %job.id, error = %e, "failed to enqueue batch job");
            // Nothing will ever pick the job up, so close it out.
            if self.repository.start(&job.id)? {
                self.repository
                    .finish(&job.id, &JobOutcome::Failed(e.to_string()))?;
            }
            return Err(e.into());
        }

        tracing::info!(batch_id = %job.id, operation = %operation, items = job.total_items, "batch job submitted");
        Ok(job)
    }

    pub fn get_status(&self, id: &str) -> Result<BatchJob> {
        self.repository
            .get(id)?
            .ok_or_else(|| PdfSuiteError::not_found("Batch job not found"))
    }

    /// Runs a queued job to a terminal state. Returns `None` when the job was
    /// not queued (unknown, already running or finished).
    ///
    /// The first failing item ends the job: later items are not attempted and
    /// progress already recorded is kept.
    pub fn execute(
        &self,
        id: &str,
        handlers: &dyn BatchHandlers,
        timeout: Duration,
    ) -> Result<Option<JobOutcome>> {
        let _span = tracing::info_span!("batch.execute", batch_id = %id).entered();

        if !self.repository.start(id)? {
            tracing::info!("batch job is not queued, skipping");
            return Ok(None);
        }
        // From here on the job is `Processing`; every early return must
        // close it out.
        let job = match self.get_status(id) {
            Ok(job) => job,
            Err(e) => return Err(self.abandon(id, e)),
        };

        self.progress.report(BatchProgressEvent::new(
            &job.id,
            &job.operation,
            BatchPhase::Started,
            0,
            job.total_items,
            "Batch job started",
        ));

        let deadline = Instant::now() + timeout;
        let run = panic::catch_unwind(AssertUnwindSafe(|| {
            self.run(&job, handlers, deadline, timeout)
        }));
        let outcome = match run {
            Ok(Ok(())) => JobOutcome::Completed,
            Ok(Err(e)) => JobOutcome::Failed(e.to_string()),
            Err(payload) => JobOutcome::Failed(panic_message(payload.as_ref())),
        };

        if let JobOutcome::Failed(message) = &outcome {
            tracing::error!(operation = %job.operation, error = %message, "batch job failed");
        }
        if let Err(e) = self.repository.finish(id, &outcome) {
            return Err(self.abandon(id, e));
        }

        let processed = match self.repository.get(id) {
            Ok(Some(stored)) => stored.processed_items,
            _ => 0,
        };
        let event = match &outcome {
            JobOutcome::Completed => BatchProgressEvent::new(
                &job.id,
                &job.operation,
                BatchPhase::Completed,
                processed,
                job.total_items,
                "Batch job completed",
            ),
            JobOutcome::Failed(message) => BatchProgressEvent::failed(
                &job.id,
                &job.operation,
                processed,
                job.total_items,
                message,
            ),
        };
        self.progress.report(event);

        Ok(Some(outcome))
    }

    /// Marks a started job `Failed` after `error` interrupted execution.
    /// Returns `error` for the caller to propagate.
    fn abandon(&self, id: &str, error: PdfSuiteError) -> PdfSuiteError {
        tracing::error!(batch_id = %id, error = %error, "batch job interrupted");
        if let Err(e) = self
            .repository
            .finish(id, &JobOutcome::Failed(error.to_string()))
        {
            tracing::error!(batch_id = %id, error = %e, "could not mark batch job failed");
        }
        error
    }

    fn run(
        &self,
        job: &BatchJob,
        handlers: &dyn BatchHandlers,
        deadline: Instant,
        timeout: Duration,
    ) -> Result<()> {
        let operation: BatchOperation = job
            .operation
            .parse()
            .map_err(|_| PdfSuiteError::UnknownOperation(job.operation.clone()))?;

        match operation.execution_mode() {
            ExecutionMode::Atomic => {
                let result = handlers.merge(&job.file_refs, &job.options)?;
                self.record(
                    job,
                    Progress::All {
                        processed_items: job.total_items,
                        results: vec![result],
                    },
                )?;
                self.progress.report(BatchProgressEvent::new(
                    &job.id,
                    &job.operation,
                    BatchPhase::ItemCompleted,
                    job.total_items,
                    job.total_items,
                    "All files merged",
                ));
            }
            ExecutionMode::PerItem => {
                for (index, file_ref) in job.file_refs.iter().enumerate() {
                    if Instant::now() >= deadline {
                        return Err(PdfSuiteError::BatchTimeout {
                            seconds: timeout.as_secs(),
                        });
                    }

                    let result = run_item(operation, handlers, file_ref, &job.options)?;
                    self.record(job, Progress::Item(result))?;

                    let processed = index as u32 + 1;
                    tracing::debug!(item = %file_ref, processed, "batch item completed");
                    self.progress.report(
                        BatchProgressEvent::new(
                            &job.id,
                            &job.operation,
                            BatchPhase::ItemCompleted,
                            processed,
                            job.total_items,
                            &format!("Processed {} of {}", processed, job.total_items),
                        )
                        .with_item(file_ref),
                    );
                }
            }
            ExecutionMode::Unsupported => {
                return Err(PdfSuiteError::UnknownOperation(operation.to_string()));
            }
        }
        Ok(())
    }

    fn record(&self, job: &BatchJob, progress: Progress) -> Result<()> {
        if !self.repository.advance(&job.id, progress)? {
            tracing::warn!(batch_id = %job.id, "progress update was not applied");
        }
        Ok(())
    }
}

fn run_item(
    operation: BatchOperation,
    handlers: &dyn BatchHandlers,
    file_ref: &str,
    options: &Map<String, Value>,
) -> Result<Value> {
    match operation {
        BatchOperation::Compress => handlers.compress(file_ref, options),
        BatchOperation::Watermark => handlers.watermark(file_ref, options),
        BatchOperation::Ocr => handlers.ocr(file_ref, options),
        other => Err(PdfSuiteError::UnknownOperation(other.to_string())),
    }
}
