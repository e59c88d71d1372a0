//! Persistence seam for batch jobs.
//!
//! Writers only get the transitions of the job state machine: `create`,
//! `start`, `advance` and `finish`. Each is a single guarded update, so a
//! concurrent `get` sees either the state before or after it.

use super::job::{BatchJob, JobOutcome, Progress};
use crate::db::batch_job_repo::{self, STATUS_COMPLETED, STATUS_FAILED};
use crate::db::{now_timestamp, Database, DatabaseError};
use crate::error::Result;

pub trait BatchJobRepository: Send + Sync {
    /// Persists a new `Queued` job.
    fn create(&self, job: &BatchJob) -> Result<()>;

    fn get(&self, id: &str) -> Result<Option<BatchJob>>;

    /// `Queued -> Processing`. Returns `false` if the job was not queued, which
    /// makes a redelivered job a no-op.
    fn start(&self, id: &str) -> Result<bool>;

    /// Records progress of a `Processing` job. Returns `false` if the job is
    /// not processing or the update would exceed `total_items`.
    fn advance(&self, id: &str, progress: Progress) -> Result<bool>;

    /// `Processing -> Completed | Failed`. Returns `false` if the job was not
    /// processing.
    fn finish(&self, id: &str, outcome: &JobOutcome) -> Result<bool>;
}

/// SQLite-backed repository over the `batch_jobs` table.
#[derive(Clone)]
pub struct SqliteBatchJobRepository {
    db: Database,
}

impl SqliteBatchJobRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

fn encode<T: serde::Serialize>(column: &'static str, value: &T) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|source| DatabaseError::Json { column, source }.into())
}

impl BatchJobRepository for SqliteBatchJobRepository {
    fn create(&self, job: &BatchJob) -> Result<()> {
        batch_job_repo::insert(&self.db, &job.to_row()?)?;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<BatchJob>> {
        batch_job_repo::find_by_id(&self.db, id)?
            .map(BatchJob::from_row)
            .transpose()
    }

    fn start(&self, id: &str) -> Result<bool> {
        Ok(batch_job_repo::try_start(&self.db, id, &now_timestamp())?)
    }

    fn advance(&self, id: &str, progress: Progress) -> Result<bool> {
        let now = now_timestamp();
        let applied = match progress {
            Progress::Item(result) => {
                batch_job_repo::record_item(&self.db, id, &encode("results", &result)?, &now)?
            }
            Progress::All {
                processed_items,
                results,
            } => batch_job_repo::record_all(
                &self.db,
                id,
                processed_items,
                &encode("results", &results)?,
                &now,
            )?,
        };
        Ok(applied)
    }

    fn finish(&self, id: &str, outcome: &JobOutcome) -> Result<bool> {
        let status = match outcome {
            JobOutcome::Completed => STATUS_COMPLETED,
            JobOutcome::Failed(_) => STATUS_FAILED,
        };
        Ok(batch_job_repo::finish(
            &self.db,
            id,
            status,
            outcome.error_message(),
            &now_timestamp(),
        )?)
    }
}
