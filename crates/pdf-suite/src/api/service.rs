use std::sync::Arc;

use crate::batch::BatchHandlers;
use crate::config::Config;
use crate::db::Database;
use crate::error::Result;
use crate::storage::FileStorage;
use crate::worker::{queue, BatchQueue, WorkerPool};

use super::PdfSuite;

/// A running suite: shared state plus the worker pool executing its batch
/// jobs.
pub struct PdfSuiteService {
    suite: Arc<PdfSuite>,
    queue: BatchQueue,
    pool: WorkerPool,
}

impl PdfSuiteService {
    /// Opens the database, wires the batch queue and starts the workers.
    pub fn start(config: Config) -> Result<Self> {
        let db = match config.database_path() {
            Some(path) => Database::open(&path)?,
            None => {
                log::warn!("No home directory found, using an in-memory database");
                Database::open_in_memory()?
            }
        };
        Self::start_with(config, db)
    }

    pub fn start_with(config: Config, db: Database) -> Result<Self> {
        let store = Arc::new(FileStorage::new(config.site_directory()));
        let worker_count = config.worker_count;

        let (queue, receiver) = queue();
        let suite = Arc::new(PdfSuite::new(config, db, store, Arc::new(queue.clone())));

        let handlers: Arc<dyn BatchHandlers> = suite.clone();
        let pool = WorkerPool::start(receiver, Arc::clone(suite.engine()), handlers, worker_count)?;

        log::info!("PDF suite started with {} batch workers", worker_count);
        Ok(Self { suite, queue, pool })
    }

    pub fn suite(&self) -> &Arc<PdfSuite> {
        &self.suite
    }

    /// Stops accepting batches and waits for running jobs to finish.
    pub fn shutdown(self) {
        self.queue.close();
        self.pool.shutdown();
        self.pool.wait();
        log::info!("PDF suite stopped");
    }
}
