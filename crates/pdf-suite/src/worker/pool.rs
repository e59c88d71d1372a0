use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{debug, error, info};

use super::queue::QueuedBatch;
use crate::batch::{BatchEngine, BatchHandlers};
use crate::error::WorkerError;

/// Threads that take batch jobs off the queue and run them on the engine.
pub struct WorkerPool {
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl WorkerPool {
    pub fn start(
        receiver: Receiver<QueuedBatch>,
        engine: Arc<BatchEngine>,
        handlers: Arc<dyn BatchHandlers>,
        worker_count: usize,
    ) -> Result<Self, WorkerError> {
        if worker_count == 0 {
            return Err(WorkerError::SpawnFailed(
                "worker_count must be greater than 0".to_string(),
            ));
        }

        let shutdown = Arc::new(AtomicBool::new(false));
        let mut workers = Vec::with_capacity(worker_count);

        for worker_id in 0..worker_count {
            let receiver = receiver.clone();
            let shutdown_flag = Arc::clone(&shutdown);
            let engine = Arc::clone(&engine);
            let handlers = Arc::clone(&handlers);

            let handle = thread::Builder::new()
                .name(format!("batch-worker-{}", worker_id))
                .spawn(move || {
                    run_worker(worker_id, receiver, shutdown_flag, engine, handlers);
                })
                .map_err(|e| WorkerError::SpawnFailed(e.to_string()))?;

            workers.push(handle);
        }

        info!("Started {} batch workers", worker_count);

        Ok(Self { workers, shutdown })
    }

    /// Asks workers to stop after the job they are running. Jobs still in
    /// the queue stay `Queued`.
    pub fn shutdown(&self) {
        info!("Shutting down batch worker pool...");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Joins every worker. Workers exit once `shutdown` was called or all
    /// queue senders are gone.
    pub fn wait(self) {
        for (i, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Batch worker {} panicked: {:?}", i, e);
            } else {
                debug!("Batch worker {} finished", i);
            }
        }

        info!("All batch workers have stopped");
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }
}

fn run_worker(
    worker_id: usize,
    receiver: Receiver<QueuedBatch>,
    shutdown: Arc<AtomicBool>,
    engine: Arc<BatchEngine>,
    handlers: Arc<dyn BatchHandlers>,
) {
    debug!("Batch worker {} started", worker_id);

    loop {
        if shutdown.load(Ordering::Relaxed) {
            debug!("Batch worker {} received shutdown signal", worker_id);
            break;
        }

        match receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(queued) => {
                debug!(
                    "Batch worker {} picked up {} from queue '{}'",
                    worker_id, queued.batch_id, queued.queue
                );
                if let Err(e) = engine.execute(&queued.batch_id, handlers.as_ref(), queued.timeout) {
                    error!(
                        "Batch worker {} could not run {}: {}",
                        worker_id, queued.batch_id, e
                    );
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                debug!("Batch worker {} queue disconnected", worker_id);
                break;
            }
        }
    }

    debug!("Batch worker {} stopped", worker_id);
}
