use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::error::WorkerError;

/// A unit of background work: run the batch job `batch_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedBatch {
    pub batch_id: String,
    /// Name of the queue class the job was submitted to.
    pub queue: String,
    pub timeout: Duration,
}

/// Fire-and-forget hand-off to the execution substrate.
pub trait JobQueue: Send + Sync {
    fn enqueue(&self, job: QueuedBatch) -> Result<(), WorkerError>;
}

/// Sending half of the in-process batch queue. Sends never block.
#[derive(Clone)]
pub struct BatchQueue {
    sender: Sender<QueuedBatch>,
    closed: Arc<AtomicBool>,
}

impl BatchQueue {
    /// Stops accepting new work. Jobs already queued are still delivered.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Relaxed);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.sender.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sender.is_empty()
    }
}

impl JobQueue for BatchQueue {
    fn enqueue(&self, job: QueuedBatch) -> Result<(), WorkerError> {
        if self.is_closed() {
            return Err(WorkerError::ChannelClosed);
        }
        log::debug!("Enqueued batch job {} on queue '{}'", job.batch_id, job.queue);
        self.sender
            .send(job)
            .map_err(|_| WorkerError::ChannelClosed)
    }
}

/// Creates the batch queue and the receiver workers consume from.
pub fn queue() -> (BatchQueue, Receiver<QueuedBatch>) {
    let (sender, receiver) = unbounded();
    (
        BatchQueue {
            sender,
            closed: Arc::new(AtomicBool::new(false)),
        },
        receiver,
    )
}
