//! Background execution of queued batch jobs on a fixed set of threads.

pub mod pool;
pub mod queue;

pub use pool::WorkerPool;
pub use queue::{queue, BatchQueue, JobQueue, QueuedBatch};
