//! Asynchronous batch jobs over many file references.

pub mod engine;
pub mod handlers;
pub mod job;
pub mod operation;
pub mod repository;

pub use engine::{BatchEngine, BatchSettings};
pub use handlers::BatchHandlers;
pub use job::{BatchJob, JobOutcome, Progress};
pub use operation::{BatchOperation, BatchStatus, ExecutionMode};
pub use repository::{BatchJobRepository, SqliteBatchJobRepository};
