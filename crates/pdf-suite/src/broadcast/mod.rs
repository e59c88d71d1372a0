//! Broadcasting of batch job progress for real-time streaming.

pub mod batch_progress;

pub use batch_progress::{
    BatchPhase, BatchProgressBroadcaster, BatchProgressEvent, NoopProgress, ProgressReporter,
};
