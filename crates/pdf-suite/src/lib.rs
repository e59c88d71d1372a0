pub mod api;
pub mod batch;
pub mod broadcast;
pub mod config;
pub mod db;
pub mod error;
pub mod pdf;
pub mod redact;
pub mod storage;
pub mod worker;

pub use api::{ApiResponse, CallContext, PdfSuite, PdfSuiteService};
pub use batch::{BatchEngine, BatchJob, BatchOperation, BatchStatus};
pub use broadcast::{BatchPhase, BatchProgressBroadcaster, BatchProgressEvent};
pub use config::{load_config, load_config_from_env, Config};
pub use error::{
    ConfigError, ErrorKind, PdfSuiteError, ProcessError, Result, StorageError, WorkerError,
};
pub use storage::{FileStorage, FileStore, Visibility};
