use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::params::{flexible, flexible_opt};
use super::{CallContext, PdfSuite};
use crate::batch::BatchJob;
use crate::error::Result;

#[derive(Debug, Deserialize)]
pub struct StartBatchArgs {
    pub operation: String,
    #[serde(default, deserialize_with = "flexible")]
    pub file_urls: Vec<String>,
    #[serde(default, deserialize_with = "flexible_opt")]
    pub options: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
pub struct BatchStatusArgs {
    pub batch_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchStarted {
    pub batch_name: String,
    pub status: String,
    pub message: String,
}

/// Client view of a batch job.
#[derive(Debug, Clone, Serialize)]
pub struct BatchStatusView {
    pub batch_name: String,
    pub operation: String,
    pub status: String,
    pub total_files: u32,
    pub processed_files: u32,
    pub results: Vec<Value>,
    pub error: String,
}

impl From<BatchJob> for BatchStatusView {
    fn from(job: BatchJob) -> Self {
        Self {
            batch_name: job.id,
            operation: job.operation,
            status: job.status.as_str().to_string(),
            total_files: job.total_items,
            processed_files: job.processed_items,
            results: job.results,
            error: job.error_message.unwrap_or_default(),
        }
    }
}

pub fn start_batch(
    suite: &PdfSuite,
    ctx: &CallContext,
    args: StartBatchArgs,
) -> Result<BatchStarted> {
    let job = suite.engine().submit(
        &args.operation,
        args.file_urls,
        args.options.unwrap_or_default(),
        &ctx.user,
    )?;
    Ok(BatchStarted {
        batch_name: job.id,
        status: job.status.as_str().to_string(),
        message: "Batch job started".to_string(),
    })
}

pub fn get_batch_status(
    suite: &PdfSuite,
    _ctx: &CallContext,
    args: BatchStatusArgs,
) -> Result<BatchStatusView> {
    Ok(suite.engine().get_status(&args.batch_name)?.into())
}
