use serde::Serialize;
use serde_json::{Map, Value};

use super::operation::{BatchOperation, BatchStatus};
use crate::db::batch_job_repo::BatchJobRow;
use crate::db::{now_timestamp, DatabaseError};
use crate::error::Result;

/// Snapshot of a persisted batch job.
#[derive(Debug, Clone, Serialize)]
pub struct BatchJob {
    pub id: String,
    /// Stored operation name. Kept as text so rows written by other
    /// versions still load; it is parsed when the job executes.
    pub operation: String,
    pub status: BatchStatus,
    pub total_items: u32,
    pub processed_items: u32,
    pub file_refs: Vec<String>,
    pub options: Map<String, Value>,
    pub results: Vec<Value>,
    pub error_message: Option<String>,
    pub owner: String,
    pub created_at: String,
    pub updated_at: String,
}

impl BatchJob {
    /// A fresh `Queued` job with no progress.
    pub fn new(
        operation: BatchOperation,
        file_refs: Vec<String>,
        options: Map<String, Value>,
        owner: &str,
    ) -> Self {
        let now = now_timestamp();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            operation: operation.as_str().to_string(),
            status: BatchStatus::Queued,
            total_items: file_refs.len() as u32,
            processed_items: 0,
            file_refs,
            options,
            results: Vec::new(),
            error_message: None,
            owner: owner.to_string(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(Value::as_str)
    }

    pub(crate) fn to_row(&self) -> std::result::Result<BatchJobRow, DatabaseError> {
        fn json<T: Serialize>(
            column: &'static str,
            value: &T,
        ) -> std::result::Result<String, DatabaseError> {
            serde_json::to_string(value).map_err(|source| DatabaseError::Json { column, source })
        }

        Ok(BatchJobRow {
            id: self.id.clone(),
            operation: self.operation.clone(),
            status: self.status.as_str().to_string(),
            total_items: self.total_items,
            processed_items: self.processed_items,
            file_refs: json("file_refs", &self.file_refs)?,
            options: json("options", &self.options)?,
            results: json("results", &self.results)?,
            error_message: self.error_message.clone(),
            owner: self.owner.clone(),
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
            started_at: None,
            finished_at: None,
        })
    }

    pub(crate) fn from_row(row: BatchJobRow) -> Result<Self> {
        fn parse<T: serde::de::DeserializeOwned>(
            column: &'static str,
            text: &str,
        ) -> std::result::Result<T, DatabaseError> {
            serde_json::from_str(text).map_err(|source| DatabaseError::Json { column, source })
        }

        Ok(Self {
            status: row.status.parse()?,
            file_refs: parse("file_refs", &row.file_refs)?,
            options: parse("options", &row.options)?,
            results: parse("results", &row.results)?,
            id: row.id,
            operation: row.operation,
            total_items: row.total_items,
            processed_items: row.processed_items,
            error_message: row.error_message,
            owner: row.owner,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Progress written while a job is `Processing`.
#[derive(Debug, Clone)]
pub enum Progress {
    /// One more item finished with this result.
    Item(Value),
    /// Every item was handled in one step.
    All {
        processed_items: u32,
        results: Vec<Value>,
    },
}

/// How a `Processing` job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Failed(String),
}

impl JobOutcome {
    pub fn status(&self) -> BatchStatus {
        match self {
            JobOutcome::Completed => BatchStatus::Completed,
            JobOutcome::Failed(_) => BatchStatus::Failed,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            JobOutcome::Completed => None,
            JobOutcome::Failed(message) => Some(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_new_job_is_queued() {
        let job = BatchJob::new(
            BatchOperation::Compress,
            vec!["/files/a.pdf".into(), "/files/b.pdf".into()],
            options(json!({"quality": "low"})),
            "alice@example.com",
        );
        assert_eq!(job.status, BatchStatus::Queued);
        assert_eq!(job.total_items, 2);
        assert_eq!(job.processed_items, 0);
        assert!(job.results.is_empty());
        assert!(job.error_message.is_none());
        assert_eq!(job.operation, "compress");
        assert_eq!(job.option_str("quality"), Some("low"));
        assert_eq!(job.option_str("missing"), None);
    }

    #[test]
    fn test_row_round_trip() {
        let job = BatchJob::new(
            BatchOperation::Watermark,
            vec!["/files/a.pdf".into()],
            options(json!({"text": "DRAFT", "opacity": 0.3})),
            "Guest",
        );
        let row = job.to_row().unwrap();
        assert_eq!(row.status, "Queued");
        assert_eq!(row.file_refs, r#"["/files/a.pdf"]"#);

        let restored = BatchJob::from_row(row).unwrap();
        assert_eq!(restored.id, job.id);
        assert_eq!(restored.file_refs, job.file_refs);
        assert_eq!(restored.options["opacity"], json!(0.3));
    }

    #[test]
    fn test_malformed_row_json() {
        let mut row = BatchJob::new(BatchOperation::Ocr, vec!["a".into()], Map::new(), "Guest")
            .to_row()
            .unwrap();
        row.results = "not json".to_string();
        assert!(BatchJob::from_row(row).is_err());
    }

    #[test]
    fn test_outcome_accessors() {
        assert_eq!(JobOutcome::Completed.status(), BatchStatus::Completed);
        assert_eq!(JobOutcome::Completed.error_message(), None);
        let failed = JobOutcome::Failed("boom".into());
        assert_eq!(failed.status(), BatchStatus::Failed);
        assert_eq!(failed.error_message(), Some("boom"));
    }
}
