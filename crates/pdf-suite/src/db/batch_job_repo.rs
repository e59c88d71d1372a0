//! Batch job repository: row-level operations on the `batch_jobs` table.
//!
//! Every status-changing statement is guarded by the expected current
//! status, so transitions are monotonic even if callers misbehave. The
//! boolean return values report whether the guarded update applied.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DatabaseError};

pub const STATUS_QUEUED: &str = "Queued";
pub const STATUS_PROCESSING: &str = "Processing";
pub const STATUS_COMPLETED: &str = "Completed";
pub const STATUS_FAILED: &str = "Failed";

/// A raw batch job row. JSON columns are kept as text.
#[derive(Debug, Clone)]
pub struct BatchJobRow {
    pub id: String,
    pub operation: String,
    pub status: String,
    pub total_items: u32,
    pub processed_items: u32,
    pub file_refs: String,
    pub options: String,
    pub results: String,
    pub error_message: Option<String>,
    pub owner: String,
    pub created_at: String,
    pub updated_at: String,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
}

impl BatchJobRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            operation: row.get("operation")?,
            status: row.get("status")?,
            total_items: row.get("total_items")?,
            processed_items: row.get("processed_items")?,
            file_refs: row.get("file_refs")?,
            options: row.get("options")?,
            results: row.get("results")?,
            error_message: row.get("error_message")?,
            owner: row.get("owner")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            started_at: row.get("started_at")?,
            finished_at: row.get("finished_at")?,
        })
    }
}

/// Inserts a new batch job row.
pub fn insert(db: &Database, job: &BatchJobRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO batch_jobs (id, operation, status, total_items, processed_items,
             file_refs, options, results, error_message, owner, created_at, updated_at,
             started_at, finished_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                job.id,
                job.operation,
                job.status,
                job.total_items,
                job.processed_items,
                job.file_refs,
                job.options,
                job.results,
                job.error_message,
                job.owner,
                job.created_at,
                job.updated_at,
                job.started_at,
                job.finished_at,
            ],
        )?;
        Ok(())
    })
}

/// Finds a batch job by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<BatchJobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM batch_jobs WHERE id = ?1",
                params![id],
                BatchJobRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

/// Moves a job from `Queued` to `Processing`. Returns `false` when the job
/// is not currently queued (unknown, already running or terminal).
pub fn try_start(db: &Database, id: &str, now: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE batch_jobs SET status = ?2, started_at = ?3, updated_at = ?3
             WHERE id = ?1 AND status = ?4",
            params![id, STATUS_PROCESSING, now, STATUS_QUEUED],
        )?;
        Ok(changed == 1)
    })
}

/// Appends one item result and increments `processed_items` in a single
/// statement.
pub fn record_item(
    db: &Database,
    id: &str,
    result_json: &str,
    now: &str,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE batch_jobs
             SET processed_items = processed_items + 1,
                 results = json_insert(results, '$[#]', json(?2)),
                 updated_at = ?3
             WHERE id = ?1 AND status = ?4 AND processed_items < total_items",
            params![id, result_json, now, STATUS_PROCESSING],
        )?;
        Ok(changed == 1)
    })
}

/// Records an all-at-once outcome: the whole result list and the final count.
pub fn record_all(
    db: &Database,
    id: &str,
    processed_items: u32,
    results_json: &str,
    now: &str,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE batch_jobs SET processed_items = ?2, results = json(?3), updated_at = ?4
             WHERE id = ?1 AND status = ?5 AND ?2 <= total_items",
            params![id, processed_items, results_json, now, STATUS_PROCESSING],
        )?;
        Ok(changed == 1)
    })
}

/// Moves a `Processing` job to a terminal status.
pub fn finish(
    db: &Database,
    id: &str,
    status: &str,
    error_message: Option<&str>,
    now: &str,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE batch_jobs SET status = ?2, error_message = ?3, finished_at = ?4,
             updated_at = ?4
             WHERE id = ?1 AND status = ?5",
            params![id, status, error_message, now, STATUS_PROCESSING],
        )?;
        Ok(changed == 1)
    })
}

/// Counts batch jobs with the given status.
pub fn count_by_status(db: &Database, status: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM batch_jobs WHERE status = ?1",
            params![status],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}
