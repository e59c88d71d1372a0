//! Versioned schema steps, recorded in `_migrations`.
//!
//! Each step runs in its own transaction together with its bookkeeping row,
//! so a failed step leaves neither tables nor a version behind.

use rusqlite::{params, Connection};

use super::error::DatabaseError;
use super::now_timestamp;

/// `(version, name, sql)`, in ascending version order.
const STEPS: &[(u32, &str, &str)] = &[
    (1, "batch_jobs", include_str!("sql/001_create_batch_jobs.sql")),
    (2, "pdf_templates", include_str!("sql/002_create_pdf_templates.sql")),
    (3, "edit_sessions", include_str!("sql/003_create_edit_sessions.sql")),
];

const BOOKKEEPING: &str = "CREATE TABLE IF NOT EXISTS _migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL
)";

/// Highest recorded version, 0 for a fresh database.
pub fn schema_version(conn: &Connection) -> Result<u32, DatabaseError> {
    conn.execute_batch(BOOKKEEPING)?;
    Ok(conn.query_row("SELECT IFNULL(MAX(version), 0) FROM _migrations", [], |r| {
        r.get(0)
    })?)
}

/// Brings the schema up to the latest version.
pub fn run_all(conn: &Connection) -> Result<(), DatabaseError> {
    let applied = schema_version(conn)?;
    let pending = STEPS.iter().filter(|(version, _, _)| *version > applied);

    for &(version, name, sql) in pending {
        apply(conn, version, name, sql).map_err(|source| DatabaseError::Migration {
            version,
            name,
            source,
        })?;
        log::info!("Applied schema migration {} ({})", version, name);
    }
    Ok(())
}

fn apply(conn: &Connection, version: u32, name: &str, sql: &str) -> rusqlite::Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(sql)?;
    tx.execute(
        "INSERT INTO _migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
        params![version, name, now_timestamp()],
    )?;
    tx.commit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap();
        stmt.query_map([], |r| r.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn test_fresh_database_reaches_latest_version() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(schema_version(&conn).unwrap(), 0);

        run_all(&conn).unwrap();
        run_all(&conn).unwrap();

        assert_eq!(schema_version(&conn).unwrap(), STEPS.len() as u32);
        let tables = tables(&conn);
        for expected in ["batch_jobs", "pdf_templates", "edit_sessions"] {
            assert!(tables.iter().any(|t| t == expected), "missing {expected}");
        }
    }

    #[test]
    fn test_failed_step_is_rolled_back() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(BOOKKEEPING).unwrap();

        let err = apply(&conn, 99, "broken", "CREATE TABLE half (id INTEGER); NOT SQL;")
            .unwrap_err();
        assert!(!err.to_string().is_empty());
        assert!(!tables(&conn).iter().any(|t| t == "half"));
        assert_eq!(schema_version(&conn).unwrap(), 0);
    }

    #[test]
    fn test_progress_cannot_exceed_total() {
        let conn = Connection::open_in_memory().unwrap();
        run_all(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO batch_jobs (id, operation, total_items, processed_items, file_refs,
             owner, created_at, updated_at)
             VALUES ('b1', 'compress', 1, 2, '[]', 'Guest', 'now', 'now')",
            [],
        );
        assert!(result.is_err());
    }
}
