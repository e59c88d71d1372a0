//! Edit session repository: CRUD on the `edit_sessions` table.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DatabaseError};

#[derive(Debug, Clone)]
pub struct SessionRow {
    pub id: String,
    pub source_file: String,
    pub annotations: String,
    pub page_modifications: String,
    pub owner: String,
    pub created_at: String,
    pub modified_at: String,
}

impl SessionRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            source_file: row.get("source_file")?,
            annotations: row.get("annotations")?,
            page_modifications: row.get("page_modifications")?,
            owner: row.get("owner")?,
            created_at: row.get("created_at")?,
            modified_at: row.get("modified_at")?,
        })
    }
}

pub fn insert(db: &Database, session: &SessionRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO edit_sessions (id, source_file, annotations, page_modifications, owner,
             created_at, modified_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                session.id,
                session.source_file,
                session.annotations,
                session.page_modifications,
                session.owner,
                session.created_at,
                session.modified_at,
            ],
        )?;
        Ok(())
    })
}

/// Replaces the annotations, and the page modifications when given.
/// Returns `false` if the session does not exist.
pub fn update(
    db: &Database,
    id: &str,
    annotations: &str,
    page_modifications: Option<&str>,
    now: &str,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE edit_sessions
             SET annotations = ?2,
                 page_modifications = COALESCE(?3, page_modifications),
                 modified_at = ?4
             WHERE id = ?1",
            params![id, annotations, page_modifications, now],
        )?;
        Ok(changed == 1)
    })
}

pub fn find_by_id(db: &Database, id: &str) -> Result<Option<SessionRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM edit_sessions WHERE id = ?1",
                params![id],
                SessionRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

/// Lists an owner's sessions, most recently modified first.
pub fn list_by_owner(
    db: &Database,
    owner: &str,
    limit: u32,
) -> Result<Vec<SessionRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM edit_sessions WHERE owner = ?1
             ORDER BY modified_at DESC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![owner, limit], SessionRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}
