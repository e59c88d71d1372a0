//! Template repository: CRUD on the `pdf_templates` table.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DatabaseError};

#[derive(Debug, Clone)]
pub struct TemplateRow {
    pub name: String,
    pub schema: String,
    pub base_pdf: String,
    pub description: String,
    pub created_at: String,
    pub modified_at: String,
}

impl TemplateRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            name: row.get("name")?,
            schema: row.get("schema")?,
            base_pdf: row.get("base_pdf")?,
            description: row.get("description")?,
            created_at: row.get("created_at")?,
            modified_at: row.get("modified_at")?,
        })
    }
}

/// Creates the template or replaces its schema. `base_pdf` and `description`
/// only overwrite stored values when given and non-empty.
pub fn upsert(
    db: &Database,
    name: &str,
    schema: &str,
    base_pdf: Option<&str>,
    description: Option<&str>,
    now: &str,
) -> Result<TemplateRow, DatabaseError> {
    let base_pdf = base_pdf.filter(|s| !s.is_empty());
    let description = description.filter(|s| !s.is_empty());

    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO pdf_templates (name, schema, base_pdf, description, created_at, modified_at)
             VALUES (?1, ?2, COALESCE(?3, ''), COALESCE(?4, ''), ?5, ?5)
             ON CONFLICT(name) DO UPDATE SET
                 schema = excluded.schema,
                 base_pdf = COALESCE(?3, base_pdf),
                 description = COALESCE(?4, description),
                 modified_at = excluded.modified_at",
            params![name, schema, base_pdf, description, now],
        )?;

        let row = conn.query_row(
            "SELECT * FROM pdf_templates WHERE name = ?1",
            params![name],
            TemplateRow::from_row,
        )?;
        Ok(row)
    })
}

pub fn find_by_name(db: &Database, name: &str) -> Result<Option<TemplateRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM pdf_templates WHERE name = ?1",
                params![name],
                TemplateRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

/// Lists all templates, most recently modified first.
pub fn list(db: &Database) -> Result<Vec<TemplateRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT * FROM pdf_templates ORDER BY modified_at DESC, name ASC")?;
        let rows = stmt
            .query_map([], TemplateRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Deletes a template. Returns `false` if it did not exist.
pub fn delete(db: &Database, name: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute("DELETE FROM pdf_templates WHERE name = ?1", params![name])?;
        Ok(changed == 1)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    #[test]
    fn test_upsert_creates() {
        let db = test_db();
        let row = upsert(&db, "invoice", r#"{"schemas":[]}"#, None, Some("Invoices"), "t1").unwrap();

        assert_eq!(row.name, "invoice");
        assert_eq!(row.base_pdf, "");
        assert_eq!(row.description, "Invoices");
        assert_eq!(row.created_at, "t1");
    }

    #[test]
    fn test_upsert_updates_schema_and_keeps_optional_fields() {
        let db = test_db();
        upsert(&db, "invoice", "{}", Some("/files/base.pdf"), Some("v1"), "t1").unwrap();
        let row = upsert(&db, "invoice", r#"{"v":2}"#, None, Some(""), "t2").unwrap();

        assert_eq!(row.schema, r#"{"v":2}"#);
        assert_eq!(row.base_pdf, "/files/base.pdf");
        assert_eq!(row.description, "v1");
        assert_eq!(row.created_at, "t1");
        assert_eq!(row.modified_at, "t2");
    }

    #[test]
    fn test_list_orders_by_modified() {
        let db = test_db();
        upsert(&db, "a", "{}", None, None, "2026-01-01").unwrap();
        upsert(&db, "b", "{}", None, None, "2026-01-02").unwrap();
        upsert(&db, "a", "{}", None, None, "2026-01-03").unwrap();

        let names: Vec<String> = list(&db).unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_delete() {
        let db = test_db();
        upsert(&db, "a", "{}", None, None, "t1").unwrap();

        assert!(delete(&db, "a").unwrap());
        assert!(!delete(&db, "a").unwrap());
        assert!(find_by_name(&db, "a").unwrap().is_none());
    }
}
