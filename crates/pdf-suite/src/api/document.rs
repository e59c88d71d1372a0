//! Editing sessions: annotations and page modifications a client keeps
//! against a source PDF between visits.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::params::json_value_opt;
use super::{CallContext, PdfSuite};
use crate::db::session_repo::{self, SessionRow};
use crate::db::{now_timestamp, DatabaseError};
use crate::error::{PdfSuiteError, Result};

/// Sessions returned by [`list_edit_sessions`].
pub const SESSION_LIST_LIMIT: u32 = 50;

#[derive(Debug, Deserialize)]
pub struct SaveSessionArgs {
    pub file_url: String,
    #[serde(default, deserialize_with = "json_value_opt")]
    pub annotations: Option<Value>,
    #[serde(default, deserialize_with = "json_value_opt")]
    pub page_modifications: Option<Value>,
    #[serde(default)]
    pub session_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SessionNameArgs {
    pub session_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSaved {
    pub session_name: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionDetail {
    pub session_name: String,
    pub source_file: String,
    pub annotations: Value,
    pub page_modifications: Value,
    pub modified: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub name: String,
    pub source_file: String,
    pub modified: String,
    pub creation: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionList {
    pub sessions: Vec<SessionSummary>,
    pub count: usize,
}

fn encode(value: Option<Value>) -> String {
    value.unwrap_or_else(|| Value::Array(Vec::new())).to_string()
}

fn decode(column: &'static str, text: &str) -> Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Array(Vec::new()));
    }
    serde_json::from_str(text)
        .map_err(|source| PdfSuiteError::from(DatabaseError::Json { column, source }))
}

/// Creates a session owned by the caller, or updates `session_name` when
/// given. An update without page modifications keeps the stored ones.
pub fn save_edit_session(
    suite: &PdfSuite,
    ctx: &CallContext,
    args: SaveSessionArgs,
) -> Result<SessionSaved> {
    let now = now_timestamp();
    let annotations = encode(args.annotations);

    let session_name = match args.session_name.filter(|name| !name.trim().is_empty()) {
        Some(name) => {
            let page_modifications = args.page_modifications.map(|v| v.to_string());
            let updated = session_repo::update(
                suite.database(),
                &name,
                &annotations,
                page_modifications.as_deref(),
                &now,
            )?;
            if !updated {
                return Err(PdfSuiteError::not_found("Session not found"));
            }
            name
        }
        None => {
            let row = SessionRow {
                id: uuid::Uuid::new_v4().to_string(),
                source_file: args.file_url,
                annotations,
                page_modifications: encode(args.page_modifications),
                owner: ctx.user.clone(),
                created_at: now.clone(),
                modified_at: now,
            };
            session_repo::insert(suite.database(), &row)?;
            row.id
        }
    };

    Ok(SessionSaved {
        session_name,
        message: "Session saved".to_string(),
    })
}

pub fn load_edit_session(
    suite: &PdfSuite,
    _ctx: &CallContext,
    args: SessionNameArgs,
) -> Result<SessionDetail> {
    let row = session_repo::find_by_id(suite.database(), &args.session_name)?
        .ok_or_else(|| PdfSuiteError::not_found("Session not found"))?;

    Ok(SessionDetail {
        annotations: decode("annotations", &row.annotations)?,
        page_modifications: decode("page_modifications", &row.page_modifications)?,
        session_name: row.id,
        source_file: row.source_file,
        modified: row.modified_at,
    })
}

pub fn list_edit_sessions(
    suite: &PdfSuite,
    ctx: &CallContext,
    _args: Value,
) -> Result<SessionList> {
    let sessions: Vec<SessionSummary> =
        session_repo::list_by_owner(suite.database(), &ctx.user, SESSION_LIST_LIMIT)?
            .into_iter()
            .map(|row| SessionSummary {
                name: row.id,
                source_file: row.source_file,
                modified: row.modified_at,
                creation: row.created_at,
            })
            .collect();
    Ok(SessionList {
        count: sessions.len(),
        sessions,
    })
}
