//! Stored form templates. Generation happens client-side; the server only
//! keeps the schema and the optional base PDF reference.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::params::{json_value, json_value_opt};
use super::{CallContext, PdfSuite};
use crate::db::template_repo::{self, TemplateRow};
use crate::db::{now_timestamp, DatabaseError};
use crate::error::{PdfSuiteError, Result};

#[derive(Debug, Deserialize)]
pub struct SaveTemplateArgs {
    #[serde(default)]
    pub name: String,
    #[serde(deserialize_with = "json_value")]
    pub schema: Value,
    #[serde(default)]
    pub base_pdf: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TemplateNameArgs {
    pub template_name: String,
}

#[derive(Debug, Deserialize)]
pub struct GenerateArgs {
    pub template_name: String,
    #[serde(default, deserialize_with = "json_value_opt")]
    pub input_data: Option<Value>,
    /// Accepted for compatibility; generation happens on the client.
    #[serde(default)]
    pub output_filename: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TemplateSaved {
    pub template_name: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TemplateDetail {
    pub name: String,
    pub template_name: String,
    pub schema: Value,
    pub base_pdf: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TemplateSummary {
    pub name: String,
    pub template_name: String,
    pub description: String,
    pub modified: String,
    pub creation: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TemplateList {
    pub templates: Vec<TemplateSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationInput {
    pub schema: Value,
    pub input_data: Value,
    pub base_pdf: String,
}

fn find(suite: &PdfSuite, name: &str) -> Result<TemplateRow> {
    template_repo::find_by_name(suite.database(), name)?
        .ok_or_else(|| PdfSuiteError::not_found("Template not found"))
}

fn parse_schema(row: &TemplateRow) -> Result<Value> {
    serde_json::from_str(&row.schema)
        .map_err(|source| DatabaseError::Json {
            column: "schema",
            source,
        })
        .map_err(PdfSuiteError::from)
}

pub fn save_template(
    suite: &PdfSuite,
    _ctx: &CallContext,
    args: SaveTemplateArgs,
) -> Result<TemplateSaved> {
    let name = args.name.trim();
    if name.is_empty() {
        return Err(PdfSuiteError::validation("Template name is required"));
    }

    let row = template_repo::upsert(
        suite.database(),
        name,
        &args.schema.to_string(),
        args.base_pdf.as_deref(),
        args.description.as_deref(),
        &now_timestamp(),
    )?;
    tracing::info!(template = %row.name, "template saved");

    Ok(TemplateSaved {
        template_name: row.name,
        message: "Template saved".to_string(),
    })
}

pub fn get_template(
    suite: &PdfSuite,
    _ctx: &CallContext,
    args: TemplateNameArgs,
) -> Result<TemplateDetail> {
    let row = find(suite, &args.template_name)?;
    let schema = parse_schema(&row)?;
    Ok(TemplateDetail {
        template_name: row.name.clone(),
        name: row.name,
        schema,
        base_pdf: row.base_pdf,
        description: row.description,
    })
}

pub fn list_templates(suite: &PdfSuite, _ctx: &CallContext, _args: Value) -> Result<TemplateList> {
    let templates = template_repo::list(suite.database())?
        .into_iter()
        .map(|row| TemplateSummary {
            template_name: row.name.clone(),
            name: row.name,
            description: row.description,
            modified: row.modified_at,
            creation: row.created_at,
        })
        .collect();
    Ok(TemplateList { templates })
}

pub fn delete_template(
    suite: &PdfSuite,
    _ctx: &CallContext,
    args: TemplateNameArgs,
) -> Result<Message> {
    if !template_repo::delete(suite.database(), &args.template_name)? {
        return Err(PdfSuiteError::not_found("Template not found"));
    }
    Ok(Message {
        message: "Template deleted".to_string(),
    })
}

pub fn generate_from_template(
    suite: &PdfSuite,
    _ctx: &CallContext,
    args: GenerateArgs,
) -> Result<GenerationInput> {
    let row = find(suite, &args.template_name)?;
    Ok(GenerationInput {
        schema: parse_schema(&row)?,
        input_data: args.input_data.unwrap_or(Value::Object(Default::default())),
        base_pdf: row.base_pdf,
    })
}
