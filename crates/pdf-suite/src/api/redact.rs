use serde::Deserialize;

use super::params::flexible_opt;
use super::{CallContext, PdfSuite};
use crate::error::Result;
use crate::redact::{RedactionOutcome, RedactionSpec, Redactor};

#[derive(Debug, Deserialize)]
pub struct RedactAreasArgs {
    pub file_url: String,
    #[serde(default, deserialize_with = "flexible_opt")]
    pub redactions: Option<Vec<RedactionSpec>>,
    #[serde(default)]
    pub output_filename: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RedactTextArgs {
    pub file_url: String,
    #[serde(default)]
    pub search_text: Option<String>,
    #[serde(default)]
    pub output_filename: Option<String>,
}

fn redactor(suite: &PdfSuite) -> Redactor<'_> {
    Redactor::new(suite.store(), suite.word_extractor())
}

pub fn redact_areas(
    suite: &PdfSuite,
    _ctx: &CallContext,
    args: RedactAreasArgs,
) -> Result<RedactionOutcome> {
    let regions = args.redactions.unwrap_or_default();
    redactor(suite).redact_by_regions(&args.file_url, &regions, args.output_filename.as_deref())
}

pub fn redact_text(
    suite: &PdfSuite,
    _ctx: &CallContext,
    args: RedactTextArgs,
) -> Result<RedactionOutcome> {
    redactor(suite).redact_by_text(
        &args.file_url,
        args.search_text.as_deref().unwrap_or_default(),
        args.output_filename.as_deref(),
    )
}
