use serde::Deserialize;

use super::params::output_name;
use super::{CallContext, PdfSuite, SavedFile};
use crate::error::Result;
use crate::pdf::flatten::flatten;

pub const DEFAULT_OUTPUT_FILENAME: &str = "flattened.pdf";

#[derive(Debug, Deserialize)]
pub struct FlattenArgs {
    pub file_url: String,
    #[serde(default)]
    pub output_filename: Option<String>,
}

pub fn flatten_pdf(suite: &PdfSuite, _ctx: &CallContext, args: FlattenArgs) -> Result<SavedFile> {
    let mut doc = suite.open_pdf(&args.file_url)?;
    let report = flatten(&mut doc)?;
    tracing::debug!(
        removed_form = report.removed_form,
        pages = report.pages_with_annotations,
        "flattened"
    );
    suite.save_pdf(
        &mut doc,
        output_name(args.output_filename.as_deref(), DEFAULT_OUTPUT_FILENAME),
    )
}
