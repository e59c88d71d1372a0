use std::time::Duration;

use serde::Deserialize;

use super::params::output_name;
use super::{CallContext, PdfSuite, SavedFile};
use crate::error::Result;
use crate::pdf::convert::docx_to_pdf as convert_with_libreoffice;

pub const DEFAULT_OUTPUT_FILENAME: &str = "converted.pdf";

#[derive(Debug, Deserialize)]
pub struct ConvertArgs {
    pub file_url: String,
    #[serde(default)]
    pub output_filename: Option<String>,
}

pub fn docx_to_pdf(suite: &PdfSuite, _ctx: &CallContext, args: ConvertArgs) -> Result<SavedFile> {
    let input = suite.resolve(&args.file_url)?;
    let config = suite.config();
    let timeout = Duration::from_secs(config.conversion.timeout_seconds);

    let bytes = convert_with_libreoffice(&config.tools.libreoffice, &input, timeout)?;
    suite.save_bytes(
        &bytes,
        output_name(args.output_filename.as_deref(), DEFAULT_OUTPUT_FILENAME),
    )
}
