use serde::{Deserialize, Serialize};

use super::params::output_name;
use super::{CallContext, PdfSuite};
use crate::error::Result;
use crate::pdf::compress::{compress_bytes, CompressionStats, Quality};

pub const DEFAULT_OUTPUT_FILENAME: &str = "compressed.pdf";

#[derive(Debug, Clone, Serialize)]
pub struct CompressedPdf {
    pub file_url: String,
    pub filename: String,
    #[serde(flatten)]
    pub stats: CompressionStats,
}

#[derive(Debug, Deserialize)]
pub struct CompressArgs {
    pub file_url: String,
    /// `low`, `medium` or `high`; anything else means `medium`.
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default)]
    pub output_filename: Option<String>,
}

pub fn compress_pdf(
    suite: &PdfSuite,
    _ctx: &CallContext,
    args: CompressArgs,
) -> Result<CompressedPdf> {
    let quality = Quality::from_name(args.quality.as_deref().unwrap_or_default());
    compress_file(suite, &args.file_url, quality, args.output_filename.as_deref())
}

pub fn compress_file(
    suite: &PdfSuite,
    file_url: &str,
    quality: Quality,
    output_filename: Option<&str>,
) -> Result<CompressedPdf> {
    let original = suite.store().read(file_url)?;
    let (bytes, stats) = compress_bytes(&original, quality)?;

    let saved = suite.save_bytes(
        &bytes,
        output_name(output_filename, DEFAULT_OUTPUT_FILENAME),
    )?;
    tracing::info!(
        quality = quality.as_str(),
        reduction = stats.reduction_percent,
        "compressed PDF"
    );
    Ok(CompressedPdf {
        file_url: saved.file_url,
        filename: saved.filename,
        stats,
    })
}
