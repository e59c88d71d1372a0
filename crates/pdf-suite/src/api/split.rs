use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::params::{flexible, output_name};
use super::{CallContext, PdfSuite, StoredPdf};
use crate::error::{PdfSuiteError, Result};
use crate::pdf::assemble::extract;
use crate::pdf::pages::{chunk_ranges, parse_split_range, PageSpec};
use crate::pdf::page_count;

pub const EXTRACT_OUTPUT_FILENAME: &str = "extracted.pdf";

#[derive(Debug, Clone, Serialize)]
pub struct SplitPart {
    pub file_url: String,
    pub filename: String,
    pub pages: usize,
    pub range: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SplitOutput {
    pub files: Vec<SplitPart>,
    pub count: usize,
}

impl From<Vec<SplitPart>> for SplitOutput {
    fn from(files: Vec<SplitPart>) -> Self {
        Self {
            count: files.len(),
            files,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SplitArgs {
    pub file_url: String,
    /// Range strings such as `"1-3"` or `"7"`; bare numbers are accepted.
    #[serde(default, deserialize_with = "flexible")]
    pub page_ranges: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct SplitEveryArgs {
    pub file_url: String,
    #[serde(default = "default_chunk", deserialize_with = "flexible")]
    pub n: i64,
}

fn default_chunk() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
pub struct ExtractPagesArgs {
    pub file_url: String,
    #[serde(default)]
    pub page_numbers: Option<Value>,
    #[serde(default)]
    pub output_filename: Option<String>,
}

fn range_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

/// Writes one output per range. Ranges selecting no pages produce no file,
/// but output names keep the range's position in the request.
pub fn split_pdf(suite: &PdfSuite, _ctx: &CallContext, args: SplitArgs) -> Result<SplitOutput> {
    if args.page_ranges.is_empty() {
        return Err(PdfSuiteError::validation("Page ranges required"));
    }

    let source = suite.open_pdf(&args.file_url)?;
    let total = page_count(&source) as u32;

    let mut parts = Vec::new();
    for (index, range) in args.page_ranges.iter().enumerate() {
        let range = range_text(range);
        let pages = parse_split_range(&range, total)?;
        if pages.is_empty() {
            tracing::debug!(%range, "range selects no pages");
            continue;
        }

        let mut part = extract(&source, &pages)?;
        let saved = suite.save_pdf(&mut part, &format!("split_part_{}.pdf", index + 1))?;
        parts.push(SplitPart {
            file_url: saved.file_url,
            filename: saved.filename,
            pages: pages.len(),
            range,
        });
    }

    Ok(parts.into())
}

pub fn split_pdf_every_n(
    suite: &PdfSuite,
    _ctx: &CallContext,
    args: SplitEveryArgs,
) -> Result<SplitOutput> {
    if args.n < 1 {
        return Err(PdfSuiteError::validation("N must be at least 1"));
    }
    let n = u32::try_from(args.n).unwrap_or(u32::MAX);

    let source = suite.open_pdf(&args.file_url)?;
    let total = page_count(&source) as u32;

    let mut parts = Vec::new();
    for (start, end) in chunk_ranges(total, n) {
        let pages: Vec<u32> = (start..=end).collect();
        let mut part = extract(&source, &pages)?;
        let saved = suite.save_pdf(&mut part, &format!("split_pages_{}-{}.pdf", start, end))?;
        parts.push(SplitPart {
            file_url: saved.file_url,
            filename: saved.filename,
            pages: pages.len(),
            range: format!("{}-{}", start, end),
        });
    }

    Ok(parts.into())
}

pub fn extract_pages(
    suite: &PdfSuite,
    _ctx: &CallContext,
    args: ExtractPagesArgs,
) -> Result<StoredPdf> {
    let filename = output_name(args.output_filename.as_deref(), EXTRACT_OUTPUT_FILENAME);

    let source = suite.open_pdf(&args.file_url)?;
    let total = page_count(&source) as u32;
    let pages = PageSpec::from_value(args.page_numbers.as_ref())?.resolve(total);

    let mut output = extract(&source, &pages)?;
    let saved = suite.save_pdf(&mut output, filename)?;
    Ok(StoredPdf::new(saved, pages.len()))
}
