use serde::Deserialize;
use serde_json::Value;

use super::params::{flexible, flexible_opt, output_name};
use super::{CallContext, PdfSuite, StoredPdf};
use crate::error::{PdfSuiteError, Result};
use crate::pdf::assemble::{assemble, merge_documents, PageSource};
use crate::pdf::pages::PageSpec;
use crate::pdf::{ensure_pdf_extension, page_count};

pub const DEFAULT_OUTPUT_FILENAME: &str = "merged.pdf";

#[derive(Debug, Deserialize)]
pub struct MergeArgs {
    #[serde(default, deserialize_with = "flexible")]
    pub file_urls: Vec<String>,
    #[serde(default)]
    pub output_filename: Option<String>,
}

/// One input of [`merge_pdfs_with_options`].
#[derive(Debug, Clone, Deserialize)]
pub struct FileConfig {
    pub file_url: String,
    /// Page selection; absent or empty takes every page.
    #[serde(default)]
    pub pages: Option<Value>,
    /// Degrees added to each page's rotation.
    #[serde(default, deserialize_with = "flexible_opt")]
    pub rotate: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct MergeWithOptionsArgs {
    #[serde(default, deserialize_with = "flexible")]
    pub file_configs: Vec<FileConfig>,
    #[serde(default)]
    pub output_filename: Option<String>,
}

pub fn merge_pdfs(suite: &PdfSuite, _ctx: &CallContext, args: MergeArgs) -> Result<StoredPdf> {
    merge_files(suite, &args.file_urls, args.output_filename.as_deref())
}

/// Concatenates whole documents in the given order.
pub fn merge_files(
    suite: &PdfSuite,
    file_urls: &[String],
    output_filename: Option<&str>,
) -> Result<StoredPdf> {
    if file_urls.len() < 2 {
        return Err(PdfSuiteError::validation("At least 2 files required for merge"));
    }
    let filename = ensure_pdf_extension(output_name(output_filename, DEFAULT_OUTPUT_FILENAME));

    let documents = file_urls
        .iter()
        .map(|url| suite.open_pdf(url))
        .collect::<Result<Vec<_>>>()?;
    let mut merged = merge_documents(documents)?;
    let pages = page_count(&merged);

    let saved = suite.save_pdf(&mut merged, &filename)?;
    tracing::info!(inputs = file_urls.len(), pages, "merged PDFs");
    Ok(StoredPdf::new(saved, pages))
}

pub fn merge_pdfs_with_options(
    suite: &PdfSuite,
    _ctx: &CallContext,
    args: MergeWithOptionsArgs,
) -> Result<StoredPdf> {
    if args.file_configs.is_empty() {
        return Err(PdfSuiteError::validation("At least 1 file config required"));
    }
    let filename = ensure_pdf_extension(output_name(
        args.output_filename.as_deref(),
        DEFAULT_OUTPUT_FILENAME,
    ));

    let mut sources = Vec::with_capacity(args.file_configs.len());
    for config in &args.file_configs {
        let document = suite.open_pdf(&config.file_url)?;
        let source = match PageSpec::from_value(config.pages.as_ref())? {
            PageSpec::All => PageSource::all(document),
            selection => {
                let total = page_count(&document) as u32;
                PageSource::select(document, selection.resolve(total))
            }
        };
        sources.push(source.with_rotation(config.rotate.unwrap_or(0)));
    }

    let mut merged = assemble(sources)?;
    let pages = page_count(&merged);
    let saved = suite.save_pdf(&mut merged, &filename)?;
    Ok(StoredPdf::new(saved, pages))
}
