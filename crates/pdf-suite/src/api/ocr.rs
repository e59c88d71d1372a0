use serde::{Deserialize, Serialize};

use super::params::output_name;
use super::{CallContext, PdfSuite};
use crate::error::Result;
use crate::pdf::ocr::{ocr_image_to_text as recognize_image_file, ocr_pdf as make_searchable};

pub const DEFAULT_OUTPUT_FILENAME: &str = "ocr_output.pdf";

#[derive(Debug, Clone, Serialize)]
pub struct OcrPdfOutput {
    pub file_url: String,
    pub filename: String,
    pub pages_processed: usize,
    pub text_preview: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageText {
    pub text: String,
    pub language: String,
}

#[derive(Debug, Deserialize)]
pub struct OcrPdfArgs {
    pub file_url: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub output_filename: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OcrImageArgs {
    pub file_url: String,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String {
    "eng".to_string()
}

/// Produces a searchable copy of a scanned PDF.
pub fn ocr_pdf(suite: &PdfSuite, _ctx: &CallContext, args: OcrPdfArgs) -> Result<OcrPdfOutput> {
    ocr_file(
        suite,
        &args.file_url,
        &args.language,
        args.output_filename.as_deref(),
    )
}

pub fn ocr_file(
    suite: &PdfSuite,
    file_url: &str,
    language: &str,
    output_filename: Option<&str>,
) -> Result<OcrPdfOutput> {
    let input = suite.resolve(file_url)?;
    let processor = suite.ocr().with_language(language);
    let output = make_searchable(&input, &processor, &suite.ocr_tools())?;

    let saved = suite.save_bytes(
        &output.pdf,
        output_name(output_filename, DEFAULT_OUTPUT_FILENAME),
    )?;
    tracing::info!(pages = output.pages_processed, language, "OCR completed");
    Ok(OcrPdfOutput {
        file_url: saved.file_url,
        filename: saved.filename,
        pages_processed: output.pages_processed,
        text_preview: output.text_preview,
    })
}

pub fn ocr_image_to_text(
    suite: &PdfSuite,
    _ctx: &CallContext,
    args: OcrImageArgs,
) -> Result<ImageText> {
    let path = suite.resolve(&args.file_url)?;
    let processor = suite.ocr().with_language(&args.language);
    let text = recognize_image_file(&path, &processor)?;
    Ok(ImageText {
        text,
        language: processor.languages().to_string(),
    })
}
