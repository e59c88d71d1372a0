use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{CallContext, PdfSuite};
use crate::error::{Result, StorageError};
use crate::pdf::info::{document_info, extract_images as page_images, extract_text as page_text};
use crate::pdf::info::{DocumentInfo, ImageInfo, PageText};
use crate::pdf::layout::WordExtractor;
use crate::pdf::load_document;
use crate::pdf::pages::PageSpec;
use crate::pdf::tables::{extract_tables as page_tables, Table};

#[derive(Debug, Deserialize)]
pub struct FileArgs {
    pub file_url: String,
}

#[derive(Debug, Deserialize)]
pub struct PageSelectionArgs {
    pub file_url: String,
    #[serde(default)]
    pub page_numbers: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractedText {
    pub pages: Vec<PageText>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractedTables {
    pub tables: Vec<Table>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractedImages {
    pub images: Vec<ImageInfo>,
    pub count: usize,
}

pub fn get_pdf_info(suite: &PdfSuite, _ctx: &CallContext, args: FileArgs) -> Result<DocumentInfo> {
    let path = suite.resolve(&args.file_url)?;
    let file_size = std::fs::metadata(&path)
        .map_err(|e| StorageError::ReadFile {
            path: path.clone(),
            source: e,
        })?
        .len();
    let doc = load_document(&path)?;
    Ok(document_info(&doc, file_size))
}

pub fn extract_text(
    suite: &PdfSuite,
    _ctx: &CallContext,
    args: PageSelectionArgs,
) -> Result<ExtractedText> {
    let doc = suite.open_pdf(&args.file_url)?;
    let total = doc.get_pages().len() as u32;
    let pages = PageSpec::from_value(args.page_numbers.as_ref())?.resolve(total);
    Ok(ExtractedText {
        pages: page_text(&doc, &pages),
    })
}

/// Tables found in the word layout of the selected pages.
pub fn extract_tables(
    suite: &PdfSuite,
    _ctx: &CallContext,
    args: PageSelectionArgs,
) -> Result<ExtractedTables> {
    let doc = suite.open_pdf(&args.file_url)?;
    let total = doc.get_pages().len() as u32;
    let pages = PageSpec::from_value(args.page_numbers.as_ref())?.resolve(total);
    let words = suite.word_extractor().extract_words(&doc)?;
    let tables = page_tables(&words, &pages);
    Ok(ExtractedTables {
        count: tables.len(),
        tables,
    })
}

/// Metadata of image XObjects on the selected pages.
pub fn extract_images(
    suite: &PdfSuite,
    _ctx: &CallContext,
    args: PageSelectionArgs,
) -> Result<ExtractedImages> {
    let doc = suite.open_pdf(&args.file_url)?;
    let total = doc.get_pages().len() as u32;
    let pages = PageSpec::from_value(args.page_numbers.as_ref())?.resolve(total);
    let images = page_images(&doc, &pages)?;
    Ok(ExtractedImages {
        count: images.len(),
        images,
    })
}
