//! Redaction coordinator.
//!
//! Regions are painted as opaque white rectangles over the page content. The
//! rectangles become part of the page's content streams rather than
//! annotations, but the covered text and graphics are still present in the
//! file underneath them.

use std::collections::BTreeMap;

use lopdf::Document;
use serde::{Deserialize, Serialize};

use crate::error::{PdfSuiteError, Result};
use crate::pdf::layout::{PageWords, Word, WordExtractor};
use crate::pdf::overlay::{compose, Layer};
use crate::pdf::{format_number, load_document, media_box, save_document};
use crate::storage::{FileStore, Visibility};

pub const DEFAULT_OUTPUT_FILENAME: &str = "redacted.pdf";

/// A rectangle to cover, in page space: points from the bottom-left corner
/// of the page's MediaBox.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RedactionSpec {
    /// 1-based.
    pub page: u32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl RedactionSpec {
    /// Region covering `word` on a page of height `page_height`. Word boxes
    /// are in extraction space (origin top-left, y downwards).
    pub fn for_word(page: u32, word: &Word, page_height: f64) -> Self {
        let height = word.bottom - word.top;
        Self {
            page,
            x: word.x0,
            y: page_height - word.top - height,
            width: word.x1 - word.x0,
            height,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.page == 0 {
            return Err(PdfSuiteError::validation("Redaction page numbers start at 1"));
        }
        let finite = [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite());
        if !finite || self.width < 0.0 || self.height < 0.0 {
            return Err(PdfSuiteError::validation(format!(
                "Invalid redaction area on page {}",
                self.page
            )));
        }
        Ok(())
    }
}

/// Partitions regions by page, keeping input order within a page.
pub fn group_by_page(regions: &[RedactionSpec]) -> BTreeMap<u32, Vec<RedactionSpec>> {
    let mut groups: BTreeMap<u32, Vec<RedactionSpec>> = BTreeMap::new();
    for region in regions {
        groups.entry(region.page).or_default().push(*region);
    }
    groups
}

/// Overlay painting `regions` as opaque white boxes. `origin` is the
/// MediaBox's lower-left corner in user space.
fn overlay_content(regions: &[RedactionSpec], origin: (f64, f64)) -> Vec<u8> {
    let mut content = format!(
        "q\n1 0 0 1 {} {} cm\n1 1 1 rg\n1 1 1 RG\n",
        format_number(origin.0),
        format_number(origin.1)
    );
    for r in regions {
        content.push_str(&format!(
            "{} {} {} {} re\nB\n",
            format_number(r.x),
            format_number(r.y),
            format_number(r.width),
            format_number(r.height)
        ));
    }
    content.push('Q');
    content.into_bytes()
}

/// Paints every region onto its page with one overlay per page. Regions on
/// pages past the end of the document are skipped. Returns the number of
/// pages changed.
pub fn apply_regions(doc: &mut Document, regions: &[RedactionSpec]) -> Result<usize> {
    if regions.is_empty() {
        return Err(PdfSuiteError::EmptyInput(
            "No redaction areas specified".to_string(),
        ));
    }
    for region in regions {
        region.validate()?;
    }

    let pages = doc.get_pages();
    let mut changed = 0;
    for (page, group) in group_by_page(regions) {
        let Some(&page_id) = pages.get(&page) else {
            tracing::debug!(page, "skipping redaction past the last page");
            continue;
        };
        let [x0, y0, x1, y1] = media_box(doc, page_id);
        let origin = (x0.min(x1), y0.min(y1));
        compose(doc, page_id, overlay_content(&group, origin), Layer::Over)?;
        changed += 1;
    }
    Ok(changed)
}

/// Regions for every word containing `query`, compared case-insensitively.
pub fn find_text(pages: &[PageWords], query: &str) -> Vec<RedactionSpec> {
    let needle = query.to_lowercase();
    pages
        .iter()
        .flat_map(|page| {
            page.words
                .iter()
                .filter(|word| word.text.to_lowercase().contains(&needle))
                .map(|word| RedactionSpec::for_word(page.page, word, page.height))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RedactionOutcome {
    Redacted {
        file_url: String,
        filename: String,
        redacted_areas: usize,
    },
    /// Nothing matched; no file was written.
    NoMatches {
        message: String,
        redacted_areas: usize,
    },
}

impl RedactionOutcome {
    fn no_matches() -> Self {
        RedactionOutcome::NoMatches {
            message: "No matches found".to_string(),
            redacted_areas: 0,
        }
    }
}

pub struct Redactor<'a> {
    store: &'a dyn FileStore,
    extractor: &'a dyn WordExtractor,
}

impl<'a> Redactor<'a> {
    pub fn new(store: &'a dyn FileStore, extractor: &'a dyn WordExtractor) -> Self {
        Self { store, extractor }
    }

    pub fn redact_by_regions(
        &self,
        file_ref: &str,
        regions: &[RedactionSpec],
        output_filename: Option<&str>,
    ) -> Result<RedactionOutcome> {
        let _span = tracing::info_span!("redact.regions", regions = regions.len()).entered();

        if regions.is_empty() {
            return Err(PdfSuiteError::EmptyInput(
                "No redaction areas specified".to_string(),
            ));
        }

        let path = self.store.resolve(file_ref)?;
        let mut doc = load_document(&path)?;
        apply_regions(&mut doc, regions)?;
        let bytes = save_document(&mut doc)?;

        let filename = output_filename
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(DEFAULT_OUTPUT_FILENAME)
            .to_string();
        let file_url = self.store.store(&bytes, &filename, Visibility::Private)?;

        Ok(RedactionOutcome::Redacted {
            file_url,
            filename,
            redacted_areas: regions.len(),
        })
    }

    pub fn redact_by_text(
        &self,
        file_ref: &str,
        query: &str,
        output_filename: Option<&str>,
    ) -> Result<RedactionOutcome> {
        let _span = tracing::info_span!("redact.text").entered();

        if query.is_empty() {
            return Err(PdfSuiteError::validation("Search text required"));
        }

        let path = self.store.resolve(file_ref)?;
        let doc = load_document(&path)?;
        let pages = self.extractor.extract_words(&doc)?;
        let regions = find_text(&pages, query);

        if regions.is_empty() {
            return Ok(RedactionOutcome::no_matches());
        }
        tracing::debug!(matches = regions.len(), "text matches found");
        self.redact_by_regions(file_ref, &regions, output_filename)
    }
}
