//! Builds new documents out of pages of existing ones (merge, split, extract).

use std::collections::HashSet;

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};

use super::{inherited_attribute, object_to_f64};
use crate::error::ProcessError;

/// Attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE_KEYS: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Pages taken from one source document.
pub struct PageSource {
    pub document: Document,
    /// 1-based page numbers in output order; `None` takes every page.
    /// Numbers past the end of the document are ignored.
    pub pages: Option<Vec<u32>>,
    /// Added to each page's `/Rotate`. Expected to be a multiple of 90.
    pub rotate: i64,
}

impl PageSource {
    pub fn all(document: Document) -> Self {
        Self {
            document,
            pages: None,
            rotate: 0,
        }
    }

    pub fn select(document: Document, pages: Vec<u32>) -> Self {
        Self {
            document,
            pages: Some(pages),
            rotate: 0,
        }
    }

    pub fn with_rotation(mut self, degrees: i64) -> Self {
        self.rotate = degrees;
        self
    }
}

/// Concatenates the selected pages of every source into a new document.
pub fn assemble(sources: Vec<PageSource>) -> Result<Document, ProcessError> {
    let _span = tracing::info_span!("pdf.assemble", sources = sources.len()).entered();

    let mut output = Document::with_version("1.5");
    let pages_id = output.new_object_id();
    let mut next_id = output.max_id + 1;
    let mut kids: Vec<Object> = Vec::new();

    for source in sources {
        let mut doc = source.document;
        doc.renumber_objects_with(next_id);

        let page_map = doc.get_pages();
        let wanted: Vec<ObjectId> = match &source.pages {
            None => page_map.values().copied().collect(),
            Some(numbers) => numbers
                .iter()
                .filter_map(|n| page_map.get(n).copied())
                .collect(),
        };

        // Detach everything first so repeated pages see the original attributes.
        let detached = wanted
            .iter()
            .map(|&id| detach_page(&doc, id, pages_id, source.rotate).map(|page| (id, page)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut placed = HashSet::new();
        for (page_id, page) in detached {
            let target = if placed.insert(page_id) {
                page_id
            } else {
                doc.new_object_id()
            };
            doc.objects.insert(target, Object::Dictionary(page));
            kids.push(target.into());
        }

        next_id = doc.max_id + 1;
        output.objects.extend(doc.objects);
    }

    output.max_id = next_id - 1;
    let count = kids.len() as i64;
    output.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = output.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    output.trailer.set("Root", catalog_id);

    // Source catalogs, page trees and unselected pages are now unreachable.
    output.prune_objects();
    output.renumber_objects();

    Ok(output)
}

/// Copy of a page dictionary with inherited attributes made explicit and the
/// parent pointed at the new page tree.
fn detach_page(
    doc: &Document,
    page_id: ObjectId,
    parent_id: ObjectId,
    rotate: i64,
) -> Result<Dictionary, ProcessError> {
    let mut page = doc.get_dictionary(page_id)?.clone();

    for key in INHERITABLE_KEYS {
        if !page.has(key) {
            if let Some(value) = inherited_attribute(doc, page_id, key) {
                page.set(key.to_vec(), value.clone());
            }
        }
    }

    if rotate != 0 {
        let current = page
            .get(b"Rotate")
            .ok()
            .and_then(object_to_f64)
            .unwrap_or(0.0) as i64;
        page.set("Rotate", (current + rotate).rem_euclid(360));
    }

    page.set("Parent", parent_id);
    Ok(page)
}

/// Merges whole documents in order.
pub fn merge_documents(documents: Vec<Document>) -> Result<Document, ProcessError> {
    assemble(documents.into_iter().map(PageSource::all).collect())
}

/// New document holding `pages` (1-based) of `source`.
pub fn extract(source: &Document, pages: &[u32]) -> Result<Document, ProcessError> {
    assemble(vec![PageSource::select(source.clone(), pages.to_vec())])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::page_count;
    use crate::pdf::test_support::*;

    fn rotation_of(doc: &Document, page: u32) -> i64 {
        let id = doc.get_pages()[&page];
        doc.get_dictionary(id)
            .unwrap()
            .get(b"Rotate")
            .ok()
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(0)
    }

    #[test]
    fn test_merge_keeps_page_order() {
        let a = sample_document_with_text(&["A1".to_string(), "A2".to_string()]);
        let b = sample_document_with_text(&["B1".to_string(), "B2".to_string(), "B3".to_string()]);

        let merged = merge_documents(vec![a, b]).unwrap();
        assert_eq!(page_count(&merged), 5);

        let contents = page_contents(&merged);
        for (content, expected) in contents.iter().zip(["A1", "A2", "B1", "B2", "B3"]) {
            assert!(content.contains(&format!("({})", expected)), "{}", content);
        }
    }

    #[test]
    fn test_merged_pages_keep_inherited_media_box() {
        let merged = merge_documents(vec![sample_document(1), sample_document(1)]).unwrap();
        for page_id in merged.get_pages().values() {
            let page = merged.get_dictionary(*page_id).unwrap();
            assert!(page.has(b"MediaBox"));
            assert!(page.has(b"Resources"));
        }
    }

    #[test]
    fn test_merged_document_saves_and_reloads() {
        let mut merged = merge_documents(vec![sample_document(2), sample_document(2)]).unwrap();
        let bytes = crate::pdf::save_document(&mut merged).unwrap();
        let reloaded = crate::pdf::load_document_bytes(&bytes).unwrap();
        assert_eq!(page_count(&reloaded), 4);
    }

    #[test]
    fn test_extract_selected_pages() {
        let source = sample_document(5);
        let extracted = extract(&source, &[4, 2, 9]).unwrap();

        assert_eq!(page_count(&extracted), 2);
        let contents = page_contents(&extracted);
        assert!(contents[0].contains("(Page 4)"));
        assert!(contents[1].contains("(Page 2)"));
    }

    #[test]
    fn test_repeated_page_is_duplicated() {
        let source = sample_document(2);
        let extracted = extract(&source, &[1, 1]).unwrap();

        assert_eq!(page_count(&extracted), 2);
        let ids: Vec<_> = extracted.get_pages().values().copied().collect();
        assert_ne!(ids[0], ids[1]);
    }

    #[test]
    fn test_relative_rotation() {
        let source = PageSource::select(sample_document(2), vec![1]).with_rotation(90);
        let again = PageSource::all(sample_document(1)).with_rotation(-90);

        let merged = assemble(vec![source, again]).unwrap();
        assert_eq!(page_count(&merged), 2);
        assert_eq!(rotation_of(&merged, 1), 90);
        assert_eq!(rotation_of(&merged, 2), 270);
    }
}
