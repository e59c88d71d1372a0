use lopdf::{Document, Object};

use crate::error::ProcessError;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlattenReport {
    pub removed_form: bool,
    pub pages_with_annotations: usize,
}

/// Drops the interactive form and every page's annotations.
pub fn flatten(doc: &mut Document) -> Result<FlattenReport, ProcessError> {
    let _span = tracing::info_span!("pdf.flatten").entered();

    let mut report = FlattenReport::default();

    let root_id = doc.trailer.get(b"Root")?.as_reference()?;
    if let Object::Dictionary(catalog) = doc.get_object_mut(root_id)? {
        report.removed_form = catalog.remove(b"AcroForm").is_some();
    }

    let pages: Vec<_> = doc.get_pages().values().copied().collect();
    for page_id in pages {
        let page = doc.get_dictionary_mut(page_id)?;
        if page.remove(b"Annots").is_some() {
            report.pages_with_annotations += 1;
        }
    }

    // Annotation and field objects are now unreachable.
    doc.prune_objects();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::test_support::*;
    use lopdf::dictionary;

    #[test]
    fn test_flatten_removes_form_and_annotations() {
        let mut doc = sample_document(2);

        let field_id = doc.add_object(dictionary! { "FT" => "Tx", "T" => Object::string_literal("name") });
        let annot_id = doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "Rect" => vec![0.into(), 0.into(), 10.into(), 10.into()],
        });

        let root_id = doc.trailer.get(b"Root").unwrap().as_reference().unwrap();
        doc.get_dictionary_mut(root_id)
            .unwrap()
            .set("AcroForm", dictionary! { "Fields" => vec![field_id.into()] });
        let page_id = *doc.get_pages().get(&1).unwrap();
        doc.get_dictionary_mut(page_id)
            .unwrap()
            .set("Annots", vec![Object::Reference(annot_id)]);

        let report = flatten(&mut doc).unwrap();
        assert!(report.removed_form);
        assert_eq!(report.pages_with_annotations, 1);

        let root_id = doc.trailer.get(b"Root").unwrap().as_reference().unwrap();
        assert!(!doc.get_dictionary(root_id).unwrap().has(b"AcroForm"));
        for id in doc.get_pages().values() {
            assert!(!doc.get_dictionary(*id).unwrap().has(b"Annots"));
        }
        assert_eq!(doc.get_pages().len(), 2);
    }

    #[test]
    fn test_flatten_plain_document_is_noop() {
        let mut doc = sample_document(1);
        let report = flatten(&mut doc).unwrap();
        assert_eq!(report, FlattenReport::default());
    }
}
