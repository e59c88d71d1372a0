//! PDF container operations built on lopdf.
//!
//! Functions here work on `lopdf::Document` values or local paths; resolving
//! file references and storing outputs happens in the `api` layer.

pub mod assemble;
pub mod compress;
pub mod convert;
pub mod flatten;
pub mod fonts;
pub mod info;
pub mod layout;
pub mod ocr;
pub mod overlay;
pub mod pages;
pub mod protect;
pub mod tables;
pub mod tools;
pub mod watermark;

use std::path::Path;

use lopdf::{Document, Object, ObjectId};

use crate::error::ProcessError;

/// US Letter, used when a page has no resolvable MediaBox.
const DEFAULT_MEDIABOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// Upper bound on `/Parent` hops when resolving inherited page attributes.
const MAX_TREE_DEPTH: usize = 32;

pub fn load_document(path: &Path) -> Result<Document, ProcessError> {
    let bytes = std::fs::read(path).map_err(|e| ProcessError::ReadDocument {
        path: path.to_path_buf(),
        source: e,
    })?;
    load_document_bytes(&bytes)
}

pub fn load_document_bytes(bytes: &[u8]) -> Result<Document, ProcessError> {
    Document::load_mem(bytes)
        .map_err(|e| ProcessError::PdfProcessing(format!("Failed to load PDF: {}", e)))
}

pub fn save_document(doc: &mut Document) -> Result<Vec<u8>, ProcessError> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| ProcessError::PdfProcessing(format!("Failed to save PDF: {}", e)))?;
    Ok(buffer)
}

pub fn page_count(doc: &Document) -> usize {
    doc.get_pages().len()
}

pub fn object_to_f64(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

/// Follows a reference (one level) to the target object.
pub fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Result<&'a Object, ProcessError> {
    match obj {
        Object::Reference(id) => Ok(doc.get_object(*id)?),
        other => Ok(other),
    }
}

/// Looks up a page attribute on the page or, failing that, on its ancestors.
pub fn inherited_attribute<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(value);
        }
        let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }
    None
}

/// Returns the page MediaBox as `[x0, y0, x1, y1]`.
pub fn media_box(doc: &Document, page_id: ObjectId) -> [f64; 4] {
    let values = inherited_attribute(doc, page_id, b"MediaBox")
        .and_then(|obj| resolve(doc, obj).ok())
        .and_then(|obj| obj.as_array().ok())
        .map(|arr| {
            arr.iter()
                .filter_map(|o| resolve(doc, o).ok().and_then(object_to_f64))
                .collect::<Vec<f64>>()
        });

    match values {
        Some(v) if v.len() == 4 => [v[0], v[1], v[2], v[3]],
        _ => DEFAULT_MEDIABOX,
    }
}

/// Page width and height in points.
pub fn page_dimensions(doc: &Document, page_id: ObjectId) -> (f64, f64) {
    let [x0, y0, x1, y1] = media_box(doc, page_id);
    ((x1 - x0).abs(), (y1 - y0).abs())
}

/// Decodes a PDF text string (UTF-16BE with BOM, otherwise PDFDocEncoding
/// approximated as Latin-1).
pub fn decode_text_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|&b| b as char).collect()
}

/// Formats a byte count with one decimal: `B`, `KB`, `MB`, `GB`, then `TB`.
pub fn human_size(size_bytes: u64) -> String {
    let mut size = size_bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if size < 1024.0 {
            return format!("{:.1} {}", size, unit);
        }
        size /= 1024.0;
    }
    format!("{:.1} TB", size)
}

/// Formats a content-stream operand with at most four decimals.
pub fn format_number(value: f64) -> String {
    let text = format!("{:.4}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    match text {
        "" | "-0" => "0".to_string(),
        other => other.to_string(),
    }
}

/// Appends `.pdf` unless the name already ends with it.
pub fn ensure_pdf_extension(filename: &str) -> String {
    if filename.ends_with(".pdf") {
        filename.to_string()
    } else {
        format!("{}.pdf", filename)
    }
}
