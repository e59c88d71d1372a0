//! Read-only inspection: document metadata, page text and embedded images.

use lopdf::{Dictionary, Document, Object};
use serde::Serialize;

use super::overlay::page_resources;
use super::{decode_text_string, human_size, page_dimensions, resolve};
use crate::error::ProcessError;

#[derive(Debug, Clone, Serialize)]
pub struct DocumentInfo {
    pub pages: usize,
    pub file_size: u64,
    pub file_size_human: String,
    pub title: String,
    pub author: String,
    pub subject: String,
    pub creator: String,
    pub producer: String,
    pub encrypted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

pub fn document_info(doc: &Document, file_size: u64) -> DocumentInfo {
    let info = info_dictionary(doc);
    let field = |key: &[u8]| -> String {
        info.and_then(|d| d.get(key).ok())
            .and_then(|obj| resolve(doc, obj).ok())
            .and_then(|obj| match obj {
                Object::String(bytes, _) => Some(decode_text_string(bytes)),
                Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
                _ => None,
            })
            .unwrap_or_default()
    };

    let pages = doc.get_pages();
    let first_page = pages.values().next().map(|id| page_dimensions(doc, *id));

    DocumentInfo {
        pages: pages.len(),
        file_size,
        file_size_human: human_size(file_size),
        title: field(b"Title"),
        author: field(b"Author"),
        subject: field(b"Subject"),
        creator: field(b"Creator"),
        producer: field(b"Producer"),
        encrypted: doc.trailer.has(b"Encrypt"),
        width: first_page.map(|(w, _)| w),
        height: first_page.map(|(_, h)| h),
    }
}

fn info_dictionary(doc: &Document) -> Option<&Dictionary> {
    let info = doc.trailer.get(b"Info").ok()?;
    match resolve(doc, info).ok()? {
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PageText {
    pub page: u32,
    pub text: String,
}

/// Text of the given 1-based pages. Pages whose text cannot be decoded yield
/// an empty string rather than failing the whole request.
pub fn extract_text(doc: &Document, pages: &[u32]) -> Vec<PageText> {
    let _span = tracing::info_span!("pdf.extract_text", pages = pages.len()).entered();

    pages
        .iter()
        .map(|&page| {
            let text = doc.extract_text(&[page]).unwrap_or_else(|e| {
                tracing::debug!(page, error = %e, "text extraction failed");
                String::new()
            });
            PageText { page, text }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageInfo {
    pub page: u32,
    pub name: String,
    pub width: i64,
    pub height: i64,
    pub color_space: String,
}

/// Image XObjects referenced from the resources of the given 1-based pages.
pub fn extract_images(doc: &Document, pages: &[u32]) -> Result<Vec<ImageInfo>, ProcessError> {
    let page_ids = doc.get_pages();
    let mut images = Vec::new();

    for &page in pages {
        let Some(page_id) = page_ids.get(&page) else {
            continue;
        };
        let resources = page_resources(doc, *page_id)?;
        let xobjects = match resources.get(b"XObject") {
            Ok(obj) => match resolve(doc, obj)? {
                Object::Dictionary(dict) => dict.clone(),
                _ => continue,
            },
            Err(_) => continue,
        };

        for (name, obj) in xobjects.iter() {
            let Object::Stream(stream) = resolve(doc, obj)? else {
                continue;
            };
            let is_image = matches!(stream.dict.get(b"Subtype"), Ok(Object::Name(n)) if n == b"Image");
            if !is_image {
                continue;
            }

            let int = |key: &[u8]| {
                stream
                    .dict
                    .get(key)
                    .ok()
                    .and_then(|o| o.as_i64().ok())
                    .unwrap_or(0)
            };

            images.push(ImageInfo {
                page,
                name: format!("/{}", String::from_utf8_lossy(name)),
                width: int(b"Width"),
                height: int(b"Height"),
                color_space: stream
                    .dict
                    .get(b"ColorSpace")
                    .ok()
                    .map(|cs| describe_color_space(doc, cs))
                    .unwrap_or_default(),
            });
        }
    }

    Ok(images)
}

fn describe_color_space(doc: &Document, obj: &Object) -> String {
    match resolve(doc, obj) {
        Ok(Object::Name(name)) => format!("/{}", String::from_utf8_lossy(name)),
        Ok(Object::Array(items)) => {
            let parts: Vec<String> = items
                .iter()
                .map(|item| match item {
                    Object::Name(name) => format!("/{}", String::from_utf8_lossy(name)),
                    Object::Reference((id, generation)) => format!("{} {} R", id, generation),
                    Object::Integer(i) => i.to_string(),
                    _ => "?".to_string(),
                })
                .collect();
            format!("[{}]", parts.join(", "))
        }
        _ => String::new(),
    }
}
