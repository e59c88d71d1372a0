//! Page composition: stacking extra content streams above or below a page's
//! existing content, and registering the resources they use.

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use super::{inherited_attribute, resolve};
use crate::error::ProcessError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    /// Painted after the page content, covering it.
    Over,
    /// Painted before the page content, showing through transparent areas.
    Under,
}

/// Adds `content` to the page as a new content stream on `layer`.
///
/// The original content is bracketed in `q`/`Q` so graphics state it leaves
/// behind cannot leak into an overlay.
pub fn compose(
    doc: &mut Document,
    page_id: ObjectId,
    content: Vec<u8>,
    layer: Layer,
) -> Result<(), ProcessError> {
    let existing = content_references(doc, page_id)?;

    let mut streams: Vec<Object> = Vec::with_capacity(existing.len() + 3);
    match layer {
        Layer::Over => {
            if existing.is_empty() {
                streams.push(add_stream(doc, content).into());
            } else {
                streams.push(add_stream(doc, b"q\n".to_vec()).into());
                streams.extend(existing);
                let mut tail = b"\nQ\n".to_vec();
                tail.extend_from_slice(&content);
                streams.push(add_stream(doc, tail).into());
            }
        }
        Layer::Under => {
            let mut head = b"q\n".to_vec();
            head.extend_from_slice(&content);
            head.extend_from_slice(b"\nQ\n");
            streams.push(add_stream(doc, head).into());
            streams.extend(existing);
        }
    }

    doc.get_dictionary_mut(page_id)?
        .set("Contents", Object::Array(streams));
    Ok(())
}

fn add_stream(doc: &mut Document, content: Vec<u8>) -> ObjectId {
    doc.add_object(Stream::new(dictionary! {}, content))
}

/// The page's content stream references, flattened to a list.
fn content_references(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>, ProcessError> {
    let page = doc.get_dictionary(page_id)?;
    let contents = match page.get(b"Contents") {
        Ok(obj) => obj,
        Err(_) => return Ok(Vec::new()),
    };

    match contents {
        Object::Reference(id) => match doc.get_object(*id)? {
            // An indirect array of streams.
            Object::Array(items) => Ok(items.clone()),
            _ => Ok(vec![Object::Reference(*id)]),
        },
        Object::Array(items) => Ok(items.clone()),
        _ => Err(ProcessError::PdfProcessing(
            "Page content is not a stream reference".to_string(),
        )),
    }
}

/// Registers `value` under `/Resources/<category>/<name>` on the page.
///
/// The page receives its own direct resources dictionary, so resources shared
/// with other pages through the page tree are left untouched.
pub fn add_resource(
    doc: &mut Document,
    page_id: ObjectId,
    category: &str,
    name: &str,
    value: Object,
) -> Result<(), ProcessError> {
    let mut resources = page_resources(doc, page_id)?;

    let mut entries = match resources.get(category.as_bytes()) {
        Ok(obj) => match resolve(doc, obj)? {
            Object::Dictionary(dict) => dict.clone(),
            _ => Dictionary::new(),
        },
        Err(_) => Dictionary::new(),
    };
    entries.set(name, value);
    resources.set(category, Object::Dictionary(entries));

    doc.get_dictionary_mut(page_id)?
        .set("Resources", Object::Dictionary(resources));
    Ok(())
}

/// Owned copy of the page's effective resources dictionary.
pub fn page_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary, ProcessError> {
    match inherited_attribute(doc, page_id, b"Resources") {
        Some(obj) => match resolve(doc, obj)? {
            Object::Dictionary(dict) => Ok(dict.clone()),
            _ => Ok(Dictionary::new()),
        },
        None => Ok(Dictionary::new()),
    }
}

/// First `<prefix><n>` not yet used in `/Resources/<category>` of the page.
pub fn unique_resource_name(
    doc: &Document,
    page_id: ObjectId,
    category: &str,
    prefix: &str,
) -> Result<String, ProcessError> {
    let resources = page_resources(doc, page_id)?;
    let entries = match resources.get(category.as_bytes()) {
        Ok(obj) => match resolve(doc, obj)? {
            Object::Dictionary(dict) => Some(dict.clone()),
            _ => None,
        },
        Err(_) => None,
    };

    let taken = |candidate: &str| {
        entries
            .as_ref()
            .map(|d| d.has(candidate.as_bytes()))
            .unwrap_or(false)
    };

    let mut counter = 1u32;
    loop {
        let candidate = format!("{}{}", prefix, counter);
        if !taken(&candidate) {
            return Ok(candidate);
        }
        counter += 1;
    }
}
