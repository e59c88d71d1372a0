//! Builders for synthetic test PDFs.

#![allow(dead_code)]

use lopdf::{dictionary, Document, Object, Stream};

/// Builds a PDF whose pages each show lines of Courier text.
pub struct PdfBuilder {
    pages: Vec<Vec<String>>,
    origin: (i64, i64),
    width: i64,
    height: i64,
    title: Option<String>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self {
            pages: Vec::new(),
            origin: (0, 0),
            width: 612,
            height: 792,
            title: None,
        }
    }

    /// `count` pages labelled `Page 1`, `Page 2`, ...
    pub fn numbered_pages(mut self, count: u32) -> Self {
        for n in 1..=count {
            self.pages.push(vec![format!("Page {}", n)]);
        }
        self
    }

    pub fn page(mut self, lines: &[&str]) -> Self {
        self.pages
            .push(lines.iter().map(|line| line.to_string()).collect());
        self
    }

    pub fn media_box(mut self, width: i64, height: i64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Moves the MediaBox's lower-left corner away from (0, 0).
    pub fn origin(mut self, x: i64, y: i64) -> Self {
        self.origin = (x, y);
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn build_document(&self) -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for lines in &self.pages {
            let mut content = String::from("BT /F1 12 Tf 14 TL 50 700 Td");
            for line in lines {
                content.push_str(&format!(" ({}) Tj T*", line));
            }
            content.push_str(" ET");

            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let (x, y) = self.origin;
        let media_box: Vec<Object> = vec![
            x.into(),
            y.into(),
            (x + self.width).into(),
            (y + self.height).into(),
        ];
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids.clone(),
                "Count" => kids.len() as i64,
                "Resources" => resources_id,
                "MediaBox" => media_box,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        if let Some(title) = &self.title {
            let info_id = doc.add_object(dictionary! {
                "Title" => Object::string_literal(title.as_str()),
            });
            doc.trailer.set("Info", info_id);
        }
        doc
    }

    pub fn build(&self) -> Vec<u8> {
        let mut doc = self.build_document();
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("Failed to serialize test PDF");
        bytes
    }
}

/// Text of the first text-showing operand on each page, in page order.
pub fn page_labels(doc: &Document) -> Vec<String> {
    doc.get_pages()
        .values()
        .map(|id| {
            let content = doc.get_page_content(*id).expect("page content");
            let content = String::from_utf8_lossy(&content).into_owned();
            content
                .split('(')
                .nth(1)
                .and_then(|rest| rest.split(')').next())
                .unwrap_or_default()
                .to_string()
        })
        .collect()
}
