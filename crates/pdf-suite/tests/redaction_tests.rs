//! Region and text redaction through the call surface.

mod common;

use std::sync::Arc;

use lopdf::Document;
use serde_json::{json, Map, Value};
use tempfile::TempDir;

use common::{PdfBuilder, TestHarness};
use pdf_suite::db::Database;
use pdf_suite::error::ProcessError;
use pdf_suite::pdf::layout::{PageWords, Word, WordExtractor};
use pdf_suite::worker::queue;
use pdf_suite::{CallContext, Config, FileStorage, FileStore, PdfSuite, Visibility};

/// Reports one fixed word on page 1.
struct FixedWords(Word);

impl WordExtractor for FixedWords {
    fn extract_words(&self, _doc: &Document) -> Result<Vec<PageWords>, ProcessError> {
        Ok(vec![PageWords {
            page: 1,
            height: 792.0,
            words: vec![self.0.clone()],
        }])
    }
}

fn args(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

fn last_content(doc: &Document) -> String {
    let page_id = *doc.get_pages().get(&1).unwrap();
    String::from_utf8_lossy(&doc.get_page_content(page_id).unwrap()).into_owned()
}

#[test]
fn test_word_box_is_flipped_into_page_space() {
    let dir = TempDir::new().unwrap();
    let config = Config {
        site_directory: dir.path().to_string_lossy().to_string(),
        ..Config::default()
    };
    let store = Arc::new(FileStorage::new(dir.path()));
    let (sender, _receiver) = queue();
    let suite = PdfSuite::new(
        config,
        Database::open_in_memory().unwrap(),
        store.clone(),
        Arc::new(sender),
    )
    .with_word_extractor(Arc::new(FixedWords(Word {
        text: "Secret".to_string(),
        x0: 50.0,
        x1: 90.0,
        top: 100.0,
        bottom: 120.0,
    })));

    let source = store
        .store(&PdfBuilder::new().numbered_pages(1).build(), "a.pdf", Visibility::Public)
        .unwrap();
    let response = suite.call(
        &CallContext::guest(),
        "pdf_suite.api.redact.redact_text",
        args(json!({"file_url": source, "search_text": "secret"})),
    );

    let data = response.data.expect("redaction succeeds");
    assert_eq!(data["redacted_areas"], 1);
    assert_eq!(data["filename"], "redacted.pdf");

    let path = store.resolve(data["file_url"].as_str().unwrap()).unwrap();
    let content = last_content(&Document::load(path).unwrap());
    assert!(content.contains("50 672 40 20 re"), "{}", content);
}

#[test]
fn test_redact_areas_covers_each_page() {
    let harness = TestHarness::new();
    let source = harness.upload(&PdfBuilder::new().numbered_pages(2).build(), "a.pdf");

    let data = harness.call_ok(
        "pdf_suite.api.redact.redact_areas",
        json!({
            "file_url": source,
            "redactions": "[{\"page\": 1, \"x\": 10, \"y\": 20, \"width\": 30, \"height\": 40},
                            {\"page\": 9, \"x\": 0, \"y\": 0, \"width\": 5, \"height\": 5}]",
            "output_filename": "clean.pdf",
        }),
    );

    assert_eq!(data["redacted_areas"], 2);
    assert_eq!(data["filename"], "clean.pdf");
    let redacted = harness.load_pdf(data["file_url"].as_str().unwrap());
    assert_eq!(redacted.get_pages().len(), 2);
    assert!(last_content(&redacted).contains("10 20 30 40 re"));
}

#[test]
fn test_redact_areas_requires_regions() {
    let harness = TestHarness::new();
    let source = harness.upload(&PdfBuilder::new().numbered_pages(1).build(), "a.pdf");

    let response = harness.call(
        "pdf_suite.api.redact.redact_areas",
        json!({"file_url": source, "redactions": []}),
    );
    assert_eq!(response.error.as_deref(), Some("No redaction areas specified"));

    let response = harness.call(
        "pdf_suite.api.redact.redact_areas",
        json!({"file_url": source}),
    );
    assert_eq!(response.error.as_deref(), Some("No redaction areas specified"));
}

#[test]
fn test_redact_text_without_matches_writes_nothing() {
    let harness = TestHarness::new();
    let source = harness.upload(
        &PdfBuilder::new().page(&["Nothing to hide here"]).build(),
        "a.pdf",
    );

    let data = harness.call_ok(
        "pdf_suite.api.redact.redact_text",
        json!({"file_url": source, "search_text": "password"}),
    );
    assert_eq!(
        data,
        json!({"message": "No matches found", "redacted_areas": 0})
    );

    let private = harness.site_directory().join("private").join("files");
    let written = std::fs::read_dir(&private).map(|d| d.count()).unwrap_or(0);
    assert_eq!(written, 0);
}

#[test]
fn test_redact_text_requires_query() {
    let harness = TestHarness::new();
    let source = harness.upload(&PdfBuilder::new().numbered_pages(1).build(), "a.pdf");

    let response = harness.call(
        "pdf_suite.api.redact.redact_text",
        json!({"file_url": source, "search_text": ""}),
    );
    assert_eq!(response.error.as_deref(), Some("Search text required"));
}

#[test]
fn test_redact_text_with_content_stream_words() {
    let harness = TestHarness::new();
    let source = harness.upload(
        &PdfBuilder::new()
            .page(&["Account SECRET 42"])
            .page(&["Public page"])
            .build(),
        "a.pdf",
    );

    let data = harness.call_ok(
        "pdf_suite.api.redact.redact_text",
        json!({"file_url": source, "search_text": "secret"}),
    );
    assert_eq!(data["redacted_areas"], 1);
}

#[test]
fn test_redactions_follow_shifted_media_box() {
    let harness = TestHarness::new();
    let source = harness.upload(
        &PdfBuilder::new().origin(0, 100).page(&["SECRET"]).build(),
        "shifted.pdf",
    );

    let data = harness.call_ok(
        "pdf_suite.api.redact.redact_text",
        json!({"file_url": source, "search_text": "secret"}),
    );
    let content = last_content(&harness.load_pdf(data["file_url"].as_str().unwrap()));
    // The word's glyph box starts at y = 697.6 in user space.
    assert!(content.contains("1 0 0 1 0 100 cm"), "{}", content);
    assert!(content.contains("50 597.6 43.2 12 re"), "{}", content);

    let data = harness.call_ok(
        "pdf_suite.api.redact.redact_areas",
        json!({
            "file_url": source,
            "redactions": [{"page": 1, "x": 50, "y": 597.6, "width": 43.2, "height": 12}],
        }),
    );
    let content = last_content(&harness.load_pdf(data["file_url"].as_str().unwrap()));
    assert!(content.contains("1 0 0 1 0 100 cm\n1 1 1 rg"), "{}", content);
    assert!(content.contains("50 597.6 43.2 12 re"), "{}", content);
}
