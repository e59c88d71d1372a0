//! Batch jobs submitted through the call surface and run by the worker pool.

mod common;

use common::{PdfBuilder, TestHarness};
use pdf_suite::BatchPhase;
use serde_json::json;

#[test]
fn test_compress_batch_records_each_item() {
    let harness = TestHarness::new();
    let files: Vec<String> = (1..=3)
        .map(|n| {
            harness.upload(
                &PdfBuilder::new().numbered_pages(n).build(),
                &format!("doc{}.pdf", n),
            )
        })
        .collect();

    let started = harness.call_ok(
        "pdf_suite.api.batch.start_batch",
        json!({"operation": "compress", "file_urls": files, "options": {"quality": "high"}}),
    );
    assert_eq!(started["status"], "Queued");

    let status = harness.wait_for_batch(started["batch_name"].as_str().unwrap());
    assert_eq!(status["status"], "Completed", "{}", status["error"]);
    assert_eq!(status["total_files"], 3);
    assert_eq!(status["processed_files"], 3);
    assert_eq!(status["results"].as_array().unwrap().len(), 3);
    assert_eq!(status["error"], "");
}

#[test]
fn test_failed_item_stops_the_batch() {
    let harness = TestHarness::new();
    let good = harness.upload(&PdfBuilder::new().numbered_pages(1).build(), "good.pdf");

    let started = harness.call_ok(
        "pdf_suite.api.batch.start_batch",
        json!({
            "operation": "watermark",
            "file_urls": [good, "/files/missing.pdf", good],
            "options": "{\"text\": \"DRAFT\"}",
        }),
    );

    let status = harness.wait_for_batch(started["batch_name"].as_str().unwrap());
    assert_eq!(status["status"], "Failed");
    assert_eq!(status["processed_files"], 1);
    assert_eq!(status["results"].as_array().unwrap().len(), 1);
    assert_eq!(status["error"], "File not found: /files/missing.pdf");
}

#[test]
fn test_merge_batch_is_one_step() {
    let harness = TestHarness::new();
    let a = harness.upload(&PdfBuilder::new().numbered_pages(2).build(), "a.pdf");
    let b = harness.upload(&PdfBuilder::new().numbered_pages(2).build(), "b.pdf");

    let started = harness.call_ok(
        "pdf_suite.api.batch.start_batch",
        json!({"operation": "merge", "file_urls": [a, b], "options": {"output_filename": "all.pdf"}}),
    );

    let status = harness.wait_for_batch(started["batch_name"].as_str().unwrap());
    assert_eq!(status["status"], "Completed");
    assert_eq!(status["processed_files"], 2);
    assert_eq!(status["results"].as_array().unwrap().len(), 1);
    assert_eq!(status["results"][0]["filename"], "all.pdf");
    assert_eq!(status["results"][0]["pages"], 4);
}

#[test]
fn test_operation_without_handler_fails() {
    let harness = TestHarness::new();
    let a = harness.upload(&PdfBuilder::new().numbered_pages(2).build(), "a.pdf");

    let started = harness.call_ok(
        "pdf_suite.api.batch.start_batch",
        json!({"operation": "split", "file_urls": [a]}),
    );

    let status = harness.wait_for_batch(started["batch_name"].as_str().unwrap());
    assert_eq!(status["status"], "Failed");
    assert_eq!(status["error"], "Unknown operation: split");
    assert_eq!(status["processed_files"], 0);
}

#[test]
fn test_rejected_submissions() {
    let harness = TestHarness::new();

    let response = harness.call(
        "pdf_suite.api.batch.start_batch",
        json!({"operation": "delete_everything", "file_urls": ["/files/a.pdf"]}),
    );
    assert!(!response.success);
    assert_eq!(
        response.error.as_deref(),
        Some("Invalid operation: delete_everything")
    );

    let response = harness.call(
        "pdf_suite.api.batch.start_batch",
        json!({"operation": "compress", "file_urls": []}),
    );
    assert_eq!(response.error.as_deref(), Some("No files provided"));
}

#[test]
fn test_progress_events_are_broadcast() {
    let harness = TestHarness::new();
    let mut events = harness.suite().progress().subscribe();
    let a = harness.upload(&PdfBuilder::new().numbered_pages(1).build(), "a.pdf");

    let started = harness.call_ok(
        "pdf_suite.api.batch.start_batch",
        json!({"operation": "compress", "file_urls": [a]}),
    );
    let batch_name = started["batch_name"].as_str().unwrap().to_string();
    harness.wait_for_batch(&batch_name);

    // The terminal event is sent after the status is persisted.
    let mut phases = Vec::new();
    loop {
        let event = events.blocking_recv().expect("progress channel open");
        assert_eq!(event.batch_id, batch_name);
        phases.push(event.phase);
        if matches!(event.phase, BatchPhase::Completed | BatchPhase::Failed) {
            break;
        }
    }
    assert_eq!(
        phases,
        vec![
            BatchPhase::Queued,
            BatchPhase::Started,
            BatchPhase::ItemCompleted,
            BatchPhase::Completed,
        ]
    );
}
