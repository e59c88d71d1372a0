//! Isolated suite for integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lopdf::Document;
use serde_json::{Map, Value};
use tempfile::TempDir;

use pdf_suite::db::Database;
use pdf_suite::{ApiResponse, CallContext, Config, FileStore, PdfSuite, PdfSuiteService, Visibility};

/// A running suite over a temporary site directory and an in-memory
/// database, with one batch worker.
pub struct TestHarness {
    temp_dir: TempDir,
    service: Option<PdfSuiteService>,
    ctx: CallContext,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config = Config {
            site_directory: temp_dir.path().to_string_lossy().to_string(),
            worker_count: 1,
            ..Config::default()
        };
        let db = Database::open_in_memory().expect("Failed to open database");
        let service = PdfSuiteService::start_with(config, db).expect("Failed to start suite");

        Self {
            temp_dir,
            service: Some(service),
            ctx: CallContext::new("tester@example.com"),
        }
    }

    pub fn suite(&self) -> &Arc<PdfSuite> {
        self.service.as_ref().expect("suite running").suite()
    }

    pub fn site_directory(&self) -> PathBuf {
        self.temp_dir.path().to_path_buf()
    }

    pub fn as_user(mut self, user: &str) -> Self {
        self.ctx = CallContext::new(user);
        self
    }

    /// Stores `bytes` in the public area and returns the file reference.
    pub fn upload(&self, bytes: &[u8], filename: &str) -> String {
        self.suite()
            .store()
            .store(bytes, filename, Visibility::Public)
            .expect("Failed to store fixture")
    }

    pub fn call(&self, method: &str, args: Value) -> ApiResponse {
        let args: Map<String, Value> = match args {
            Value::Object(map) => map,
            other => panic!("arguments must be an object, got {}", other),
        };
        self.suite().call(&self.ctx, method, args)
    }

    /// Calls `method` and returns its data, failing the test on an error
    /// envelope.
    pub fn call_ok(&self, method: &str, args: Value) -> Value {
        let response = self.call(method, args);
        assert!(
            response.success,
            "{} failed: {}",
            method,
            response.error.unwrap_or_default()
        );
        response.data.unwrap_or(Value::Null)
    }

    /// Like [`call_ok`](Self::call_ok) on behalf of `user`.
    pub fn call_as_ok(&self, user: &str, method: &str, args: Value) -> Value {
        let args = match args {
            Value::Object(map) => map,
            other => panic!("arguments must be an object, got {}", other),
        };
        let response = self.suite().call(&CallContext::new(user), method, args);
        assert!(response.success, "{} failed: {:?}", method, response.error);
        response.data.unwrap_or(Value::Null)
    }

    pub fn load_pdf(&self, file_ref: &str) -> Document {
        let path = self
            .suite()
            .store()
            .resolve(file_ref)
            .expect("output file exists");
        Document::load(path).expect("output is a readable PDF")
    }

    /// Polls a batch until it reaches a terminal state.
    pub fn wait_for_batch(&self, batch_name: &str) -> Value {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            let status = self.call_ok(
                "pdf_suite.api.batch.get_batch_status",
                serde_json::json!({ "batch_name": batch_name }),
            );
            if status["status"] == "Completed" || status["status"] == "Failed" {
                return status;
            }
            assert!(Instant::now() < deadline, "batch {} did not finish", batch_name);
            std::thread::sleep(Duration::from_millis(20));
        }
    }
}

impl Drop for TestHarness {
    fn drop(&mut self) {
        if let Some(service) = self.service.take() {
            service.shutdown();
        }
    }
}
