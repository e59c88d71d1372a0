use std::path::PathBuf;
use std::sync::Arc;

use lopdf::Document;
use serde::Serialize;
use serde_json::{Map, Value};
use tempfile::TempDir;

use super::{compress, dispatch, merge, ocr, watermark, ApiResponse, CallContext};
use crate::batch::{BatchEngine, BatchHandlers, BatchSettings, SqliteBatchJobRepository};
use crate::broadcast::BatchProgressBroadcaster;
use crate::config::Config;
use crate::db::Database;
use crate::error::{ProcessError, Result};
use crate::pdf::compress::Quality;
use crate::pdf::layout::{ContentStreamWordExtractor, WordExtractor};
use crate::pdf::ocr::{OcrProcessor, OcrTools};
use crate::pdf::watermark::TextWatermark;
use crate::pdf::{load_document, save_document};
use crate::storage::{FileStore, Visibility};
use crate::worker::JobQueue;

/// Reference and name of a stored output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedFile {
    pub file_url: String,
    pub filename: String,
}

/// A stored PDF output with its page count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredPdf {
    pub file_url: String,
    pub filename: String,
    pub pages: usize,
}

impl StoredPdf {
    pub(crate) fn new(saved: SavedFile, pages: usize) -> Self {
        Self {
            file_url: saved.file_url,
            filename: saved.filename,
            pages,
        }
    }
}

/// Shared state behind every call: configuration, file store, database and
/// the batch engine.
pub struct PdfSuite {
    config: Config,
    store: Arc<dyn FileStore>,
    db: Database,
    engine: Arc<BatchEngine>,
    ocr: OcrProcessor,
    progress: BatchProgressBroadcaster,
    words: Arc<dyn WordExtractor>,
}

impl PdfSuite {
    pub fn new(
        config: Config,
        db: Database,
        store: Arc<dyn FileStore>,
        queue: Arc<dyn JobQueue>,
    ) -> Self {
        let progress = BatchProgressBroadcaster::default();
        let engine = BatchEngine::new(
            Arc::new(SqliteBatchJobRepository::new(db.clone())),
            queue,
            Arc::new(progress.clone()),
            BatchSettings::from(&config.batch),
        );
        let ocr = OcrProcessor::new(&config.ocr.languages, config.ocr.dpi);

        Self {
            config,
            store,
            db,
            engine: Arc::new(engine),
            ocr,
            progress,
            words: Arc::new(ContentStreamWordExtractor),
        }
    }

    pub fn with_word_extractor(mut self, words: Arc<dyn WordExtractor>) -> Self {
        self.words = words;
        self
    }

    /// Runs the whitelisted method `name` and wraps the outcome.
    pub fn call(&self, ctx: &CallContext, name: &str, args: Map<String, Value>) -> ApiResponse {
        dispatch::dispatch(self, ctx, name, args)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &dyn FileStore {
        self.store.as_ref()
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn engine(&self) -> &Arc<BatchEngine> {
        &self.engine
    }

    pub fn ocr(&self) -> &OcrProcessor {
        &self.ocr
    }

    pub fn ocr_tools(&self) -> OcrTools {
        OcrTools {
            pdftoppm: self.config.tools.pdftoppm.clone(),
            tesseract: self.config.tools.tesseract.clone(),
        }
    }

    pub fn progress(&self) -> &BatchProgressBroadcaster {
        &self.progress
    }

    pub fn word_extractor(&self) -> &dyn WordExtractor {
        self.words.as_ref()
    }

    pub(crate) fn resolve(&self, file_ref: &str) -> Result<PathBuf> {
        Ok(self.store.resolve(file_ref)?)
    }

    pub(crate) fn open_pdf(&self, file_ref: &str) -> Result<Document> {
        let path = self.resolve(file_ref)?;
        Ok(load_document(&path)?)
    }

    /// Serializes `doc` and stores it as a private file.
    pub(crate) fn save_pdf(&self, doc: &mut Document, filename: &str) -> Result<SavedFile> {
        let bytes = save_document(doc)?;
        self.save_bytes(&bytes, filename)
    }

    pub(crate) fn save_bytes(&self, bytes: &[u8], filename: &str) -> Result<SavedFile> {
        let file_url = self.store.store(bytes, filename, Visibility::Private)?;
        tracing::debug!(%file_url, size = bytes.len(), "stored output");
        // The store may have renamed the file to avoid a clash.
        let filename = file_url.rsplit('/').next().unwrap_or(filename).to_string();
        Ok(SavedFile { file_url, filename })
    }
}

/// Temporary working directory removed when dropped.
pub(crate) fn scratch_dir(prefix: &str) -> Result<TempDir> {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .map_err(|e| {
            ProcessError::PdfProcessing(format!("Failed to create temp directory: {}", e)).into()
        })
}

fn option_str<'a>(options: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    options.get(key).and_then(Value::as_str)
}

fn option_f64(options: &Map<String, Value>, key: &str) -> Option<f64> {
    match options.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Batch jobs run the same operations as the corresponding calls, with the
/// job's options in place of call arguments.
impl BatchHandlers for PdfSuite {
    fn merge(&self, file_refs: &[String], options: &Map<String, Value>) -> Result<Value> {
        let merged = merge::merge_files(self, file_refs, option_str(options, "output_filename"))?;
        Ok(serde_json::to_value(merged)?)
    }

    fn compress(&self, file_ref: &str, options: &Map<String, Value>) -> Result<Value> {
        let quality = Quality::from_name(option_str(options, "quality").unwrap_or("medium"));
        let compressed = compress::compress_file(self, file_ref, quality, None)?;
        Ok(serde_json::to_value(compressed)?)
    }

    fn watermark(&self, file_ref: &str, options: &Map<String, Value>) -> Result<Value> {
        let defaults = TextWatermark::default();
        let mark = TextWatermark {
            text: option_str(options, "text")
                .map(str::to_string)
                .unwrap_or(defaults.text.clone()),
            opacity: option_f64(options, "opacity").unwrap_or(defaults.opacity),
            ..defaults
        };
        let saved = watermark::watermark_file(self, file_ref, &mark, None)?;
        Ok(serde_json::to_value(saved)?)
    }

    fn ocr(&self, file_ref: &str, options: &Map<String, Value>) -> Result<Value> {
        let language = option_str(options, "language").unwrap_or("eng");
        let output = ocr::ocr_file(self, file_ref, language, None)?;
        Ok(serde_json::to_value(output)?)
    }
}
