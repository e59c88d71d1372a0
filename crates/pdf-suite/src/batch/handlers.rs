use serde_json::{Map, Value};

use crate::error::Result;

/// Operation handlers available to batch jobs. Each returns the data record
/// stored as the item's result.
pub trait BatchHandlers: Send + Sync {
    /// Combines all `file_refs`, in order, into one document.
    fn merge(&self, file_refs: &[String], options: &Map<String, Value>) -> Result<Value>;

    fn compress(&self, file_ref: &str, options: &Map<String, Value>) -> Result<Value>;

    fn watermark(&self, file_ref: &str, options: &Map<String, Value>) -> Result<Value>;

    fn ocr(&self, file_ref: &str, options: &Map<String, Value>) -> Result<Value>;
}
