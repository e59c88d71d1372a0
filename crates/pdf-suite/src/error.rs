use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Client-facing classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    InvalidOperation,
    NotFound,
    ValidationError,
    ExternalToolFailure,
    Unhandled,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::InvalidOperation => "InvalidOperation",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::ValidationError => "ValidationError",
            ErrorKind::ExternalToolFailure => "ExternalToolFailure",
            ErrorKind::Unhandled => "Unhandled",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum PdfSuiteError {
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// A persisted job names an operation with no registered handler.
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Batch job timed out after {seconds}s")]
    BatchTimeout { seconds: u64 },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    /// An input collection that must not be empty was empty.
    #[error("{0}")]
    EmptyInput(String),

    #[error("Invalid JSON argument: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Process(#[from] ProcessError),

    #[error("{0}")]
    Storage(#[from] StorageError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),
}

impl PdfSuiteError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PdfSuiteError::InvalidOperation(_) | PdfSuiteError::UnknownOperation(_) => {
                ErrorKind::InvalidOperation
            }
            PdfSuiteError::BatchTimeout { .. } => ErrorKind::Unhandled,
            PdfSuiteError::NotFound(_) => ErrorKind::NotFound,
            PdfSuiteError::Validation(_)
            | PdfSuiteError::EmptyInput(_)
            | PdfSuiteError::Json(_) => ErrorKind::ValidationError,
            PdfSuiteError::Process(e) => e.kind(),
            PdfSuiteError::Storage(e) => e.kind(),
            PdfSuiteError::Config(_) | PdfSuiteError::Worker(_) | PdfSuiteError::Database(_) => {
                ErrorKind::Unhandled
            }
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        PdfSuiteError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        PdfSuiteError::NotFound(message.into())
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },
}

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to read document '{path}': {source}")]
    ReadDocument {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("Failed to process PDF: {0}")]
    PdfProcessing(String),

    #[error("Failed to process image: {0}")]
    ImageProcessing(String),

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("Failed to run {tool}: {source}. Make sure it is installed.")]
    ToolUnavailable {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} failed: {message}")]
    ToolFailed { tool: String, message: String },

    #[error("Conversion timed out ({seconds}s limit)")]
    ConversionTimeout { seconds: u64 },

    #[error("Incorrect password")]
    IncorrectPassword,
}

impl ProcessError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProcessError::UnsupportedFormat(_) | ProcessError::IncorrectPassword => {
                ErrorKind::ValidationError
            }
            ProcessError::ReadDocument { .. } => ErrorKind::Unhandled,
            ProcessError::Pdf(_)
            | ProcessError::PdfProcessing(_)
            | ProcessError::ImageProcessing(_)
            | ProcessError::OcrFailed(_)
            | ProcessError::ToolUnavailable { .. }
            | ProcessError::ToolFailed { .. }
            | ProcessError::ConversionTimeout { .. } => ErrorKind::ExternalToolFailure,
        }
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("No file URL provided")]
    MissingReference,

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid file name: {0}")]
    InvalidFilename(String),

    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File already exists: {0}")]
    FileExists(PathBuf),
}

impl StorageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::NotFound(_) => ErrorKind::NotFound,
            StorageError::MissingReference | StorageError::InvalidFilename(_) => {
                ErrorKind::ValidationError
            }
            _ => ErrorKind::Unhandled,
        }
    }
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Failed to spawn worker: {0}")]
    SpawnFailed(String),

    #[error("Worker channel closed unexpectedly")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, PdfSuiteError>;

/// Message carried by a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Unexpected panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            PdfSuiteError::InvalidOperation("x".into()).kind(),
            ErrorKind::InvalidOperation
        );
        assert_eq!(
            PdfSuiteError::from(StorageError::NotFound("/files/a.pdf".into())).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            PdfSuiteError::EmptyInput("none".into()).kind(),
            ErrorKind::ValidationError
        );
        assert_eq!(
            PdfSuiteError::from(ProcessError::ConversionTimeout { seconds: 120 }).kind(),
            ErrorKind::ExternalToolFailure
        );
        assert_eq!(
            PdfSuiteError::from(WorkerError::ChannelClosed).kind(),
            ErrorKind::Unhandled
        );
    }

    #[test]
    fn test_client_messages_are_unprefixed() {
        assert_eq!(
            PdfSuiteError::from(ProcessError::IncorrectPassword).to_string(),
            "Incorrect password"
        );
        assert_eq!(
            PdfSuiteError::from(ProcessError::ConversionTimeout { seconds: 120 }).to_string(),
            "Conversion timed out (120s limit)"
        );
        assert_eq!(
            PdfSuiteError::from(StorageError::NotFound("/files/x.pdf".into())).to_string(),
            "File not found: /files/x.pdf"
        );
        assert_eq!(
            PdfSuiteError::InvalidOperation("delete_everything".into()).to_string(),
            "Invalid operation: delete_everything"
        );
        assert_eq!(
            PdfSuiteError::UnknownOperation("convert".into()).to_string(),
            "Unknown operation: convert"
        );
        assert_eq!(
            PdfSuiteError::BatchTimeout { seconds: 600 }.to_string(),
            "Batch job timed out after 600s"
        );
    }
}
