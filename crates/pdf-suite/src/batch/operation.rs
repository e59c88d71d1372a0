use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PdfSuiteError;

/// Operations a batch job may be submitted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchOperation {
    Merge,
    Split,
    Compress,
    Watermark,
    Ocr,
    Convert,
}

/// How the engine runs an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// All file references are handled in one call.
    Atomic,
    /// File references are handled one at a time with progress after each.
    PerItem,
    /// Accepted on submission but without an execution handler.
    Unsupported,
}

impl BatchOperation {
    pub const ALL: [BatchOperation; 6] = [
        BatchOperation::Merge,
        BatchOperation::Split,
        BatchOperation::Compress,
        BatchOperation::Watermark,
        BatchOperation::Ocr,
        BatchOperation::Convert,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BatchOperation::Merge => "merge",
            BatchOperation::Split => "split",
            BatchOperation::Compress => "compress",
            BatchOperation::Watermark => "watermark",
            BatchOperation::Ocr => "ocr",
            BatchOperation::Convert => "convert",
        }
    }

    pub fn execution_mode(&self) -> ExecutionMode {
        match self {
            BatchOperation::Merge => ExecutionMode::Atomic,
            BatchOperation::Compress | BatchOperation::Watermark | BatchOperation::Ocr => {
                ExecutionMode::PerItem
            }
            BatchOperation::Split | BatchOperation::Convert => ExecutionMode::Unsupported,
        }
    }
}

impl fmt::Display for BatchOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BatchOperation {
    type Err = PdfSuiteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BatchOperation::ALL
            .iter()
            .find(|op| op.as_str() == s)
            .copied()
            .ok_or_else(|| PdfSuiteError::InvalidOperation(s.to_string()))
    }
}

/// Persisted job status. Transitions only move forward:
/// `Queued -> Processing -> {Completed, Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Queued => "Queued",
            BatchStatus::Processing => "Processing",
            BatchStatus::Completed => "Completed",
            BatchStatus::Failed => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchStatus::Completed | BatchStatus::Failed)
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(&self, next: BatchStatus) -> bool {
        matches!(
            (self, next),
            (BatchStatus::Queued, BatchStatus::Processing)
                | (BatchStatus::Processing, BatchStatus::Completed)
                | (BatchStatus::Processing, BatchStatus::Failed)
        )
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BatchStatus {
    type Err = PdfSuiteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Queued" => Ok(BatchStatus::Queued),
            "Processing" => Ok(BatchStatus::Processing),
            "Completed" => Ok(BatchStatus::Completed),
            "Failed" => Ok(BatchStatus::Failed),
            other => Err(PdfSuiteError::validation(format!(
                "Unknown batch status: {}",
                other
            ))),
        }
    }
}
