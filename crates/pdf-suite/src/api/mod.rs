//! Remote-procedure surface of the PDF suite.
//!
//! Calls are organized by domain:
//! - `merge`, `split`: page assembly
//! - `compress`, `watermark`, `flatten`, `protect`: whole-document transforms
//! - `extract`, `ocr`, `convert`: content extraction and conversion
//! - `redact`: region and text redaction
//! - `batch`: background batch jobs
//! - `template`, `document`: templates and editing sessions
//!
//! Every call goes through [`dispatch`], which converts each outcome into an
//! [`ApiResponse`] envelope.

pub mod batch;
pub mod compress;
pub mod context;
pub mod convert;
pub mod dispatch;
pub mod document;
pub mod extract;
pub mod flatten;
pub mod merge;
pub mod ocr;
pub mod params;
pub mod protect;
pub mod redact;
pub mod service;
pub mod split;
pub mod template;
pub mod watermark;

pub use context::{PdfSuite, SavedFile, StoredPdf};
pub use dispatch::{dispatch, is_whitelisted, whitelisted_methods, METHOD_PREFIX};
pub use service::PdfSuiteService;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Caller identity used when a request carries none.
pub const GUEST_USER: &str = "Guest";

/// Response envelope returned by every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T = Value> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Per-call information about the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    pub user: String,
}

impl CallContext {
    /// Blank user names fall back to [`GUEST_USER`].
    pub fn new(user: impl Into<String>) -> Self {
        let user = user.into();
        if user.trim().is_empty() {
            return Self::guest();
        }
        Self {
            user: user.trim().to_string(),
        }
    }

    pub fn guest() -> Self {
        Self {
            user: GUEST_USER.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_shapes() {
        let ok = serde_json::to_value(ApiResponse::ok(json!({"pages": 5}))).unwrap();
        assert_eq!(ok, json!({"success": true, "data": {"pages": 5}}));

        let err = serde_json::to_value(ApiResponse::<Value>::err("Template not found")).unwrap();
        assert_eq!(err, json!({"success": false, "error": "Template not found"}));
    }

    #[test]
    fn test_call_context_user() {
        assert_eq!(CallContext::new("alice@example.com").user, "alice@example.com");
        assert_eq!(CallContext::new("  ").user, GUEST_USER);
    }
}
