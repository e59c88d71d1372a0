//! Whitelisted method table and the envelope boundary.
//!
//! Every call is resolved by its dotted name, decoded, run and converted to
//! an [`ApiResponse`]. Nothing raised by a method, including a panic, crosses
//! this boundary unconverted.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::LazyLock;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use super::{
    batch, compress, convert, document, extract, flatten, merge, ocr, params, protect, redact,
    split, template, watermark, ApiResponse, CallContext, PdfSuite,
};
use crate::error::{panic_message, Result};

pub const METHOD_PREFIX: &str = "pdf_suite.api.";

type Method =
    Box<dyn Fn(&PdfSuite, &CallContext, Map<String, Value>) -> Result<Value> + Send + Sync>;

/// Wraps a typed method: decodes its arguments and encodes its data.
fn method<A, R, F>(f: F) -> Method
where
    A: DeserializeOwned,
    R: Serialize,
    F: Fn(&PdfSuite, &CallContext, A) -> Result<R> + Send + Sync + 'static,
{
    Box::new(move |suite: &PdfSuite, ctx: &CallContext, args: Map<String, Value>| {
        let args = params::parse(args)?;
        let data = f(suite, ctx, args)?;
        Ok(serde_json::to_value(data)?)
    })
}

static METHODS: LazyLock<HashMap<&'static str, Method>> = LazyLock::new(|| {
    let mut methods: HashMap<&'static str, Method> = HashMap::new();
    let mut add = |name: &'static str, m: Method| {
        methods.insert(name, m);
    };

    add("pdf_suite.api.merge.merge_pdfs", method(merge::merge_pdfs));
    add(
        "pdf_suite.api.merge.merge_pdfs_with_options",
        method(merge::merge_pdfs_with_options),
    );
    add("pdf_suite.api.split.split_pdf", method(split::split_pdf));
    add("pdf_suite.api.split.split_pdf_every_n", method(split::split_pdf_every_n));
    add("pdf_suite.api.split.extract_pages", method(split::extract_pages));
    add("pdf_suite.api.compress.compress_pdf", method(compress::compress_pdf));
    add(
        "pdf_suite.api.watermark.add_text_watermark",
        method(watermark::add_text_watermark),
    );
    add(
        "pdf_suite.api.watermark.add_image_watermark",
        method(watermark::add_image_watermark),
    );
    add("pdf_suite.api.flatten.flatten_pdf", method(flatten::flatten_pdf));
    add("pdf_suite.api.protect.encrypt_pdf", method(protect::encrypt_pdf));
    add("pdf_suite.api.protect.decrypt_pdf", method(protect::decrypt_pdf));
    add("pdf_suite.api.extract.get_pdf_info", method(extract::get_pdf_info));
    add("pdf_suite.api.extract.extract_text", method(extract::extract_text));
    add("pdf_suite.api.extract.extract_tables", method(extract::extract_tables));
    add("pdf_suite.api.extract.extract_images", method(extract::extract_images));
    add("pdf_suite.api.ocr.ocr_pdf", method(ocr::ocr_pdf));
    add("pdf_suite.api.ocr.ocr_image_to_text", method(ocr::ocr_image_to_text));
    add("pdf_suite.api.convert.docx_to_pdf", method(convert::docx_to_pdf));
    add("pdf_suite.api.redact.redact_areas", method(redact::redact_areas));
    add("pdf_suite.api.redact.redact_text", method(redact::redact_text));
    add("pdf_suite.api.batch.start_batch", method(batch::start_batch));
    add("pdf_suite.api.batch.get_batch_status", method(batch::get_batch_status));
    add("pdf_suite.api.template.save_template", method(template::save_template));
    add("pdf_suite.api.template.get_template", method(template::get_template));
    add("pdf_suite.api.template.list_templates", method(template::list_templates));
    add("pdf_suite.api.template.delete_template", method(template::delete_template));
    add(
        "pdf_suite.api.template.generate_from_template",
        method(template::generate_from_template),
    );
    add(
        "pdf_suite.api.document.save_edit_session",
        method(document::save_edit_session),
    );
    add(
        "pdf_suite.api.document.load_edit_session",
        method(document::load_edit_session),
    );
    add(
        "pdf_suite.api.document.list_edit_sessions",
        method(document::list_edit_sessions),
    );

    methods
});

/// Names of every callable method, sorted.
pub fn whitelisted_methods() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = METHODS.keys().copied().collect();
    names.sort_unstable();
    names
}

pub fn is_whitelisted(name: &str) -> bool {
    METHODS.contains_key(name)
}

/// Runs `name` with `args` and wraps the outcome in an envelope.
pub fn dispatch(
    suite: &PdfSuite,
    ctx: &CallContext,
    name: &str,
    args: Map<String, Value>,
) -> ApiResponse {
    let Some(handler) = METHODS.get(name) else {
        tracing::warn!(method = name, "rejected call to unknown method");
        return ApiResponse::err(format!("Method not whitelisted: {}", name));
    };

    let _span = tracing::info_span!("api.call", method = name, user = %ctx.user).entered();

    match catch_unwind(AssertUnwindSafe(|| handler(suite, ctx, args))) {
        Ok(Ok(data)) => ApiResponse::ok(data),
        Ok(Err(e)) => {
            tracing::error!(method = name, kind = %e.kind(), error = %e, "call failed");
            ApiResponse::err(e.to_string())
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(method = name, error = %message, "call panicked");
            ApiResponse::err(message)
        }
    }
}
