//! Password protection through qpdf (AES-256).

use std::ffi::OsStr;
use std::path::Path;
use std::process::Output;

use secrecy::{ExposeSecret, SecretString};

use super::tools;
use crate::error::ProcessError;

/// qpdf exits with 3 when it succeeded but emitted warnings.
const QPDF_EXIT_WARNINGS: i32 = 3;

/// Encrypts `input` into `output`. Text extraction and modification are
/// denied to holders of the user password.
pub fn encrypt(
    qpdf: &str,
    input: &Path,
    output: &Path,
    user_password: &SecretString,
    owner_password: &SecretString,
) -> Result<(), ProcessError> {
    let _span = tracing::info_span!("pdf.encrypt").entered();

    let result = tools::output(
        qpdf,
        [
            OsStr::new("--encrypt"),
            OsStr::new(user_password.expose_secret()),
            OsStr::new(owner_password.expose_secret()),
            OsStr::new("256"),
            OsStr::new("--extract=n"),
            OsStr::new("--modify=none"),
            OsStr::new("--"),
            input.as_os_str(),
            output.as_os_str(),
        ],
    )?;
    check_qpdf(qpdf, &result, false)
}

/// Removes encryption from `input` using `password`.
pub fn decrypt(
    qpdf: &str,
    input: &Path,
    output: &Path,
    password: &SecretString,
) -> Result<(), ProcessError> {
    let _span = tracing::info_span!("pdf.decrypt").entered();

    let password_arg = format!("--password={}", password.expose_secret());
    let result = tools::output(
        qpdf,
        [
            OsStr::new(&password_arg),
            OsStr::new("--decrypt"),
            input.as_os_str(),
            output.as_os_str(),
        ],
    )?;
    check_qpdf(qpdf, &result, true)
}

fn check_qpdf(qpdf: &str, output: &Output, decrypting: bool) -> Result<(), ProcessError> {
    classify_exit(qpdf, output.status.code(), &output.stderr, decrypting)
}

fn classify_exit(
    qpdf: &str,
    code: Option<i32>,
    stderr: &[u8],
    decrypting: bool,
) -> Result<(), ProcessError> {
    match code {
        Some(0) | Some(QPDF_EXIT_WARNINGS) => Ok(()),
        _ => {
            let message = tools::failure_message(stderr, code);
            if decrypting && message.to_lowercase().contains("invalid password") {
                return Err(ProcessError::IncorrectPassword);
            }
            Err(ProcessError::ToolFailed {
                tool: qpdf.to_string(),
                message,
            })
        }
    }
}
