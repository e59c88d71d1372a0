use secrecy::SecretString;
use serde::Deserialize;

use super::context::scratch_dir;
use super::params::output_name;
use super::{CallContext, PdfSuite, SavedFile};
use crate::error::{PdfSuiteError, ProcessError, Result};
use crate::pdf::protect::{decrypt, encrypt};

pub const ENCRYPT_OUTPUT_FILENAME: &str = "protected.pdf";
pub const DECRYPT_OUTPUT_FILENAME: &str = "decrypted.pdf";

#[derive(Deserialize)]
pub struct EncryptArgs {
    pub file_url: String,
    #[serde(default)]
    pub user_password: Option<String>,
    #[serde(default)]
    pub owner_password: Option<String>,
    #[serde(default)]
    pub output_filename: Option<String>,
}

#[derive(Deserialize)]
pub struct DecryptArgs {
    pub file_url: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub output_filename: Option<String>,
}

/// AES-256 encryption. Holders of the user password may not extract or
/// modify content.
pub fn encrypt_pdf(suite: &PdfSuite, _ctx: &CallContext, args: EncryptArgs) -> Result<SavedFile> {
    let owner_password = match args.owner_password {
        Some(password) if !password.is_empty() => SecretString::from(password),
        _ => return Err(PdfSuiteError::validation("Owner password is required")),
    };
    let user_password = SecretString::from(args.user_password.unwrap_or_default());

    let input = suite.resolve(&args.file_url)?;
    let workdir = scratch_dir("pdf-suite-protect-")?;
    let output = workdir.path().join("output.pdf");

    encrypt(
        &suite.config().tools.qpdf,
        &input,
        &output,
        &user_password,
        &owner_password,
    )?;

    let bytes = read_output(&output)?;
    suite.save_bytes(
        &bytes,
        output_name(args.output_filename.as_deref(), ENCRYPT_OUTPUT_FILENAME),
    )
}

pub fn decrypt_pdf(suite: &PdfSuite, _ctx: &CallContext, args: DecryptArgs) -> Result<SavedFile> {
    let password = match args.password {
        Some(password) if !password.is_empty() => SecretString::from(password),
        _ => return Err(PdfSuiteError::validation("Password is required")),
    };

    let input = suite.resolve(&args.file_url)?;
    let workdir = scratch_dir("pdf-suite-protect-")?;
    let output = workdir.path().join("output.pdf");

    decrypt(&suite.config().tools.qpdf, &input, &output, &password)?;

    let bytes = read_output(&output)?;
    suite.save_bytes(
        &bytes,
        output_name(args.output_filename.as_deref(), DECRYPT_OUTPUT_FILENAME),
    )
}

fn read_output(path: &std::path::Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| {
        ProcessError::ReadDocument {
            path: path.to_path_buf(),
            source: e,
        }
        .into()
    })
}
