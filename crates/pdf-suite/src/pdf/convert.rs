use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::tools;
use crate::error::ProcessError;

/// Converts a word-processor document to PDF with headless LibreOffice and
/// returns the PDF bytes. The conversion is killed after `timeout`.
pub fn docx_to_pdf(
    libreoffice: &str,
    input: &Path,
    timeout: Duration,
) -> Result<Vec<u8>, ProcessError> {
    let _span = tracing::info_span!("pdf.convert", input = %input.display()).entered();

    let outdir = tempfile::Builder::new()
        .prefix("pdf-suite-convert-")
        .tempdir()
        .map_err(|e| ProcessError::PdfProcessing(format!("Failed to create temp directory: {}", e)))?;

    tools::run_with_timeout(
        libreoffice,
        [
            OsStr::new("--headless"),
            OsStr::new("--convert-to"),
            OsStr::new("pdf"),
            OsStr::new("--outdir"),
            outdir.path().as_os_str(),
            input.as_os_str(),
        ],
        timeout,
    )?;

    let output = find_output_pdf(outdir.path(), input).ok_or_else(|| {
        ProcessError::PdfProcessing("Conversion failed: no output PDF generated".to_string())
    })?;

    std::fs::read(&output).map_err(|e| ProcessError::ReadDocument {
        path: output,
        source: e,
    })
}

/// LibreOffice names the output after the input stem; any other PDF in the
/// output directory is accepted as a fallback.
fn find_output_pdf(outdir: &Path, input: &Path) -> Option<PathBuf> {
    if let Some(stem) = input.file_stem() {
        let expected = outdir.join(stem).with_extension("pdf");
        if expected.is_file() {
            return Some(expected);
        }
    }

    std::fs::read_dir(outdir)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .find(|path| path.extension().is_some_and(|ext| ext == "pdf"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_output_prefers_input_stem() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("other.pdf"), b"%PDF").unwrap();
        std::fs::write(dir.path().join("report.pdf"), b"%PDF").unwrap();

        let found = find_output_pdf(dir.path(), Path::new("/uploads/report.docx")).unwrap();
        assert_eq!(found.file_name().unwrap(), "report.pdf");
    }

    #[test]
    fn test_find_output_falls_back_to_any_pdf() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("converted.pdf"), b"%PDF").unwrap();
        std::fs::write(dir.path().join("log.txt"), b"").unwrap();

        let found = find_output_pdf(dir.path(), Path::new("letter.docx")).unwrap();
        assert_eq!(found.file_name().unwrap(), "converted.pdf");
    }

    #[test]
    fn test_find_output_none_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_output_pdf(dir.path(), Path::new("letter.docx")).is_none());
    }

    #[test]
    fn test_missing_libreoffice_is_unavailable() {
        let result = docx_to_pdf(
            "pdf-suite-test-no-libreoffice",
            Path::new("letter.docx"),
            Duration::from_secs(5),
        );
        assert!(matches!(result, Err(ProcessError::ToolUnavailable { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_silent_tool_without_output_fails() {
        let result = docx_to_pdf("true", Path::new("letter.docx"), Duration::from_secs(5));
        match result {
            Err(ProcessError::PdfProcessing(msg)) => {
                assert_eq!(msg, "Conversion failed: no output PDF generated")
            }
            other => panic!("expected PdfProcessing, got {:?}", other),
        }
    }
}
