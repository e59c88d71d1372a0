use std::ffi::OsStr;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lopdf::Document;

use super::assemble::merge_documents;
use super::{load_document, save_document, tools};
use crate::error::ProcessError;

/// Characters of recognized text returned as a preview.
pub const TEXT_PREVIEW_CHARS: usize = 500;

/// Text recognition over raster images through Tesseract (leptess).
#[derive(Clone)]
pub struct OcrProcessor {
    inner: Arc<OcrProcessorInner>,
}

struct OcrProcessorInner {
    languages: String,
    dpi: u32,
}

impl OcrProcessor {
    pub fn new(languages: &[String], dpi: u32) -> Self {
        let lang_str = if languages.is_empty() {
            "eng".to_string()
        } else {
            languages.join("+")
        };

        Self {
            inner: Arc::new(OcrProcessorInner {
                languages: lang_str,
                dpi,
            }),
        }
    }

    /// Same resolution, different language. An empty `language` keeps the
    /// current one.
    pub fn with_language(&self, language: &str) -> Self {
        if language.trim().is_empty() {
            return self.clone();
        }
        Self {
            inner: Arc::new(OcrProcessorInner {
                languages: language.trim().to_string(),
                dpi: self.inner.dpi,
            }),
        }
    }

    pub fn languages(&self) -> &str {
        &self.inner.languages
    }

    pub fn dpi(&self) -> u32 {
        self.inner.dpi
    }

    pub fn recognize_image(&self, image_path: &Path) -> Result<String, ProcessError> {
        self.recognize_image_bytes(&std::fs::read(image_path).map_err(|e| {
            ProcessError::ReadDocument {
                path: image_path.to_path_buf(),
                source: e,
            }
        })?)
    }

    pub fn recognize_image_bytes(&self, image_data: &[u8]) -> Result<String, ProcessError> {
        let _span = tracing::info_span!("pdf.ocr_image", languages = %self.inner.languages).entered();

        let img = image::load_from_memory(image_data)
            .map_err(|e| ProcessError::OcrFailed(format!("Failed to load image: {}", e)))?;

        // leptess reads PNG from memory regardless of the source format
        let mut png_data = Vec::new();
        img.write_to(&mut Cursor::new(&mut png_data), image::ImageFormat::Png)
            .map_err(|e| ProcessError::OcrFailed(format!("Failed to convert image: {}", e)))?;

        let mut lt = leptess::LepTess::new(None, &self.inner.languages).map_err(|e| {
            ProcessError::OcrFailed(format!("Failed to initialize Tesseract: {}", e))
        })?;

        lt.set_image_from_mem(&png_data)
            .map_err(|e| ProcessError::OcrFailed(format!("Failed to set image for OCR: {}", e)))?;

        lt.get_utf8_text()
            .map_err(|e| ProcessError::OcrFailed(format!("OCR failed: {}", e)))
    }
}

/// Binaries used by [`ocr_pdf`].
#[derive(Debug, Clone)]
pub struct OcrTools {
    pub pdftoppm: String,
    pub tesseract: String,
}

#[derive(Debug, Clone)]
pub struct OcrOutput {
    /// Searchable PDF with one page per rendered input page.
    pub pdf: Vec<u8>,
    pub pages_processed: usize,
    pub text_preview: String,
}

/// Rasterizes `input`, recognizes every page and rebuilds it as a searchable
/// PDF (page image plus invisible text layer). Intermediate files live in a
/// temporary directory that is removed on return.
pub fn ocr_pdf(
    input: &Path,
    processor: &OcrProcessor,
    tools_config: &OcrTools,
) -> Result<OcrOutput, ProcessError> {
    let _span = tracing::info_span!("pdf.ocr", languages = %processor.languages()).entered();

    let workdir = tempfile::Builder::new()
        .prefix("pdf-suite-ocr-")
        .tempdir()
        .map_err(|e| ProcessError::PdfProcessing(format!("Failed to create temp directory: {}", e)))?;

    let prefix = workdir.path().join("page");
    let dpi = processor.dpi().to_string();
    tools::run(
        &tools_config.pdftoppm,
        [
            OsStr::new("-png"),
            OsStr::new("-r"),
            OsStr::new(&dpi),
            input.as_os_str(),
            prefix.as_os_str(),
        ],
    )?;

    let images = rendered_pages(workdir.path())?;
    if images.is_empty() {
        return Err(ProcessError::PdfProcessing(
            "Failed to convert PDF to images".to_string(),
        ));
    }

    let mut text_preview = String::new();
    let mut pages: Vec<Document> = Vec::with_capacity(images.len());

    for (index, image_path) in images.iter().enumerate() {
        let text = processor.recognize_image(image_path)?;
        if index == 0 {
            text_preview = text.chars().take(TEXT_PREVIEW_CHARS).collect();
        }

        let output_base = image_path.with_extension("");
        tools::run(
            &tools_config.tesseract,
            [
                image_path.as_os_str(),
                output_base.as_os_str(),
                OsStr::new("-l"),
                OsStr::new(processor.languages()),
                OsStr::new("pdf"),
            ],
        )?;
        pages.push(load_document(&output_base.with_extension("pdf"))?);
        tracing::debug!(page = index + 1, "page recognized");
    }

    let pages_processed = pages.len();
    let mut merged = merge_documents(pages)?;
    let pdf = save_document(&mut merged)?;

    Ok(OcrOutput {
        pdf,
        pages_processed,
        text_preview,
    })
}

/// Recognizes the text of a single image file.
pub fn ocr_image_to_text(path: &Path, processor: &OcrProcessor) -> Result<String, ProcessError> {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if mime.type_() != mime_guess::mime::IMAGE {
        return Err(ProcessError::UnsupportedFormat(mime.to_string()));
    }
    processor.recognize_image(path)
}

/// Page images written by pdftoppm, in page order. pdftoppm zero-pads the
/// page suffix to a common width, so a lexical sort is page order.
fn rendered_pages(dir: &Path) -> Result<Vec<PathBuf>, ProcessError> {
    let entries = std::fs::read_dir(dir).map_err(|e| ProcessError::ReadDocument {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut images: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            name.starts_with("page") && name.ends_with(".png")
        })
        .collect();
    images.sort();
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ocr_processor_languages() {
        let processor = OcrProcessor::new(&["eng".to_string(), "deu".to_string()], 300);
        assert_eq!(processor.languages(), "eng+deu");
        assert_eq!(processor.dpi(), 300);

        let default = OcrProcessor::new(&[], 150);
        assert_eq!(default.languages(), "eng");
        assert_eq!(default.dpi(), 150);
    }

    #[test]
    fn test_with_language_overrides_only_language() {
        let processor = OcrProcessor::new(&["eng".to_string()], 200);
        let french = processor.with_language("fra");
        assert_eq!(french.languages(), "fra");
        assert_eq!(french.dpi(), 200);
        assert_eq!(processor.with_language("  ").languages(), "eng");
    }

    #[test]
    fn test_invalid_image_data_error() {
        let processor = OcrProcessor::new(&[], 300);
        match processor.recognize_image_bytes(b"not valid image data") {
            Err(ProcessError::OcrFailed(msg)) => assert!(msg.contains("Failed to load image")),
            other => panic!("expected OcrFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_image_file_error() {
        let processor = OcrProcessor::new(&[], 300);
        match processor.recognize_image(Path::new("/nonexistent/scan.png")) {
            Err(ProcessError::ReadDocument { path, .. }) => {
                assert_eq!(path, PathBuf::from("/nonexistent/scan.png"))
            }
            other => panic!("expected ReadDocument, got {:?}", other),
        }
    }

    #[test]
    fn test_image_to_text_rejects_non_images() {
        let processor = OcrProcessor::new(&[], 300);
        let result = ocr_image_to_text(Path::new("notes.txt"), &processor);
        assert!(matches!(result, Err(ProcessError::UnsupportedFormat(ref m)) if m == "text/plain"));
    }

    #[test]
    fn test_ocr_pdf_without_renderer() {
        let processor = OcrProcessor::new(&[], 300);
        let tools_config = OcrTools {
            pdftoppm: "pdf-suite-test-no-pdftoppm".to_string(),
            tesseract: "tesseract".to_string(),
        };
        let result = ocr_pdf(Path::new("/tmp/in.pdf"), &processor, &tools_config);
        assert!(matches!(result, Err(ProcessError::ToolUnavailable { ref tool, .. }) if tool == "pdf-suite-test-no-pdftoppm"));
    }

    #[test]
    fn test_rendered_pages_are_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["page-10.png", "page-02.png", "page-01.png", "other.png", "page-03.pdf"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let names: Vec<String> = rendered_pages(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["page-01.png", "page-02.png", "page-10.png"]);
    }
}
