use serde::Deserialize;

use super::params::{flexible, output_name};
use super::{CallContext, PdfSuite, SavedFile};
use crate::error::Result;
use crate::pdf::watermark::{
    apply_image_watermark, apply_text_watermark, ImagePosition, ImageWatermark, Rgb, TextWatermark,
};

pub const DEFAULT_OUTPUT_FILENAME: &str = "watermarked.pdf";

#[derive(Debug, Deserialize)]
pub struct TextWatermarkArgs {
    pub file_url: String,
    #[serde(default = "default_text")]
    pub text: String,
    #[serde(default = "default_font_size", deserialize_with = "flexible")]
    pub font_size: f64,
    #[serde(default = "default_text_opacity", deserialize_with = "flexible")]
    pub opacity: f64,
    #[serde(default = "default_rotation", deserialize_with = "flexible")]
    pub rotation: f64,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub output_filename: Option<String>,
}

fn default_text() -> String {
    "CONFIDENTIAL".to_string()
}

fn default_font_size() -> f64 {
    60.0
}

fn default_text_opacity() -> f64 {
    0.15
}

fn default_rotation() -> f64 {
    45.0
}

fn default_color() -> String {
    "#888888".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ImageWatermarkArgs {
    pub file_url: String,
    pub image_url: String,
    #[serde(default = "default_image_opacity", deserialize_with = "flexible")]
    pub opacity: f64,
    /// `center`, `top-right` or `bottom-left`.
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub output_filename: Option<String>,
}

fn default_image_opacity() -> f64 {
    0.2
}

pub fn add_text_watermark(
    suite: &PdfSuite,
    _ctx: &CallContext,
    args: TextWatermarkArgs,
) -> Result<SavedFile> {
    let mark = TextWatermark {
        text: args.text,
        font_size: args.font_size,
        opacity: args.opacity,
        rotation: args.rotation,
        color: Rgb::from_hex(&args.color)?,
    };
    watermark_file(suite, &args.file_url, &mark, args.output_filename.as_deref())
}

pub fn watermark_file(
    suite: &PdfSuite,
    file_url: &str,
    mark: &TextWatermark,
    output_filename: Option<&str>,
) -> Result<SavedFile> {
    let mut doc = suite.open_pdf(file_url)?;
    let pages = apply_text_watermark(&mut doc, mark)?;
    tracing::debug!(pages, "text watermark applied");
    suite.save_pdf(&mut doc, output_name(output_filename, DEFAULT_OUTPUT_FILENAME))
}

pub fn add_image_watermark(
    suite: &PdfSuite,
    _ctx: &CallContext,
    args: ImageWatermarkArgs,
) -> Result<SavedFile> {
    let mark = ImageWatermark {
        image: suite.store().read(&args.image_url)?,
        opacity: args.opacity,
        position: ImagePosition::from_name(args.position.as_deref().unwrap_or_default()),
    };

    let mut doc = suite.open_pdf(&args.file_url)?;
    let pages = apply_image_watermark(&mut doc, &mark)?;
    tracing::debug!(pages, "image watermark applied");
    suite.save_pdf(
        &mut doc,
        output_name(args.output_filename.as_deref(), DEFAULT_OUTPUT_FILENAME),
    )
}
