//! Text and image watermarks, drawn as an underlay on every page.

use image::GenericImageView;
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

use super::fonts::{encode_win_ansi, escape_literal, helvetica_bold_dictionary, helvetica_bold_width};
use super::overlay::{add_resource, compose, unique_resource_name, Layer};
use super::{format_number, media_box};
use crate::error::{PdfSuiteError, ProcessError};

/// Distance from the page edge for corner placements, in points.
const CORNER_MARGIN: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    /// Parses `#rrggbb` (the leading `#` is optional).
    pub fn from_hex(hex: &str) -> Result<Self, PdfSuiteError> {
        let digits = hex.trim().trim_start_matches('#');
        let invalid = || PdfSuiteError::validation(format!("Invalid color: {}", hex));
        if digits.len() != 6 || !digits.is_ascii() {
            return Err(invalid());
        }
        let channel = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map(|v| v as f64 / 255.0)
                .map_err(|_| invalid())
        };
        Ok(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct TextWatermark {
    pub text: String,
    pub font_size: f64,
    pub opacity: f64,
    /// Counter-clockwise, in degrees.
    pub rotation: f64,
    pub color: Rgb,
}

impl Default for TextWatermark {
    fn default() -> Self {
        Self {
            text: "CONFIDENTIAL".to_string(),
            font_size: 60.0,
            opacity: 0.15,
            rotation: 45.0,
            color: Rgb {
                r: 136.0 / 255.0,
                g: 136.0 / 255.0,
                b: 136.0 / 255.0,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImagePosition {
    #[default]
    Center,
    TopRight,
    BottomLeft,
}

impl ImagePosition {
    /// Unknown names fall back to `Center`.
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "top-right" => ImagePosition::TopRight,
            "bottom-left" => ImagePosition::BottomLeft,
            _ => ImagePosition::Center,
        }
    }

    /// Lower-left corner of a `w` x `h` box on a page of `page_w` x `page_h`.
    fn origin(&self, page_w: f64, page_h: f64, w: f64, h: f64) -> (f64, f64) {
        match self {
            ImagePosition::Center => ((page_w - w) / 2.0, (page_h - h) / 2.0),
            ImagePosition::TopRight => (page_w - w - CORNER_MARGIN, page_h - h - CORNER_MARGIN),
            ImagePosition::BottomLeft => (CORNER_MARGIN, CORNER_MARGIN),
        }
    }
}

fn add_opacity_state(doc: &mut Document, opacity: f64) -> ObjectId {
    doc.add_object(dictionary! {
        "Type" => "ExtGState",
        "ca" => Object::from(opacity),
        "CA" => Object::from(opacity),
    })
}

/// Draws `mark` centered and rotated on every page. Returns the page count.
pub fn apply_text_watermark(doc: &mut Document, mark: &TextWatermark) -> Result<usize, ProcessError> {
    let _span = tracing::info_span!("pdf.watermark.text").entered();

    let encoded = encode_win_ansi(&mark.text);
    let half_width = helvetica_bold_width(&encoded, mark.font_size) / 2.0;
    let literal = escape_literal(&encoded);
    let (sin, cos) = mark.rotation.to_radians().sin_cos();

    let font_id = doc.add_object(helvetica_bold_dictionary());
    let state_id = add_opacity_state(doc, mark.opacity);

    let pages: Vec<ObjectId> = doc.get_pages().values().copied().collect();
    for page_id in &pages {
        let [x0, y0, x1, y1] = media_box(doc, *page_id);
        let center_x = (x0 + x1) / 2.0;
        let center_y = (y0 + y1) / 2.0;

        let font_name = unique_resource_name(doc, *page_id, "Font", "WmF")?;
        let state_name = unique_resource_name(doc, *page_id, "ExtGState", "WmGS")?;
        add_resource(doc, *page_id, "Font", &font_name, font_id.into())?;
        add_resource(doc, *page_id, "ExtGState", &state_name, state_id.into())?;

        let content = format!(
            "/{gs} gs\n{r} {g} {b} rg\nBT\n/{font} {size} Tf\n{a} {bb} {c} {d} {e} {f} Tm\n{dx} 0 Td\n({text}) Tj\nET",
            gs = state_name,
            r = format_number(mark.color.r),
            g = format_number(mark.color.g),
            b = format_number(mark.color.b),
            font = font_name,
            size = format_number(mark.font_size),
            a = format_number(cos),
            bb = format_number(sin),
            c = format_number(-sin),
            d = format_number(cos),
            e = format_number(center_x),
            f = format_number(center_y),
            dx = format_number(-half_width),
            text = literal,
        );
        compose(doc, *page_id, content.into_bytes(), Layer::Under)?;
    }

    Ok(pages.len())
}

#[derive(Debug, Clone)]
pub struct ImageWatermark {
    /// Encoded image file (PNG, JPEG, ...).
    pub image: Vec<u8>,
    pub opacity: f64,
    pub position: ImagePosition,
}

/// Draws the image at half its pixel size on every page. Returns the page count.
pub fn apply_image_watermark(
    doc: &mut Document,
    mark: &ImageWatermark,
) -> Result<usize, ProcessError> {
    let _span = tracing::info_span!("pdf.watermark.image").entered();

    let img = image::load_from_memory(&mark.image)
        .map_err(|e| ProcessError::ImageProcessing(format!("Failed to load image: {}", e)))?;
    let (width, height) = img.dimensions();

    let mut image_dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
    };

    if img.color().has_alpha() {
        let alpha: Vec<u8> = img.to_rgba8().pixels().map(|p| p[3]).collect();
        let mut mask = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            alpha,
        );
        mask.compress()?;
        let mask_id = doc.add_object(mask);
        image_dict.set("SMask", mask_id);
    }

    let mut image_stream = Stream::new(image_dict, img.to_rgb8().into_raw());
    image_stream.compress()?;
    let image_id = doc.add_object(image_stream);
    let state_id = add_opacity_state(doc, mark.opacity);

    let draw_w = width as f64 / 2.0;
    let draw_h = height as f64 / 2.0;

    let pages: Vec<ObjectId> = doc.get_pages().values().copied().collect();
    for page_id in &pages {
        let [x0, y0, x1, y1] = media_box(doc, *page_id);
        let (x, y) = mark
            .position
            .origin((x1 - x0).abs(), (y1 - y0).abs(), draw_w, draw_h);

        let image_name = unique_resource_name(doc, *page_id, "XObject", "WmIm")?;
        let state_name = unique_resource_name(doc, *page_id, "ExtGState", "WmGS")?;
        add_resource(doc, *page_id, "XObject", &image_name, image_id.into())?;
        add_resource(doc, *page_id, "ExtGState", &state_name, state_id.into())?;

        let content = format!(
            "/{} gs\n{} 0 0 {} {} {} cm\n/{} Do",
            state_name,
            format_number(draw_w),
            format_number(draw_h),
            format_number(x0 + x),
            format_number(y0 + y),
            image_name,
        );
        compose(doc, *page_id, content.into_bytes(), Layer::Under)?;
    }

    Ok(pages.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::overlay::page_resources;
    use crate::pdf::test_support::*;
    use std::io::Cursor;

    fn png(width: u32, height: u32, with_alpha: bool) -> Vec<u8> {
        let img = if with_alpha {
            image::DynamicImage::ImageRgba8(image::RgbaImage::new(width, height))
        } else {
            image::DynamicImage::ImageRgb8(image::RgbImage::new(width, height))
        };
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_hex_color() {
        let gray = Rgb::from_hex("#888888").unwrap();
        assert!((gray.r - 136.0 / 255.0).abs() < 1e-12);
        let red = Rgb::from_hex("ff0000").unwrap();
        assert_eq!((red.r, red.g, red.b), (1.0, 0.0, 0.0));
        assert!(Rgb::from_hex("#12345").is_err());
        assert!(Rgb::from_hex("#zzzzzz").is_err());
    }

    #[test]
    fn test_position_names() {
        assert_eq!(ImagePosition::from_name("top-right"), ImagePosition::TopRight);
        assert_eq!(ImagePosition::from_name("bottom-left"), ImagePosition::BottomLeft);
        assert_eq!(ImagePosition::from_name("middle"), ImagePosition::Center);
    }

    #[test]
    fn test_text_watermark_is_underlaid_on_every_page() {
        let mut doc = sample_document(2);
        let pages = apply_text_watermark(&mut doc, &TextWatermark::default()).unwrap();
        assert_eq!(pages, 2);

        for (n, content) in page_contents(&doc).iter().enumerate() {
            let mark = content.find("(CONFIDENTIAL) Tj").unwrap();
            let original = content.find(&format!("(Page {}) Tj", n + 1)).unwrap();
            assert!(mark < original);
            // Centered on a 612 x 792 page, rotated 45 degrees.
            assert!(content.contains("0.7071 0.7071 -0.7071 0.7071 306 396 Tm"));
            assert!(content.contains("-223.32 0 Td"));
            assert!(content.contains("/WmGS1 gs"));
        }
    }

    #[test]
    fn test_text_watermark_registers_font() {
        let mut doc = sample_document(1);
        apply_text_watermark(&mut doc, &TextWatermark::default()).unwrap();

        let page = *doc.get_pages().get(&1).unwrap();
        let resources = page_resources(&doc, page).unwrap();
        let fonts = resources.get(b"Font").unwrap().as_dict().unwrap();
        assert!(fonts.has(b"F1"));
        let font_id = fonts.get(b"WmF1").unwrap().as_reference().unwrap();
        let font = doc.get_dictionary(font_id).unwrap();
        assert!(matches!(
            font.get(b"BaseFont").unwrap(),
            Object::Name(name) if name == b"Helvetica-Bold"
        ));
    }

    #[test]
    fn test_image_watermark_top_right() {
        let mut doc = sample_document(1);
        let mark = ImageWatermark {
            image: png(20, 10, false),
            opacity: 0.2,
            position: ImagePosition::TopRight,
        };
        apply_image_watermark(&mut doc, &mark).unwrap();

        let content = &page_contents(&doc)[0];
        assert!(content.contains("10 0 0 5 562 747 cm"), "{}", content);
        assert!(content.contains("/WmIm1 Do"));
    }

    #[test]
    fn test_image_watermark_with_alpha_gets_soft_mask() {
        let mut doc = sample_document(1);
        let mark = ImageWatermark {
            image: png(4, 4, true),
            opacity: 0.2,
            position: ImagePosition::Center,
        };
        apply_image_watermark(&mut doc, &mark).unwrap();

        let page = *doc.get_pages().get(&1).unwrap();
        let resources = page_resources(&doc, page).unwrap();
        let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
        let image_id = xobjects.get(b"WmIm1").unwrap().as_reference().unwrap();
        let stream = doc.get_object(image_id).unwrap().as_stream().unwrap();
        assert!(stream.dict.has(b"SMask"));

        let content = &page_contents(&doc)[0];
        assert!(content.contains("2 0 0 2 305 395 cm"), "{}", content);
    }

    #[test]
    fn test_invalid_image_rejected() {
        let mut doc = sample_document(1);
        let mark = ImageWatermark {
            image: b"not an image".to_vec(),
            opacity: 0.2,
            position: ImagePosition::Center,
        };
        assert!(matches!(
            apply_image_watermark(&mut doc, &mark),
            Err(ProcessError::ImageProcessing(_))
        ));
    }
}
