//! Word-level layout extraction.
//!
//! Word boxes are reported in extraction space: origin at the top-left
//! corner of the page's MediaBox, `top`/`bottom` growing downwards, in
//! points.

use std::collections::HashMap;

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};

use super::overlay::page_resources;
use super::{media_box, object_to_f64, resolve};
use crate::error::ProcessError;

/// Horizontal gap (and baseline shift) beyond which glyphs start a new word.
const WORD_TOLERANCE: f64 = 3.0;

/// Descent used when a font carries no descriptor, as a fraction of the size.
const DEFAULT_DESCENT: f64 = -0.2;

#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub text: String,
    pub x0: f64,
    pub x1: f64,
    pub top: f64,
    pub bottom: f64,
}

#[derive(Debug, Clone)]
pub struct PageWords {
    /// 1-based page number.
    pub page: u32,
    pub height: f64,
    pub words: Vec<Word>,
}

pub trait WordExtractor: Send + Sync {
    fn extract_words(&self, doc: &Document) -> Result<Vec<PageWords>, ProcessError>;
}

/// Interprets page content streams directly: text state operators, the
/// current transformation matrix and simple-font `/Widths`.
///
/// Codes are decoded one byte per glyph as Latin-1; composite (Type0) fonts
/// and text inside form XObjects are not interpreted.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContentStreamWordExtractor;

impl WordExtractor for ContentStreamWordExtractor {
    fn extract_words(&self, doc: &Document) -> Result<Vec<PageWords>, ProcessError> {
        let _span = tracing::info_span!("pdf.extract_words").entered();

        doc.get_pages()
            .into_iter()
            .map(|(page, page_id)| {
                let [x0, y0, x1, y1] = media_box(doc, page_id);
                let glyphs = page_glyphs(doc, page_id)?;
                Ok(PageWords {
                    page,
                    height: (y1 - y0).abs(),
                    words: group_words(&glyphs, x0.min(x1), y0.max(y1)),
                })
            })
            .collect()
    }
}

type Matrix = [f64; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

fn multiply(m1: &Matrix, m2: &Matrix) -> Matrix {
    [
        m1[0] * m2[0] + m1[1] * m2[2],
        m1[0] * m2[1] + m1[1] * m2[3],
        m1[2] * m2[0] + m1[3] * m2[2],
        m1[2] * m2[1] + m1[3] * m2[3],
        m1[4] * m2[0] + m1[5] * m2[2] + m2[4],
        m1[4] * m2[1] + m1[5] * m2[3] + m2[5],
    ]
}

fn translation(tx: f64, ty: f64) -> Matrix {
    [1.0, 0.0, 0.0, 1.0, tx, ty]
}

struct FontMetrics {
    first_char: i64,
    widths: Vec<f64>,
    /// Used for codes outside `/Widths`, in glyph space (1/1000 em).
    default_width: f64,
    /// Fraction of the font size below the baseline (negative).
    descent: f64,
}

impl FontMetrics {
    fn from_dictionary(doc: &Document, font: &Dictionary) -> Self {
        let base_font = match font.get(b"BaseFont") {
            Ok(Object::Name(name)) => String::from_utf8_lossy(name).into_owned(),
            _ => String::new(),
        };
        let default_width = if base_font.contains("Courier") { 600.0 } else { 500.0 };

        let first_char = font
            .get(b"FirstChar")
            .ok()
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(0);
        let widths = font
            .get(b"Widths")
            .ok()
            .and_then(|o| resolve(doc, o).ok())
            .and_then(|o| o.as_array().ok())
            .map(|arr| {
                arr.iter()
                    .map(|w| {
                        resolve(doc, w)
                            .ok()
                            .and_then(object_to_f64)
                            .unwrap_or(default_width)
                    })
                    .collect()
            })
            .unwrap_or_default();

        let descent = font
            .get(b"FontDescriptor")
            .ok()
            .and_then(|o| resolve(doc, o).ok())
            .and_then(|o| o.as_dict().ok())
            .and_then(|d| d.get(b"Descent").ok())
            .and_then(object_to_f64)
            .map(|d| d / 1000.0)
            .unwrap_or(DEFAULT_DESCENT);

        Self {
            first_char,
            widths,
            default_width,
            descent,
        }
    }

    fn fallback() -> Self {
        Self {
            first_char: 0,
            widths: Vec::new(),
            default_width: 500.0,
            descent: DEFAULT_DESCENT,
        }
    }

    /// Advance width of `code` as a fraction of the font size.
    fn width(&self, code: u8) -> f64 {
        let index = code as i64 - self.first_char;
        let units = if index >= 0 {
            self.widths
                .get(index as usize)
                .copied()
                .unwrap_or(self.default_width)
        } else {
            self.default_width
        };
        units / 1000.0
    }
}

fn page_fonts(doc: &Document, page_id: ObjectId) -> Result<HashMap<Vec<u8>, FontMetrics>, ProcessError> {
    let resources = page_resources(doc, page_id)?;
    let mut fonts = HashMap::new();

    let Ok(font_entry) = resources.get(b"Font") else {
        return Ok(fonts);
    };
    if let Object::Dictionary(entries) = resolve(doc, font_entry)? {
        for (name, value) in entries.iter() {
            if let Ok(Object::Dictionary(font)) = resolve(doc, value) {
                fonts.insert(name.clone(), FontMetrics::from_dictionary(doc, font));
            }
        }
    }
    Ok(fonts)
}

#[derive(Debug, Clone)]
struct Glyph {
    ch: char,
    x0: f64,
    x1: f64,
    y0: f64,
    y1: f64,
    baseline: f64,
}

#[derive(Clone)]
struct GraphicsState {
    ctm: Matrix,
    char_spacing: f64,
    word_spacing: f64,
    horizontal_scale: f64,
    leading: f64,
    rise: f64,
    font: Option<Vec<u8>>,
    font_size: f64,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: IDENTITY,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
            font: None,
            font_size: 0.0,
        }
    }
}

struct Interpreter<'a> {
    fonts: &'a HashMap<Vec<u8>, FontMetrics>,
    fallback: FontMetrics,
    state: GraphicsState,
    stack: Vec<GraphicsState>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    glyphs: Vec<Glyph>,
}

impl<'a> Interpreter<'a> {
    fn new(fonts: &'a HashMap<Vec<u8>, FontMetrics>) -> Self {
        Self {
            fonts,
            fallback: FontMetrics::fallback(),
            state: GraphicsState::default(),
            stack: Vec::new(),
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
            glyphs: Vec::new(),
        }
    }

    fn run(mut self, content: &Content) -> Vec<Glyph> {
        for op in &content.operations {
            let nums: Vec<f64> = op.operands.iter().filter_map(object_to_f64).collect();
            match op.operator.as_str() {
                "q" => self.stack.push(self.state.clone()),
                "Q" => {
                    if let Some(saved) = self.stack.pop() {
                        self.state = saved;
                    }
                }
                "cm" if nums.len() == 6 => {
                    let m = [nums[0], nums[1], nums[2], nums[3], nums[4], nums[5]];
                    self.state.ctm = multiply(&m, &self.state.ctm);
                }
                "BT" => {
                    self.text_matrix = IDENTITY;
                    self.line_matrix = IDENTITY;
                }
                "Tf" => {
                    if let Some(Object::Name(name)) = op.operands.first() {
                        self.state.font = Some(name.clone());
                    }
                    if let Some(size) = op.operands.get(1).and_then(object_to_f64) {
                        self.state.font_size = size;
                    }
                }
                "Tc" if !nums.is_empty() => self.state.char_spacing = nums[0],
                "Tw" if !nums.is_empty() => self.state.word_spacing = nums[0],
                "Tz" if !nums.is_empty() => self.state.horizontal_scale = nums[0] / 100.0,
                "TL" if !nums.is_empty() => self.state.leading = nums[0],
                "Ts" if !nums.is_empty() => self.state.rise = nums[0],
                "Td" if nums.len() == 2 => self.move_line(nums[0], nums[1]),
                "TD" if nums.len() == 2 => {
                    self.state.leading = -nums[1];
                    self.move_line(nums[0], nums[1]);
                }
                "Tm" if nums.len() == 6 => {
                    let m = [nums[0], nums[1], nums[2], nums[3], nums[4], nums[5]];
                    self.text_matrix = m;
                    self.line_matrix = m;
                }
                "T*" => self.next_line(),
                "Tj" => {
                    if let Some(Object::String(bytes, _)) = op.operands.first() {
                        self.show(bytes);
                    }
                }
                "'" => {
                    self.next_line();
                    if let Some(Object::String(bytes, _)) = op.operands.first() {
                        self.show(bytes);
                    }
                }
                "\"" => {
                    if let (Some(aw), Some(ac)) = (
                        op.operands.first().and_then(object_to_f64),
                        op.operands.get(1).and_then(object_to_f64),
                    ) {
                        self.state.word_spacing = aw;
                        self.state.char_spacing = ac;
                    }
                    self.next_line();
                    if let Some(Object::String(bytes, _)) = op.operands.get(2) {
                        self.show(bytes);
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = op.operands.first() {
                        for item in items {
                            match item {
                                Object::String(bytes, _) => self.show(bytes),
                                other => {
                                    if let Some(adjust) = object_to_f64(other) {
                                        let tx = -adjust / 1000.0
                                            * self.state.font_size
                                            * self.state.horizontal_scale;
                                        self.advance(tx);
                                    }
                                }
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        self.glyphs
    }

    fn move_line(&mut self, tx: f64, ty: f64) {
        self.line_matrix = multiply(&translation(tx, ty), &self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = self.state.leading;
        self.move_line(0.0, -leading);
    }

    fn advance(&mut self, tx: f64) {
        self.text_matrix = multiply(&translation(tx, 0.0), &self.text_matrix);
    }

    fn show(&mut self, bytes: &[u8]) {
        let metrics = self
            .state
            .font
            .as_ref()
            .and_then(|name| self.fonts.get(name))
            .unwrap_or(&self.fallback);
        let size = self.state.font_size;
        let scale = self.state.horizontal_scale;

        let mut pending = Vec::with_capacity(bytes.len());
        let mut text_matrix = self.text_matrix;
        for &code in bytes {
            let width = metrics.width(code);
            let render = multiply(
                &[size * scale, 0.0, 0.0, size, 0.0, self.state.rise],
                &multiply(&text_matrix, &self.state.ctm),
            );

            let x0 = render[4];
            let x1 = x0 + width * render[0];
            let em = render[3].hypot(render[2]);
            let baseline = render[5];
            let y0 = baseline + metrics.descent * em;
            pending.push(Glyph {
                ch: code as char,
                x0: x0.min(x1),
                x1: x0.max(x1),
                y0,
                y1: y0 + em,
                baseline,
            });

            let mut tx = width * size + self.state.char_spacing;
            if code == b' ' {
                tx += self.state.word_spacing;
            }
            text_matrix = multiply(&translation(tx * scale, 0.0), &text_matrix);
        }

        self.text_matrix = text_matrix;
        self.glyphs.extend(pending);
    }
}

fn page_glyphs(doc: &Document, page_id: ObjectId) -> Result<Vec<Glyph>, ProcessError> {
    let fonts = page_fonts(doc, page_id)?;
    let bytes = doc.get_page_content(page_id)?;
    let content = Content::decode(&bytes)?;
    Ok(Interpreter::new(&fonts).run(&content))
}

/// Groups glyphs in stream order into whitespace-delimited words.
/// `page_left` and `page_top` locate the MediaBox's top-left corner in user
/// space.
fn group_words(glyphs: &[Glyph], page_left: f64, page_top: f64) -> Vec<Word> {
    let mut words = Vec::new();
    let mut current: Option<(Word, f64)> = None;

    for glyph in glyphs {
        if glyph.ch.is_whitespace() {
            if let Some((word, _)) = current.take() {
                words.push(word);
            }
            continue;
        }

        let top = page_top - glyph.y1;
        let bottom = page_top - glyph.y0;
        let (x0, x1) = (glyph.x0 - page_left, glyph.x1 - page_left);

        if let Some((word, baseline)) = current.as_mut() {
            let continues = (glyph.baseline - *baseline).abs() <= WORD_TOLERANCE
                && x0 >= word.x1 - WORD_TOLERANCE
                && x0 - word.x1 <= WORD_TOLERANCE;
            if continues {
                word.text.push(glyph.ch);
                word.x1 = word.x1.max(x1);
                word.top = word.top.min(top);
                word.bottom = word.bottom.max(bottom);
                continue;
            }
            if let Some((finished, _)) = current.take() {
                words.push(finished);
            }
        }

        current = Some((
            Word {
                text: glyph.ch.to_string(),
                x0,
                x1,
                top,
                bottom,
            },
            glyph.baseline,
        ));
    }

    if let Some((word, _)) = current {
        words.push(word);
    }
    words
}
