//! Standard 14 font metrics needed to position watermark text.

use lopdf::{dictionary, Dictionary};

pub const HELVETICA_BOLD: &str = "Helvetica-Bold";

/// Advance widths (1/1000 em) of Helvetica-Bold for WinAnsi codes 32..=126.
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // 32-47
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, // 48-63
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, // 64-79
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, // 80-95
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, // 96-111
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, // 112-126
];

/// Used for codes outside the printable ASCII table.
const FALLBACK_WIDTH: u16 = 556;

/// Encodes text as single-byte WinAnsi; characters outside Latin-1 become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if (c as u32) <= 0xFF { c as u8 } else { b'?' })
        .collect()
}

/// Width of `encoded` in points when set in Helvetica-Bold at `font_size`.
pub fn helvetica_bold_width(encoded: &[u8], font_size: f64) -> f64 {
    let units: u32 = encoded
        .iter()
        .map(|&b| {
            u32::from(match b {
                32..=126 => HELVETICA_BOLD_WIDTHS[(b - 32) as usize],
                _ => FALLBACK_WIDTH,
            })
        })
        .sum();
    units as f64 * font_size / 1000.0
}

pub fn helvetica_bold_dictionary() -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => HELVETICA_BOLD,
        "Encoding" => "WinAnsiEncoding",
    }
}

/// Escapes bytes for a PDF literal string body.
pub fn escape_literal(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() + 2);
    for &b in bytes {
        match b {
            b'(' | b')' | b'\\' => {
                out.push('\\');
                out.push(b as char);
            }
            32..=126 => out.push(b as char),
            _ => out.push_str(&format!("\\{:03o}", b)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_of_known_text() {
        // C=722 O=778 N=722 F=611 I=278 D=722 E=667 N=722 T=611 I=278 A=722 L=611
        let width = helvetica_bold_width(b"CONFIDENTIAL", 1000.0);
        assert_eq!(width, 7444.0);
        assert!((helvetica_bold_width(b"CONFIDENTIAL", 60.0) - 446.64).abs() < 1e-9);
    }

    #[test]
    fn test_width_of_space_and_fallback() {
        assert_eq!(helvetica_bold_width(b" ", 1000.0), 278.0);
        assert_eq!(helvetica_bold_width(&[0xE9], 1000.0), 556.0);
    }

    #[test]
    fn test_encode_win_ansi() {
        assert_eq!(encode_win_ansi("Caf\u{e9}"), vec![b'C', b'a', b'f', 0xE9]);
        assert_eq!(encode_win_ansi("\u{4e2d}"), vec![b'?']);
    }

    #[test]
    fn test_escape_literal() {
        assert_eq!(escape_literal(b"a(b)c\\"), "a\\(b\\)c\\\\");
        assert_eq!(escape_literal(&[0xE9]), "\\351");
    }
}
