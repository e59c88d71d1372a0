use std::str::FromStr;

use lopdf::Document;
use serde::Serialize;

use super::{human_size, load_document_bytes, save_document};
use crate::error::ProcessError;

/// Output quality. Lower quality means more aggressive size reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quality {
    Low,
    #[default]
    Medium,
    High,
}

impl Quality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Low => "low",
            Quality::Medium => "medium",
            Quality::High => "high",
        }
    }

    /// Unknown names fall back to `Medium`.
    pub fn from_name(name: &str) -> Self {
        name.parse().unwrap_or_default()
    }
}

impl FromStr for Quality {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Quality::Low),
            "medium" => Ok(Quality::Medium),
            "high" => Ok(Quality::High),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CompressionStats {
    pub original_size: u64,
    pub compressed_size: u64,
    pub reduction_percent: f64,
    pub original_size_human: String,
    pub compressed_size_human: String,
}

impl CompressionStats {
    pub fn new(original_size: u64, compressed_size: u64) -> Self {
        let reduction = if original_size == 0 {
            0.0
        } else {
            (original_size as f64 - compressed_size as f64) / original_size as f64 * 100.0
        };
        Self {
            original_size,
            compressed_size,
            reduction_percent: (reduction * 10.0).round() / 10.0,
            original_size_human: human_size(original_size),
            compressed_size_human: human_size(compressed_size),
        }
    }
}

fn optimize(doc: &mut Document, quality: Quality) {
    match quality {
        Quality::Low => {
            doc.decompress();
            doc.prune_objects();
            doc.delete_zero_length_streams();
            doc.renumber_objects();
            doc.compress();
        }
        Quality::Medium => {
            doc.prune_objects();
            doc.compress();
        }
        Quality::High => doc.compress(),
    }
}

/// Re-encodes `original` at the given quality.
pub fn compress_bytes(
    original: &[u8],
    quality: Quality,
) -> Result<(Vec<u8>, CompressionStats), ProcessError> {
    let _span = tracing::info_span!("pdf.compress", quality = quality.as_str()).entered();

    let mut doc = load_document_bytes(original)?;
    optimize(&mut doc, quality);
    let output = save_document(&mut doc)?;

    let stats = CompressionStats::new(original.len() as u64, output.len() as u64);
    tracing::debug!(
        original = stats.original_size,
        compressed = stats.compressed_size,
        "compressed document"
    );
    Ok((output, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::test_support::*;

    #[test]
    fn test_quality_parsing() {
        assert_eq!(Quality::from_name("low"), Quality::Low);
        assert_eq!(Quality::from_name("HIGH"), Quality::High);
        assert_eq!(Quality::from_name("medium"), Quality::Medium);
        assert_eq!(Quality::from_name("extreme"), Quality::Medium);
        assert_eq!(Quality::from_name(""), Quality::Medium);
    }

    #[test]
    fn test_stats_rounding() {
        let stats = CompressionStats::new(3000, 1000);
        assert_eq!(stats.reduction_percent, 66.7);
        assert_eq!(stats.original_size_human, "2.9 KB");
        assert_eq!(stats.compressed_size_human, "1000.0 B");
    }

    #[test]
    fn test_stats_growth_is_negative() {
        let stats = CompressionStats::new(1000, 1100);
        assert_eq!(stats.reduction_percent, -10.0);
    }

    #[test]
    fn test_stats_empty_original() {
        assert_eq!(CompressionStats::new(0, 10).reduction_percent, 0.0);
    }

    #[test]
    fn test_every_quality_produces_valid_pdf() {
        let original = sample_pdf_bytes(3);
        for quality in [Quality::Low, Quality::Medium, Quality::High] {
            let (output, stats) = compress_bytes(&original, quality).unwrap();
            let doc = crate::pdf::load_document_bytes(&output).unwrap();
            assert_eq!(doc.get_pages().len(), 3);
            assert_eq!(stats.original_size, original.len() as u64);
            assert_eq!(stats.compressed_size, output.len() as u64);
        }
    }
}
