//! Page selection grammar.
//!
//! A selection is either absent (all pages), a list of 1-based page numbers,
//! or a comma string such as `"1-3, 5"`. Split ranges (`"a-b"` / `"n"`) have
//! their own clamping rules, see [`parse_split_range`].

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::{PdfSuiteError, Result};

static RE_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)\s*-\s*(\d+)\s*$").unwrap());
static RE_SINGLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*(\d+)\s*$").unwrap());

/// Expressions never expand past this page number.
const MAX_PAGE_NUMBER: i64 = 100_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageSpec {
    All,
    /// 1-based page numbers in caller order. Zero or negative entries are kept
    /// here and dropped by [`PageSpec::resolve`].
    List(Vec<i64>),
    /// Comma expression, already expanded, sorted and de-duplicated.
    Expression(Vec<i64>),
}

impl PageSpec {
    /// Interprets a JSON argument: `null`/empty means all pages, an array is a
    /// list, a string is either a JSON-encoded array or a comma expression.
    pub fn from_value(value: Option<&Value>) -> Result<Self> {
        match value {
            None | Some(Value::Null) => Ok(PageSpec::All),
            Some(Value::Array(items)) if items.is_empty() => Ok(PageSpec::All),
            Some(Value::Array(items)) => items
                .iter()
                .map(page_number_from_value)
                .collect::<Result<Vec<_>>>()
                .map(PageSpec::List),
            Some(Value::Number(_)) => value
                .map(page_number_from_value)
                .transpose()
                .map(|n| PageSpec::List(n.into_iter().collect())),
            Some(Value::String(s)) => Self::parse(s),
            Some(other) => Err(PdfSuiteError::validation(format!(
                "Invalid page selection: {}",
                other
            ))),
        }
    }

    pub fn parse(spec: &str) -> Result<Self> {
        let trimmed = spec.trim();
        if trimmed.is_empty() {
            return Ok(PageSpec::All);
        }
        if trimmed.starts_with('[') {
            let value: Value = serde_json::from_str(trimmed)?;
            return Self::from_value(Some(&value));
        }

        let mut pages = BTreeSet::new();
        for part in trimmed.split(',') {
            if let Some(caps) = RE_RANGE.captures(part) {
                let start = parse_number(&caps[1])?;
                let end = parse_number(&caps[2])?;
                pages.extend(start..=end.min(MAX_PAGE_NUMBER));
            } else if let Some(caps) = RE_SINGLE.captures(part) {
                pages.insert(parse_number(&caps[1])?);
            } else {
                return Err(PdfSuiteError::validation(format!(
                    "Invalid page number: {}",
                    part.trim()
                )));
            }
        }
        Ok(PageSpec::Expression(pages.into_iter().collect()))
    }

    /// Resolves to 1-based page numbers within `1..=total`, in selection order.
    pub fn resolve(&self, total: u32) -> Vec<u32> {
        match self {
            PageSpec::All => (1..=total).collect(),
            PageSpec::List(pages) | PageSpec::Expression(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total as i64)
                .map(|&p| p as u32)
                .collect(),
        }
    }
}

fn parse_number(digits: &str) -> Result<i64> {
    digits
        .parse::<i64>()
        .map_err(|_| PdfSuiteError::validation(format!("Invalid page number: {}", digits)))
}

fn page_number_from_value(value: &Value) -> Result<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| PdfSuiteError::validation(format!("Invalid page number: {}", n))),
        Value::String(s) => parse_number(s.trim()),
        other => Err(PdfSuiteError::validation(format!(
            "Invalid page number: {}",
            other
        ))),
    }
}

/// Parses one split range. `"a-b"` is clamped to `1..=total`; `"n"` selects
/// page `n` only when it exists. May return an empty selection.
pub fn parse_split_range(range: &str, total: u32) -> Result<Vec<u32>> {
    if let Some(caps) = RE_RANGE.captures(range) {
        let start = parse_number(&caps[1])?.max(1);
        let end = parse_number(&caps[2])?.min(total as i64);
        return Ok((start..=end).map(|p| p as u32).collect());
    }
    if let Some(caps) = RE_SINGLE.captures(range) {
        let page = parse_number(&caps[1])?;
        if page >= 1 && page <= total as i64 {
            return Ok(vec![page as u32]);
        }
        return Ok(Vec::new());
    }
    Err(PdfSuiteError::validation(format!(
        "Invalid page range: {}",
        range.trim()
    )))
}

/// Consecutive chunks of `n` pages: `[(1, n), (n+1, 2n), ..]`, last one short.
pub fn chunk_ranges(total: u32, n: u32) -> Vec<(u32, u32)> {
    if n == 0 {
        return Vec::new();
    }
    (0..total)
        .step_by(n as usize)
        .map(|start| (start + 1, (start + n).min(total)))
        .collect()
}
