//! Best-effort coercion of scraped text into numbers.

use super::holding::{NormalizedHolding, RawHolding};

/// Names this short are extraction noise (stray cell fragments, footnote marks).
const MIN_SECURITY_LEN: usize = 4;

const MISSING_MARKERS: &[&str] = &["-", "--", "—", "–", "n/a", "na", "nil", "nan", "null"];

const CURRENCY_PREFIXES: &[&str] = &["inr", "rs.", "rs"];

fn is_missing(raw: &str) -> bool {
    raw.is_empty() || MISSING_MARKERS.contains(&raw.to_lowercase().as_str())
}

fn parse_decimal(cleaned: &str) -> Option<f64> {
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses a "% to net assets" cell. Returns `None` for anything that is not a
/// plausible percentage.
pub fn clean_percentage(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if is_missing(trimmed) {
        return None;
    }
    let cleaned: String = trimmed
        .chars()
        .filter(|c| !matches!(c, '%' | ',') && !c.is_whitespace())
        .collect();
    parse_decimal(&cleaned).filter(|v| (0.0..=100.0).contains(v))
}

/// Parses a market value cell such as `₹ 1,23,456.70` or `Rs. 5,000`.
pub fn clean_amount(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if is_missing(trimmed) {
        return None;
    }
    let mut cleaned: String = trimmed
        .chars()
        .filter(|c| !matches!(c, ',' | '₹' | '$') && !c.is_whitespace())
        .collect();
    let lower = cleaned.to_lowercase();
    if let Some(prefix) = CURRENCY_PREFIXES.iter().find(|p| lower.starts_with(*p)) {
        cleaned = cleaned[prefix.len()..].to_string();
    }
    parse_decimal(&cleaned)
}

/// Returns the trimmed security name, or `None` when it is too short to be real.
pub fn clean_security(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (trimmed.chars().count() >= MIN_SECURITY_LEN).then(|| trimmed.to_string())
}

/// Normalizes rows scraped from HTML pages. A row without a usable weight
/// carries no information on these pages and is dropped.
pub fn normalize_scraped(rows: &[RawHolding]) -> Vec<NormalizedHolding> {
    rows.iter()
        .filter_map(|row| {
            let security = clean_security(&row.security)?;
            let weight = clean_percentage(&row.weight_text)?;
            Some(NormalizedHolding {
                security,
                weight: Some(weight),
                market_value: None,
                sector: None,
            })
        })
        .collect()
}

/// A row picked out of a disclosure table, cells still as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableRow<'a> {
    pub security: &'a str,
    pub weight: Option<&'a str>,
    pub market_value: Option<&'a str>,
}

/// Normalizes rows read from disclosure tables. Unlike scraped rows, a row
/// keeps its place when the weight cell is blank or malformed.
pub fn normalize_table(rows: &[TableRow<'_>]) -> Vec<NormalizedHolding> {
    rows.iter()
        .filter_map(|row| {
            let security = clean_security(row.security)?;
            Some(NormalizedHolding {
                security,
                weight: row.weight.and_then(clean_percentage),
                market_value: row.market_value.and_then(clean_amount),
                sector: None,
            })
        })
        .collect()
}
