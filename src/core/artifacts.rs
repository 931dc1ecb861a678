//! JSON files handed from one pipeline stage to the next.

use super::holding::NormalizedHolding;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::path::Path;

/// One disclosure document found on the listing page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfSourceMetadata {
    pub url: String,
    pub fund_name: String,
    pub filename: String,
    pub scraped_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloaded_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PdfSourceMetadata {
    pub fn is_downloaded(&self) -> bool {
        self.local_path.is_some() && self.error.is_none()
    }
}

/// `pdf_metadata.json`, rewritten whole on every scrape run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeMetadata {
    pub last_scraped: DateTime<Utc>,
    pub total_found: usize,
    pub downloaded: usize,
    pub failed: usize,
    pub pdfs: Vec<PdfSourceMetadata>,
}

impl ScrapeMetadata {
    pub fn new(found: usize, pdfs: Vec<PdfSourceMetadata>) -> Self {
        let downloaded = pdfs.iter().filter(|p| p.is_downloaded()).count();
        Self {
            last_scraped: Utc::now(),
            total_found: found,
            downloaded,
            failed: pdfs.len() - downloaded,
            pdfs,
        }
    }
}

/// `parsed_holdings/<stem>.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub fund_name: String,
    pub filename: String,
    pub parsed_at: DateTime<Utc>,
    pub total_holdings: usize,
    pub holdings: Vec<NormalizedHolding>,
}

impl ParsedDocument {
    pub fn new(fund_name: &str, filename: &str, holdings: Vec<NormalizedHolding>) -> Self {
        Self {
            fund_name: fund_name.to_string(),
            filename: filename.to_string(),
            parsed_at: Utc::now(),
            total_holdings: holdings.len(),
            holdings,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedFundSummary {
    pub fund_name: String,
    pub filename: String,
    pub holdings_count: usize,
    pub output_file: String,
}

/// `parsed_holdings/_summary.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseSummary {
    pub parsed_at: DateTime<Utc>,
    pub total_parsed: usize,
    pub skipped: usize,
    pub funds: Vec<ParsedFundSummary>,
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let content = serde_json::to_string_pretty(value)?;
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn pdf(name: &str, error: Option<&str>) -> PdfSourceMetadata {
        PdfSourceMetadata {
            url: format!("https://example.com/{name}.pdf"),
            fund_name: name.to_string(),
            filename: format!("{name}.pdf"),
            scraped_at: Utc::now(),
            local_path: Some(format!("pdfs/{name}.pdf")),
            downloaded_at: error.is_none().then(Utc::now),
            file_size: error.is_none().then_some(1024),
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn test_scrape_metadata_counts() {
        let metadata = ScrapeMetadata::new(
            12,
            vec![pdf("a", None), pdf("b", Some("HTTP 404")), pdf("c", None)],
        );
        assert_eq!(metadata.total_found, 12);
        assert_eq!(metadata.downloaded, 2);
        assert_eq!(metadata.failed, 1);
    }

    #[test]
    fn test_parsed_document_file_round_trip() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("nested").join("fund.json");
        let doc = ParsedDocument::new(
            "Axis Bluechip",
            "axis.pdf",
            vec![NormalizedHolding {
                security: "Infosys Ltd".to_string(),
                weight: None,
                market_value: Some(10.0),
                sector: None,
            }],
        );
        write_json(&path, &doc)?;

        let raw: serde_json::Value = read_json(&path)?;
        assert_eq!(raw["total_holdings"], 1);
        assert!(raw["holdings"][0]["weight"].is_null());
        assert!(raw["holdings"][0].get("sector").is_none());

        let back: ParsedDocument = read_json(&path)?;
        assert_eq!(back, doc);
        Ok(())
    }

    #[test]
    fn test_read_json_reports_path() {
        let err = read_json::<ParseSummary>(Path::new("/nonexistent/_summary.json")).unwrap_err();
        assert!(err.to_string().contains("_summary.json"));
    }
}
