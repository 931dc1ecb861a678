use crate::core::artifacts::PdfSourceMetadata;
use crate::core::error::SourceError;
use crate::providers::util::{
    DOWNLOAD_TIMEOUT, LISTING_TIMEOUT, absolute_url, browser_client, cell_text, get_bytes,
    get_text,
};
use anyhow::{Context, Result};
use chrono::Utc;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A document written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Downloaded {
    pub path: PathBuf,
    pub size: u64,
}

/// The AMFI portfolio disclosure listing: a page of links to per-fund PDFs.
pub struct AmfiDisclosures {
    listing_url: String,
}

impl AmfiDisclosures {
    pub fn new(listing_url: &str) -> Self {
        AmfiDisclosures {
            listing_url: listing_url.to_string(),
        }
    }

    /// Every portfolio or holdings PDF linked from the listing page, in page
    /// order.
    pub async fn list_documents(&self) -> Result<Vec<PdfSourceMetadata>, SourceError> {
        let client = browser_client(&self.listing_url, LISTING_TIMEOUT)?;
        let page = get_text(&client, &self.listing_url).await?;
        let documents = parse_listing(&self.listing_url, &page)?;
        info!(count = documents.len(), "Found disclosure documents");
        Ok(documents)
    }

    /// Fetches one document into `pdf_dir`, named after the link's filename.
    pub async fn download(&self, doc: &PdfSourceMetadata, pdf_dir: &Path) -> Result<Downloaded> {
        let client = browser_client(&doc.url, DOWNLOAD_TIMEOUT)?;
        let bytes = get_bytes(&client, &doc.url).await?;

        std::fs::create_dir_all(pdf_dir)
            .with_context(|| format!("Failed to create directory: {}", pdf_dir.display()))?;
        let path = pdf_dir.join(&doc.filename);
        std::fs::write(&path, &bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        debug!(file = %path.display(), bytes = bytes.len(), "Downloaded document");

        Ok(Downloaded {
            path,
            size: bytes.len() as u64,
        })
    }
}

fn is_disclosure_link(href: &str) -> bool {
    let lower = href.to_lowercase();
    lower.contains(".pdf") && (lower.contains("portfolio") || lower.contains("holding"))
}

/// `filename`, or `stem_2.ext`, `stem_3.ext` and so on when another link
/// already claimed it. Names compare case-insensitively.
fn unique_filename(filename: &str, taken: &mut HashSet<String>) -> String {
    let (stem, ext) = filename.rsplit_once('.').unwrap_or((filename, ""));
    let mut candidate = filename.to_string();
    let mut n = 2;
    while !taken.insert(candidate.to_lowercase()) {
        candidate = if ext.is_empty() {
            format!("{stem}_{n}")
        } else {
            format!("{stem}_{n}.{ext}")
        };
        n += 1;
    }
    candidate
}

fn parse_listing(listing_url: &str, html: &str) -> Result<Vec<PdfSourceMetadata>, SourceError> {
    let document = Html::parse_document(html);
    let link_sel = Selector::parse("a[href]").unwrap();
    let scraped_at = Utc::now();

    let mut documents: Vec<PdfSourceMetadata> = Vec::new();
    let mut taken = HashSet::new();
    for link in document.select(&link_sel) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        if !is_disclosure_link(href) {
            continue;
        }
        let url = absolute_url(listing_url, href)?;
        if documents.iter().any(|d| d.url == url) {
            continue;
        }
        let last_segment = href.rsplit('/').next().unwrap_or_default();
        if last_segment.is_empty() {
            continue;
        }
        let filename = unique_filename(last_segment, &mut taken);
        let text = cell_text(link);
        let fund_name = if text.is_empty() {
            last_segment.replace(".pdf", "")
        } else {
            text
        };
        documents.push(PdfSourceMetadata {
            url,
            fund_name,
            filename,
            scraped_at,
            local_path: None,
            downloaded_at: None,
            file_size: None,
            error: None,
        });
    }
    Ok(documents)
}
