use crate::core::error::SourceError;
use crate::core::holding::RawHolding;
use crate::core::source::HoldingsSource;
use crate::providers::util::{PAGE_TIMEOUT, absolute_url, browser_client, cell_text, get_text};
use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::{debug, warn};

/// Reads holdings from a ValueResearch snapshot page addressed by a slug of
/// the fund name. When the snapshot lacks a holdings section, the first
/// fund link on it is followed once.
pub struct ValueResearchSource {
    base_url: String,
}

impl ValueResearchSource {
    pub fn new(base_url: &str) -> Self {
        ValueResearchSource {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn snapshot_url(&self, fund_name: &str) -> String {
        format!(
            "{}/funds/newsnapshot.asp?schemecode={}",
            self.base_url,
            slug(fund_name)
        )
    }

    async fn fetch_holdings(&self, fund_name: &str) -> Result<Vec<RawHolding>, SourceError> {
        let snapshot_url = self.snapshot_url(fund_name);
        let client = browser_client(&snapshot_url, PAGE_TIMEOUT)?;

        let snapshot = get_text(&client, &snapshot_url).await?;
        let (rows, detail_link) = {
            let document = Html::parse_document(&snapshot);
            (parse_holdings(&document), first_fund_link(&document))
        };
        if !rows.is_empty() {
            return Ok(rows);
        }

        let href = detail_link.ok_or_else(|| SourceError::NoMatch {
            query: fund_name.to_string(),
        })?;
        let detail_url = absolute_url(&self.base_url, &href)?;
        debug!("Snapshot had no holdings, following {}", detail_url);

        let detail = get_text(&client, &detail_url).await?;
        Ok(parse_holdings(&Html::parse_document(&detail)))
    }
}

fn slug(fund_name: &str) -> String {
    fund_name.replace(' ', "-").to_lowercase()
}

fn first_fund_link(document: &Html) -> Option<String> {
    let link_sel = Selector::parse(r#"a[href*="/funds/"]"#).unwrap();
    document
        .select(&link_sel)
        .filter_map(|a| a.value().attr("href"))
        .find(|href| !href.contains("newsnapshot.asp"))
        .map(str::to_string)
}

/// Rows of every `div.holdings-table`, skipping each section's header row.
fn parse_holdings(document: &Html) -> Vec<RawHolding> {
    let section_sel = Selector::parse("div.holdings-table").unwrap();
    let tr_sel = Selector::parse("tr").unwrap();
    let td_sel = Selector::parse("td").unwrap();

    let mut rows = Vec::new();
    for section in document.select(&section_sel) {
        for tr in section.select(&tr_sel).skip(1) {
            let cells: Vec<_> = tr.select(&td_sel).collect();
            if cells.len() < 2 {
                continue;
            }
            let security = cell_text(cells[0]);
            if security.is_empty() {
                continue;
            }
            rows.push(RawHolding::new(security, cell_text(cells[1])));
        }
    }
    rows
}

#[async_trait]
impl HoldingsSource for ValueResearchSource {
    async fn fetch(&self, fund_name: &str) -> Option<Vec<RawHolding>> {
        match self.fetch_holdings(fund_name).await {
            Ok(rows) if !rows.is_empty() => Some(rows),
            Ok(_) => {
                debug!(fund = fund_name, "ValueResearch page had no holdings rows");
                None
            }
            Err(e) => {
                warn!(fund = fund_name, error = %e, "ValueResearch fetch failed");
                None
            }
        }
    }

    fn name(&self) -> &str {
        "ValueResearch"
    }
}
