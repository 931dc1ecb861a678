use crate::core::error::SourceError;
use crate::core::holding::RawHolding;
use crate::core::source::HoldingsSource;
use crate::providers::util::{PAGE_TIMEOUT, absolute_url, browser_client, cell_text, encode_query, get_text};
use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::{debug, warn};

/// Searches MoneyControl by fund name and reads the portfolio tab of the
/// first matching scheme.
pub struct MoneyControlSource {
    base_url: String,
}

impl MoneyControlSource {
    pub fn new(base_url: &str) -> Self {
        MoneyControlSource {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn fetch_holdings(&self, fund_name: &str) -> Result<Vec<RawHolding>, SourceError> {
        let search_url = format!(
            "{}/mutual-funds/nav/search?query={}",
            self.base_url,
            encode_query(fund_name)
        );
        let client = browser_client(&search_url, PAGE_TIMEOUT)?;

        let search_page = get_text(&client, &search_url).await?;
        let href = first_fund_link(&search_page).ok_or_else(|| SourceError::NoMatch {
            query: fund_name.to_string(),
        })?;

        let fund_url = absolute_url(&self.base_url, &href.replace("#nav", ""))?;
        let portfolio_url = format!("{}/portfolio", fund_url.trim_end_matches('/'));
        debug!("Fetching portfolio from {}", portfolio_url);

        let portfolio_page = get_text(&client, &portfolio_url).await?;
        Ok(parse_portfolio(&portfolio_page))
    }
}

fn first_fund_link(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let link_sel = Selector::parse("a[href]").unwrap();
    document
        .select(&link_sel)
        .filter_map(|a| a.value().attr("href"))
        .find(|href| href.contains("/mutual-funds/"))
        .map(str::to_string)
}

/// Rows of every `table.mctable1`; the first row of each table is its header.
fn parse_portfolio(html: &str) -> Vec<RawHolding> {
    let document = Html::parse_document(html);
    let table_sel = Selector::parse("table.mctable1").unwrap();
    let tr_sel = Selector::parse("tr").unwrap();
    let td_sel = Selector::parse("td").unwrap();

    let mut rows = Vec::new();
    for table in document.select(&table_sel) {
        for tr in table.select(&tr_sel).skip(1) {
            let cells: Vec<_> = tr.select(&td_sel).collect();
            if cells.len() < 3 {
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
impl HoldingsSource for MoneyControlSource {
    async fn fetch(&self, fund_name: &str) -> Option<Vec<RawHolding>> {
        match self.fetch_holdings(fund_name).await {
            Ok(rows) if !rows.is_empty() => Some(rows),
            Ok(_) => {
                debug!(fund = fund_name, "MoneyControl page had no holdings rows");
                None
            }
            Err(e) => {
                warn!(fund = fund_name, error = %e, "MoneyControl fetch failed");
                None
            }
        }
    }

    fn name(&self) -> &str {
        "MoneyControl"
    }
}
