//! Holdings source abstraction and the priority chain that drives it.

use super::holding::RawHolding;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

/// A remote source able to list a fund's holdings by fund name.
///
/// `fetch` never fails: network, markup and parse errors are logged inside
/// the implementation and reported as `None`, the same as a fund with no
/// listed holdings.
#[async_trait]
pub trait HoldingsSource: Send + Sync {
    async fn fetch(&self, fund_name: &str) -> Option<Vec<RawHolding>>;

    fn name(&self) -> &str;
}

/// Rows returned by the first source that produced any.
#[derive(Debug, Clone)]
pub struct SourceHit {
    pub source: String,
    pub rows: Vec<RawHolding>,
}

/// Sources tried in a fixed order with a pause before each fallback attempt.
pub struct SourceChain {
    sources: Vec<Box<dyn HoldingsSource>>,
    delay: Duration,
}

impl SourceChain {
    pub fn new(sources: Vec<Box<dyn HoldingsSource>>, delay: Duration) -> Self {
        Self { sources, delay }
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    pub async fn fetch(&self, fund_name: &str) -> Option<SourceHit> {
        for (i, source) in self.sources.iter().enumerate() {
            if i > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            info!(source = source.name(), fund = fund_name, "Trying source");
            match source.fetch(fund_name).await {
                Some(rows) if !rows.is_empty() => {
                    debug!(source = source.name(), rows = rows.len(), "Source hit");
                    return Some(SourceHit {
                        source: source.name().to_string(),
                        rows,
                    });
                }
                _ => debug!(source = source.name(), "No holdings from source"),
            }
        }
        None
    }
}
