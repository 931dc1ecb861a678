//! Builds holding records and replaces a fund's snapshot in the store.

use super::error::StoreError;
use super::holding::{FundKey, HoldingRecord, NormalizedHolding, Snapshot};
use super::store::{FundCatalog, HoldingFilter, HoldingsStore};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

pub struct HoldingsImporter<'a> {
    store: &'a dyn HoldingsStore,
    catalog: &'a dyn FundCatalog,
}

impl<'a> HoldingsImporter<'a> {
    pub fn new(store: &'a dyn HoldingsStore, catalog: &'a dyn FundCatalog) -> Self {
        Self { store, catalog }
    }

    /// Replaces the fund's holdings for the snapshot and returns how many
    /// records were written. An empty `holdings` slice writes nothing.
    pub async fn import_holdings(
        &self,
        scheme_code: Option<&str>,
        fund_name: &str,
        holdings: &[NormalizedHolding],
        snapshot: Snapshot,
    ) -> Result<usize, StoreError> {
        self.import_holdings_at(scheme_code, fund_name, holdings, snapshot, Utc::now())
            .await
    }

    pub async fn import_holdings_at(
        &self,
        scheme_code: Option<&str>,
        fund_name: &str,
        holdings: &[NormalizedHolding],
        snapshot: Snapshot,
        now: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        if holdings.is_empty() {
            debug!(fund = fund_name, "No holdings to import");
            return Ok(0);
        }

        let scheme_code = match scheme_code {
            Some(code) => Some(code.to_string()),
            None => self.catalog.resolve_scheme_code(fund_name).await?,
        };
        debug!(fund = fund_name, ?scheme_code, "Resolved fund identifier");

        let report_date = snapshot.report_date(now);
        let key = FundKey::new(scheme_code.as_deref(), fund_name);
        let filter = match snapshot {
            Snapshot::MonthStart => HoldingFilter::FundAndDate(key, report_date),
            Snapshot::Now => HoldingFilter::Fund(key),
        };

        let records = build_records(scheme_code, fund_name, holdings, snapshot, report_date, now);

        let deleted = self.store.delete_holdings(&filter).await?;
        let written = self.store.insert_holdings(&records).await?;
        info!(
            fund = fund_name,
            deleted,
            written,
            source = %snapshot.source(),
            "Replaced fund holdings"
        );
        Ok(written)
    }
}

pub fn build_records(
    scheme_code: Option<String>,
    fund_name: &str,
    holdings: &[NormalizedHolding],
    snapshot: Snapshot,
    report_date: DateTime<Utc>,
    imported_at: DateTime<Utc>,
) -> Vec<HoldingRecord> {
    holdings
        .iter()
        .map(|h| HoldingRecord {
            scheme_code: scheme_code.clone(),
            fund_name: fund_name.to_string(),
            security: h.security.clone(),
            weight: h.weight,
            market_value: h.market_value,
            sector: h.sector.clone(),
            report_date,
            source: snapshot.source(),
            imported_at,
        })
        .collect()
}
