//! Store abstractions: the holdings collection and the read-only fund catalog.

use super::error::StoreError;
use super::holding::{FundKey, HoldingRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which records a delete applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoldingFilter {
    /// Every snapshot of one fund.
    Fund(FundKey),
    /// One snapshot of one fund.
    FundAndDate(FundKey, DateTime<Utc>),
}

impl HoldingFilter {
    pub fn matches(&self, record: &HoldingRecord) -> bool {
        match self {
            HoldingFilter::Fund(key) => key.matches(record),
            HoldingFilter::FundAndDate(key, date) => {
                key.matches(record) && record.report_date == *date
            }
        }
    }
}

/// A stored record together with the id used to update it in place.
#[derive(Debug, Clone)]
pub struct StoredHolding {
    pub id: Vec<u8>,
    pub record: HoldingRecord,
}

/// Names of the collection indexes maintained by every store.
pub const HOLDINGS_INDEXES: &[&str] = &[
    "schemeCode",
    "fundName",
    "reportDate",
    "schemeCode_reportDate",
];

/// The `fund_holdings` collection.
///
/// Delete and insert are separate calls with no transaction spanning them.
#[async_trait]
pub trait HoldingsStore: Send + Sync {
    /// Creates the collection indexes if missing. Safe to repeat.
    async fn ensure_indexes(&self) -> Result<Vec<String>, StoreError>;

    async fn delete_holdings(&self, filter: &HoldingFilter) -> Result<usize, StoreError>;

    async fn insert_holdings(&self, records: &[HoldingRecord]) -> Result<usize, StoreError>;

    async fn find_holdings(&self, fund: &FundKey) -> Result<Vec<HoldingRecord>, StoreError>;

    async fn all_holdings(&self) -> Result<Vec<HoldingRecord>, StoreError>;

    /// Records whose sector has never been assigned.
    async fn unclassified(&self) -> Result<Vec<StoredHolding>, StoreError>;

    /// Backfills sectors for the given record ids.
    async fn set_sectors(&self, updates: &[(Vec<u8>, String)]) -> Result<(), StoreError>;

    /// Distinct report dates present, oldest first.
    async fn report_dates(&self) -> Result<Vec<DateTime<Utc>>, StoreError>;

    async fn count(&self) -> Result<usize, StoreError>;
}

/// An entry of the externally maintained fund catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundEntry {
    pub scheme_code: Option<String>,
    #[serde(default)]
    pub scheme_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl FundEntry {
    pub fn display_name(&self) -> &str {
        self.scheme_name
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or("Unknown")
    }

    fn name_starts_with(&self, token: &str) -> bool {
        let token = token.to_lowercase();
        [self.scheme_name.as_deref(), self.name.as_deref()]
            .into_iter()
            .flatten()
            .any(|n| n.to_lowercase().starts_with(&token))
    }
}

/// Read-only view of the fund catalog.
#[async_trait]
pub trait FundCatalog: Send + Sync {
    async fn funds(&self) -> Result<Vec<FundEntry>, StoreError>;

    /// First catalog entry whose scheme name or name starts with the first
    /// word of `fund_name`, ignoring case.
    async fn resolve_scheme_code(&self, fund_name: &str) -> Result<Option<String>, StoreError> {
        let Some(token) = fund_name.split_whitespace().next() else {
            return Ok(None);
        };
        Ok(self
            .funds()
            .await?
            .into_iter()
            .find(|f| f.scheme_code.is_some() && f.name_starts_with(token))
            .and_then(|f| f.scheme_code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fund_entry_display_name() {
        let entry = FundEntry {
            scheme_code: Some("1".to_string()),
            scheme_name: None,
            name: Some("Axis Midcap".to_string()),
        };
        assert_eq!(entry.display_name(), "Axis Midcap");
        assert!(entry.name_starts_with("AXIS"));
        assert!(!entry.name_starts_with("Midcap"));

        let entry = FundEntry {
            scheme_code: None,
            scheme_name: None,
            name: None,
        };
        assert_eq!(entry.display_name(), "Unknown");
        assert!(!entry.name_starts_with("Axis"));
    }

    #[test]
    fn test_fund_entry_catalog_field_names() {
        let entry: FundEntry =
            serde_json::from_str(r#"{"schemeCode": "119551", "schemeName": "Aditya Birla"}"#)
                .unwrap();
        assert_eq!(entry.scheme_code.as_deref(), Some("119551"));
        assert_eq!(entry.display_name(), "Aditya Birla");
        assert!(entry.name.is_none());
    }
}
