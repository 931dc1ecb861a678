//! Holding records and the shapes they pass through on the way to the store.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// One extracted `(security, weight)` pair, exactly as the source rendered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawHolding {
    pub security: String,
    pub weight_text: String,
}

impl RawHolding {
    pub fn new(security: impl Into<String>, weight_text: impl Into<String>) -> Self {
        Self {
            security: security.into(),
            weight_text: weight_text.into(),
        }
    }
}

/// A holding after field coercion. Also the on-disk shape of parsed documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedHolding {
    pub security: String,
    pub weight: Option<f64>,
    #[serde(default)]
    pub market_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HoldingSource {
    #[serde(rename = "AMFI_PDF")]
    AmfiPdf,
    #[serde(rename = "AUTO_SCRAPE")]
    AutoScrape,
}

impl Display for HoldingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                HoldingSource::AmfiPdf => "AMFI_PDF",
                HoldingSource::AutoScrape => "AUTO_SCRAPE",
            }
        )
    }
}

/// Which logical snapshot an import belongs to, and therefore what it replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Snapshot {
    /// Disclosure documents: every run within a month lands on the same date.
    MonthStart,
    /// Scraped pages: stamped with the fetch time, replaces every earlier date.
    Now,
}

impl Snapshot {
    pub fn source(&self) -> HoldingSource {
        match self {
            Snapshot::MonthStart => HoldingSource::AmfiPdf,
            Snapshot::Now => HoldingSource::AutoScrape,
        }
    }

    pub fn report_date(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Snapshot::MonthStart => first_of_month(now),
            Snapshot::Now => now,
        }
    }
}

pub fn first_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
    let date = NaiveDate::from_ymd_opt(now.year(), now.month(), 1).unwrap_or(now.date_naive());
    Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
}

/// One security's weight within one fund as of one reporting date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingRecord {
    pub scheme_code: Option<String>,
    pub fund_name: String,
    pub security: String,
    pub weight: Option<f64>,
    pub market_value: Option<f64>,
    pub sector: Option<String>,
    pub report_date: DateTime<Utc>,
    pub source: HoldingSource,
    pub imported_at: DateTime<Utc>,
}

/// Identifies the fund a record belongs to: by scheme code when known,
/// otherwise by its display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FundKey {
    Code(String),
    Name(String),
}

impl FundKey {
    pub fn new(scheme_code: Option<&str>, fund_name: &str) -> Self {
        match scheme_code {
            Some(code) => FundKey::Code(code.to_string()),
            None => FundKey::Name(fund_name.to_string()),
        }
    }

    pub fn matches(&self, record: &HoldingRecord) -> bool {
        match self {
            FundKey::Code(code) => record.scheme_code.as_deref() == Some(code.as_str()),
            FundKey::Name(name) => record.scheme_code.is_none() && record.fund_name == *name,
        }
    }
}

impl HoldingRecord {
    pub fn fund_key(&self) -> FundKey {
        FundKey::new(self.scheme_code.as_deref(), &self.fund_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_first_of_month_drops_time_of_day() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 15, 42, 7).unwrap();
        let date = Snapshot::MonthStart.report_date(now);
        assert_eq!(date.day(), 1);
        assert_eq!(date.month(), 10);
        assert_eq!(date.hour(), 0);
        assert_eq!(date.minute(), 0);

        let later = Utc.with_ymd_and_hms(2026, 10, 28, 1, 0, 0).unwrap();
        assert_eq!(Snapshot::MonthStart.report_date(later), date);
    }

    #[test]
    fn test_now_snapshot_keeps_timestamp() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 15, 42, 7).unwrap();
        assert_eq!(Snapshot::Now.report_date(now), now);
        assert_eq!(Snapshot::Now.source(), HoldingSource::AutoScrape);
        assert_eq!(Snapshot::MonthStart.source(), HoldingSource::AmfiPdf);
    }

    #[test]
    fn test_record_serializes_with_store_field_names() {
        let now = Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap();
        let record = HoldingRecord {
            scheme_code: Some("120503".to_string()),
            fund_name: "Axis Bluechip Fund".to_string(),
            security: "Infosys Ltd".to_string(),
            weight: Some(7.25),
            market_value: None,
            sector: None,
            report_date: now,
            source: HoldingSource::AmfiPdf,
            imported_at: now,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["schemeCode"], "120503");
        assert_eq!(json["source"], "AMFI_PDF");
        assert!(json["marketValue"].is_null());
    }

    #[test]
    fn test_fund_key_matching() {
        let now = Utc::now();
        let mut record = HoldingRecord {
            scheme_code: None,
            fund_name: "Quant Small Cap".to_string(),
            security: "ITC Ltd".to_string(),
            weight: Some(3.0),
            market_value: None,
            sector: None,
            report_date: now,
            source: HoldingSource::AmfiPdf,
            imported_at: now,
        };
        assert!(FundKey::Name("Quant Small Cap".to_string()).matches(&record));
        assert!(!FundKey::Code("1".to_string()).matches(&record));

        record.scheme_code = Some("1".to_string());
        assert!(FundKey::Code("1".to_string()).matches(&record));
        assert!(!FundKey::Name("Quant Small Cap".to_string()).matches(&record));
    }
}
