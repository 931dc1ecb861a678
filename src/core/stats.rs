//! Aggregates over stored holdings for the status and classify reports.

use super::holding::{FundKey, HoldingRecord};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct FundCount {
    pub fund_name: String,
    pub scheme_code: Option<String>,
    pub holdings: usize,
    pub latest_report: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectorCount {
    pub sector: String,
    pub holdings: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreStats {
    pub total: usize,
    pub funds: usize,
    pub top_funds: Vec<FundCount>,
    pub classified: usize,
    pub top_sectors: Vec<SectorCount>,
    /// Largest positions of the fund with the most holdings, from its latest
    /// report.
    pub sample: Vec<HoldingRecord>,
}

impl StoreStats {
    pub fn coverage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.classified as f64 * 100.0 / self.total as f64
        }
    }
}

/// Records per sector, largest first. Unclassified records are left out.
pub fn sector_distribution(records: &[HoldingRecord]) -> Vec<SectorCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for sector in records.iter().filter_map(|r| r.sector.as_deref()) {
        *counts.entry(sector).or_default() += 1;
    }
    let mut sectors: Vec<_> = counts
        .into_iter()
        .map(|(sector, holdings)| SectorCount {
            sector: sector.to_string(),
            holdings,
        })
        .collect();
    sectors.sort_by(|a, b| b.holdings.cmp(&a.holdings).then(a.sector.cmp(&b.sector)));
    sectors
}

fn by_weight_desc(a: &HoldingRecord, b: &HoldingRecord) -> Ordering {
    match (a.weight, b.weight) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn compute_stats(records: &[HoldingRecord], top_n: usize) -> StoreStats {
    let mut per_fund: HashMap<FundKey, FundCount> = HashMap::new();
    for record in records {
        per_fund
            .entry(record.fund_key())
            .and_modify(|f| {
                f.holdings += 1;
                f.latest_report = f.latest_report.max(record.report_date);
            })
            .or_insert_with(|| FundCount {
                fund_name: record.fund_name.clone(),
                scheme_code: record.scheme_code.clone(),
                holdings: 1,
                latest_report: record.report_date,
            });
    }
    let funds = per_fund.len();
    let mut top_funds: Vec<_> = per_fund.into_values().collect();
    top_funds.sort_by(|a, b| {
        b.holdings
            .cmp(&a.holdings)
            .then_with(|| a.fund_name.cmp(&b.fund_name))
    });
    top_funds.truncate(top_n);

    let sample = top_funds
        .first()
        .map(|fund| {
            let key = FundKey::new(fund.scheme_code.as_deref(), &fund.fund_name);
            let mut holdings: Vec<_> = records
                .iter()
                .filter(|r| key.matches(r) && r.report_date == fund.latest_report)
                .cloned()
                .collect();
            holdings.sort_by(by_weight_desc);
            holdings.truncate(top_n);
            holdings
        })
        .unwrap_or_default();

    let mut top_sectors = sector_distribution(records);
    top_sectors.truncate(top_n);

    StoreStats {
        total: records.len(),
        funds,
        top_funds,
        classified: records.iter().filter(|r| r.sector.is_some()).count(),
        top_sectors,
        sample,
    }
}
