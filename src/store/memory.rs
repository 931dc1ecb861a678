use crate::core::error::StoreError;
use crate::core::holding::{FundKey, HoldingRecord};
use crate::core::store::{
    FundCatalog, FundEntry, HOLDINGS_INDEXES, HoldingFilter, HoldingsStore, StoredHolding,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

#[derive(Default)]
struct Collections {
    next_id: u64,
    holdings: BTreeMap<u64, HoldingRecord>,
    funds: Vec<FundEntry>,
}

/// In-memory store, used where a disk keyspace is unnecessary.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Collections> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn load_funds(&self, funds: &[FundEntry]) -> usize {
        let mut inner = self.lock();
        inner.funds.extend_from_slice(funds);
        funds.len()
    }
}

fn decode_id(id: &[u8]) -> Option<u64> {
    id.try_into().ok().map(u64::from_be_bytes)
}

#[async_trait]
impl HoldingsStore for MemoryStore {
    async fn ensure_indexes(&self) -> Result<Vec<String>, StoreError> {
        Ok(HOLDINGS_INDEXES.iter().map(|s| s.to_string()).collect())
    }

    async fn delete_holdings(&self, filter: &HoldingFilter) -> Result<usize, StoreError> {
        let mut inner = self.lock();
        let before = inner.holdings.len();
        inner.holdings.retain(|_, record| !filter.matches(record));
        let deleted = before - inner.holdings.len();
        debug!(deleted, "Memory DELETE");
        Ok(deleted)
    }

    async fn insert_holdings(&self, records: &[HoldingRecord]) -> Result<usize, StoreError> {
        let mut inner = self.lock();
        for record in records {
            let id = inner.next_id;
            inner.next_id += 1;
            inner.holdings.insert(id, record.clone());
        }
        Ok(records.len())
    }

    async fn find_holdings(&self, fund: &FundKey) -> Result<Vec<HoldingRecord>, StoreError> {
        Ok(self
            .lock()
            .holdings
            .values()
            .filter(|r| fund.matches(r))
            .cloned()
            .collect())
    }

    async fn all_holdings(&self) -> Result<Vec<HoldingRecord>, StoreError> {
        Ok(self.lock().holdings.values().cloned().collect())
    }

    async fn unclassified(&self) -> Result<Vec<StoredHolding>, StoreError> {
        Ok(self
            .lock()
            .holdings
            .iter()
            .filter(|(_, r)| r.sector.is_none())
            .map(|(id, r)| StoredHolding {
                id: id.to_be_bytes().to_vec(),
                record: r.clone(),
            })
            .collect())
    }

    async fn set_sectors(&self, updates: &[(Vec<u8>, String)]) -> Result<(), StoreError> {
        let mut inner = self.lock();
        for (id, sector) in updates {
            if let Some(record) = decode_id(id).and_then(|id| inner.holdings.get_mut(&id)) {
                record.sector = Some(sector.clone());
            }
        }
        Ok(())
    }

    async fn report_dates(&self) -> Result<Vec<DateTime<Utc>>, StoreError> {
        let dates: BTreeSet<_> = self.lock().holdings.values().map(|r| r.report_date).collect();
        Ok(dates.into_iter().collect())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.lock().holdings.len())
    }
}

#[async_trait]
impl FundCatalog for MemoryStore {
    async fn funds(&self) -> Result<Vec<FundEntry>, StoreError> {
        Ok(self.lock().funds.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::holding::HoldingSource;

    fn record(code: &str, security: &str) -> HoldingRecord {
        let now = Utc::now();
        HoldingRecord {
            scheme_code: Some(code.to_string()),
            fund_name: format!("Fund {code}"),
            security: security.to_string(),
            weight: Some(1.0),
            market_value: None,
            sector: None,
            report_date: now,
            source: HoldingSource::AmfiPdf,
            imported_at: now,
        }
    }

    #[tokio::test]
    async fn test_memory_store_delete_is_scoped_to_fund() {
        let store = MemoryStore::new();
        store
            .insert_holdings(&[record("1", "Infosys"), record("2", "Wipro")])
            .await
            .unwrap();

        let deleted = store
            .delete_holdings(&HoldingFilter::Fund(FundKey::Code("1".to_string())))
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_memory_store_sector_backfill() {
        let store = MemoryStore::new();
        store
            .insert_holdings(&[record("1", "Infosys"), record("1", "Wipro")])
            .await
            .unwrap();

        let pending = store.unclassified().await.unwrap();
        assert_eq!(pending.len(), 2);
        store
            .set_sectors(&[(pending[0].id.clone(), "IT".to_string())])
            .await
            .unwrap();
        assert_eq!(store.unclassified().await.unwrap().len(), 1);
    }
}
