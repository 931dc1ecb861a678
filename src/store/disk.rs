use crate::core::error::StoreError;
use crate::core::holding::{FundKey, HoldingRecord};
use crate::core::store::{
    FundCatalog, FundEntry, HOLDINGS_INDEXES, HoldingFilter, HoldingsStore, StoredHolding,
};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard};
use tracing::{debug, error, info};

const HOLDINGS: &str = "fund_holdings";
const FUNDS: &str = "funds";
const META: &str = "meta";
const BY_FUND_NAME: &str = "idx_fund_name";
const BY_REPORT_DATE: &str = "idx_report_date";

const SEQ_KEY: &[u8] = b"holdings_seq";
const SEP: u8 = 0;

// Primary keys are laid out as `fund \0 report_date \0 seq`, so lookups by
// scheme code and by scheme code + date are prefix scans on the collection
// itself. Fund name and report date get their own index partitions.

fn fund_prefix(key: &FundKey) -> Vec<u8> {
    let mut prefix = match key {
        FundKey::Code(code) => format!("c:{code}").into_bytes(),
        FundKey::Name(name) => format!("n:{name}").into_bytes(),
    };
    prefix.push(SEP);
    prefix
}

fn date_part(date: &DateTime<Utc>) -> String {
    format!("{:020}", date.timestamp_millis())
}

fn snapshot_prefix(key: &FundKey, date: &DateTime<Utc>) -> Vec<u8> {
    let mut prefix = fund_prefix(key);
    prefix.extend_from_slice(date_part(date).as_bytes());
    prefix.push(SEP);
    prefix
}

fn primary_key(record: &HoldingRecord, seq: u64) -> Vec<u8> {
    let mut key = snapshot_prefix(&record.fund_key(), &record.report_date);
    key.extend_from_slice(format!("{seq:020}").as_bytes());
    key
}

fn index_key(prefix: &str, primary: &[u8]) -> Vec<u8> {
    let mut key = prefix.as_bytes().to_vec();
    key.push(SEP);
    key.extend_from_slice(primary);
    key
}

fn name_index_key(record: &HoldingRecord, primary: &[u8]) -> Vec<u8> {
    index_key(&record.fund_name.to_lowercase(), primary)
}

fn date_index_key(record: &HoldingRecord, primary: &[u8]) -> Vec<u8> {
    index_key(&date_part(&record.report_date), primary)
}

/// Strips the index prefix, returning the primary key it points at.
fn primary_from_index(key: &[u8]) -> Option<&[u8]> {
    key.iter().position(|b| *b == SEP).map(|i| &key[i + 1..])
}

#[derive(Clone)]
struct Indexes {
    by_fund_name: PartitionHandle,
    by_report_date: PartitionHandle,
}

/// Holdings and fund catalog persisted in a fjall keyspace.
///
/// The handle is opened once per command and flushed to disk when dropped.
pub struct FjallStore {
    keyspace: Keyspace,
    holdings: PartitionHandle,
    funds: PartitionHandle,
    meta: PartitionHandle,
    indexes: RwLock<Option<Indexes>>,
}

impl FjallStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(path).map_err(|e| StoreError::Open {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let keyspace = Config::new(path).open()?;
        let holdings = keyspace.open_partition(HOLDINGS, PartitionCreateOptions::default())?;
        let funds = keyspace.open_partition(FUNDS, PartitionCreateOptions::default())?;
        let meta = keyspace.open_partition(META, PartitionCreateOptions::default())?;

        let indexes = if keyspace.partition_exists(BY_FUND_NAME)
            && keyspace.partition_exists(BY_REPORT_DATE)
        {
            Some(Self::open_indexes(&keyspace)?)
        } else {
            None
        };
        debug!(path = %path.display(), indexed = indexes.is_some(), "Opened store");

        Ok(Self {
            keyspace,
            holdings,
            funds,
            meta,
            indexes: RwLock::new(indexes),
        })
    }

    fn open_indexes(keyspace: &Keyspace) -> Result<Indexes, StoreError> {
        Ok(Indexes {
            by_fund_name: keyspace
                .open_partition(BY_FUND_NAME, PartitionCreateOptions::default())?,
            by_report_date: keyspace
                .open_partition(BY_REPORT_DATE, PartitionCreateOptions::default())?,
        })
    }

    fn indexes(&self) -> RwLockReadGuard<'_, Option<Indexes>> {
        self.indexes.read().unwrap_or_else(|e| e.into_inner())
    }

    fn decode(value: &[u8]) -> Result<HoldingRecord, StoreError> {
        Ok(serde_json::from_slice(value)?)
    }

    fn scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, HoldingRecord)>, StoreError> {
        self.holdings
            .prefix(prefix)
            .map(|kv| {
                let (key, value) = kv?;
                Ok((key.to_vec(), Self::decode(&value)?))
            })
            .collect()
    }

    /// Reserves `n` consecutive sequence numbers for new primary keys.
    fn reserve_seq(&self, n: u64) -> Result<u64, StoreError> {
        let current = match self.meta.get(SEQ_KEY)? {
            Some(bytes) => bytes
                .as_ref()
                .try_into()
                .map(u64::from_be_bytes)
                .unwrap_or_default(),
            None => 0,
        };
        self.meta
            .insert(SEQ_KEY, (current + n).to_be_bytes().to_vec())?;
        Ok(current)
    }

    /// Writes catalog entries, replacing entries with the same scheme code.
    pub fn load_funds(&self, funds: &[FundEntry]) -> Result<usize, StoreError> {
        let mut batch = self.keyspace.batch();
        for fund in funds {
            let key = fund
                .scheme_code
                .clone()
                .unwrap_or_else(|| format!("~{}", fund.display_name()));
            batch.insert(&self.funds, key, serde_json::to_vec(fund)?);
        }
        batch.commit()?;
        Ok(funds.len())
    }

    pub fn persist(&self) -> Result<(), StoreError> {
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(())
    }
}

impl Drop for FjallStore {
    fn drop(&mut self) {
        if let Err(e) = self.persist() {
            error!(error = %e, "Failed to flush store on close");
        }
    }
}

#[async_trait]
impl HoldingsStore for FjallStore {
    async fn ensure_indexes(&self) -> Result<Vec<String>, StoreError> {
        let mut guard = self.indexes.write().unwrap_or_else(|e| e.into_inner());
        if guard.is_none() {
            let indexes = Self::open_indexes(&self.keyspace)?;
            let mut batch = self.keyspace.batch();
            let mut backfilled = 0;
            for (key, record) in self.scan(&[])? {
                batch.insert(&indexes.by_fund_name, name_index_key(&record, &key), []);
                batch.insert(&indexes.by_report_date, date_index_key(&record, &key), []);
                backfilled += 1;
            }
            batch.commit()?;
            info!(backfilled, "Created holdings indexes");
            *guard = Some(indexes);
        }
        Ok(HOLDINGS_INDEXES.iter().map(|s| s.to_string()).collect())
    }

    async fn delete_holdings(&self, filter: &HoldingFilter) -> Result<usize, StoreError> {
        let prefix = match filter {
            HoldingFilter::Fund(key) => fund_prefix(key),
            HoldingFilter::FundAndDate(key, date) => snapshot_prefix(key, date),
        };
        let doomed = self.scan(&prefix)?;

        let indexes = self.indexes();
        let mut batch = self.keyspace.batch();
        for (key, record) in &doomed {
            if let Some(idx) = indexes.as_ref() {
                batch.remove(&idx.by_fund_name, name_index_key(record, key));
                batch.remove(&idx.by_report_date, date_index_key(record, key));
            }
            batch.remove(&self.holdings, key.clone());
        }
        batch.commit()?;
        debug!(deleted = doomed.len(), ?filter, "Store DELETE");
        Ok(doomed.len())
    }

    async fn insert_holdings(&self, records: &[HoldingRecord]) -> Result<usize, StoreError> {
        if records.is_empty() {
            return Ok(0);
        }
        let first_seq = self.reserve_seq(records.len() as u64)?;

        let indexes = self.indexes();
        let mut batch = self.keyspace.batch();
        for (seq, record) in (first_seq..).zip(records) {
            let key = primary_key(record, seq);
            if let Some(idx) = indexes.as_ref() {
                batch.insert(&idx.by_fund_name, name_index_key(record, &key), []);
                batch.insert(&idx.by_report_date, date_index_key(record, &key), []);
            }
            batch.insert(&self.holdings, key, serde_json::to_vec(record)?);
        }
        batch.commit()?;
        debug!(inserted = records.len(), "Store INSERT");
        Ok(records.len())
    }

    async fn find_holdings(&self, fund: &FundKey) -> Result<Vec<HoldingRecord>, StoreError> {
        if let FundKey::Name(name) = fund
            && let Some(idx) = self.indexes().as_ref()
        {
            let mut prefix = name.to_lowercase().into_bytes();
            prefix.push(SEP);
            let mut records = Vec::new();
            for kv in idx.by_fund_name.prefix(&prefix) {
                let (key, _) = kv?;
                let Some(primary) = primary_from_index(&key[prefix.len() - 1..]) else {
                    continue;
                };
                if let Some(value) = self.holdings.get(primary)? {
                    let record = Self::decode(&value)?;
                    if fund.matches(&record) {
                        records.push(record);
                    }
                }
            }
            return Ok(records);
        }
        Ok(self
            .scan(&fund_prefix(fund))?
            .into_iter()
            .map(|(_, record)| record)
            .collect())
    }

    async fn all_holdings(&self) -> Result<Vec<HoldingRecord>, StoreError> {
        Ok(self.scan(&[])?.into_iter().map(|(_, r)| r).collect())
    }

    async fn unclassified(&self) -> Result<Vec<StoredHolding>, StoreError> {
        Ok(self
            .scan(&[])?
            .into_iter()
            .filter(|(_, record)| record.sector.is_none())
            .map(|(id, record)| StoredHolding { id, record })
            .collect())
    }

    async fn set_sectors(&self, updates: &[(Vec<u8>, String)]) -> Result<(), StoreError> {
        let mut batch = self.keyspace.batch();
        for (id, sector) in updates {
            let Some(value) = self.holdings.get(id)? else {
                continue;
            };
            let mut record = Self::decode(&value)?;
            record.sector = Some(sector.clone());
            batch.insert(&self.holdings, id.clone(), serde_json::to_vec(&record)?);
        }
        batch.commit()?;
        Ok(())
    }

    async fn report_dates(&self) -> Result<Vec<DateTime<Utc>>, StoreError> {
        let Some(idx) = self.indexes().clone() else {
            let dates: BTreeSet<_> = self
                .all_holdings()
                .await?
                .into_iter()
                .map(|r| r.report_date)
                .collect();
            return Ok(dates.into_iter().collect());
        };

        let mut millis = BTreeSet::new();
        for kv in idx.by_report_date.iter() {
            let (key, _) = kv?;
            let end = key.iter().position(|b| *b == SEP).unwrap_or(key.len());
            if let Some(ms) = std::str::from_utf8(&key[..end])
                .ok()
                .and_then(|s| s.parse::<i64>().ok())
            {
                millis.insert(ms);
            }
        }
        Ok(millis
            .into_iter()
            .filter_map(|ms| Utc.timestamp_millis_opt(ms).single())
            .collect())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.holdings.len()?)
    }
}

#[async_trait]
impl FundCatalog for FjallStore {
    async fn funds(&self) -> Result<Vec<FundEntry>, StoreError> {
        self.funds
            .iter()
            .map(|kv| {
                let (_, value) = kv?;
                Ok(serde_json::from_slice(&value)?)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::holding::HoldingSource;
    use tempfile::tempdir;

    fn record(code: Option<&str>, fund: &str, security: &str, date: DateTime<Utc>) -> HoldingRecord {
        HoldingRecord {
            scheme_code: code.map(str::to_string),
            fund_name: fund.to_string(),
            security: security.to_string(),
            weight: Some(2.5),
            market_value: Some(1000.0),
            sector: None,
            report_date: date,
            source: HoldingSource::AmfiPdf,
            imported_at: Utc::now(),
        }
    }

    fn october() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap()
    }

    fn september() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 9, 1, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_find_by_code() {
        let dir = tempdir().unwrap();
        let store = FjallStore::open(dir.path()).unwrap();
        store.ensure_indexes().await.unwrap();

        store
            .insert_holdings(&[
                record(Some("1"), "Fund A", "Infosys Ltd", october()),
                record(Some("1"), "Fund A", "Wipro Ltd", october()),
                record(Some("10"), "Fund B", "Cipla Ltd", october()),
            ])
            .await
            .unwrap();

        let found = store
            .find_holdings(&FundKey::Code("1".to_string()))
            .await
            .unwrap();
        let names: Vec<_> = found.iter().map(|r| r.security.as_str()).collect();
        assert_eq!(names, vec!["Infosys Ltd", "Wipro Ltd"]);
        assert_eq!(store.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_delete_snapshot_leaves_other_dates_and_funds() {
        let dir = tempdir().unwrap();
        let store = FjallStore::open(dir.path()).unwrap();
        store.ensure_indexes().await.unwrap();

        store
            .insert_holdings(&[
                record(Some("1"), "Fund A", "Infosys Ltd", september()),
                record(Some("1"), "Fund A", "Infosys Ltd", october()),
                record(Some("2"), "Fund B", "Cipla Ltd", october()),
            ])
            .await
            .unwrap();

        let deleted = store
            .delete_holdings(&HoldingFilter::FundAndDate(
                FundKey::Code("1".to_string()),
                october(),
            ))
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.count().await.unwrap(), 2);
        assert_eq!(
            store.report_dates().await.unwrap(),
            vec![september(), october()]
        );

        let deleted = store
            .delete_holdings(&HoldingFilter::Fund(FundKey::Code("1".to_string())))
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.report_dates().await.unwrap(), vec![october()]);
    }

    #[tokio::test]
    async fn test_find_by_name_uses_index() {
        let dir = tempdir().unwrap();
        let store = FjallStore::open(dir.path()).unwrap();
        store.ensure_indexes().await.unwrap();

        store
            .insert_holdings(&[
                record(None, "Mystery Fund", "Infosys Ltd", october()),
                record(Some("5"), "Mystery Fund", "Wipro Ltd", october()),
                record(None, "Mystery Fund Two", "Cipla Ltd", october()),
            ])
            .await
            .unwrap();

        let found = store
            .find_holdings(&FundKey::Name("Mystery Fund".to_string()))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].security, "Infosys Ltd");
    }

    #[tokio::test]
    async fn test_ensure_indexes_is_idempotent_and_backfills() {
        let dir = tempdir().unwrap();
        {
            let store = FjallStore::open(dir.path()).unwrap();
            store
                .insert_holdings(&[record(None, "Late Fund", "Infosys Ltd", october())])
                .await
                .unwrap();
            let first = store.ensure_indexes().await.unwrap();
            let second = store.ensure_indexes().await.unwrap();
            assert_eq!(first, second);
            assert_eq!(first.len(), 4);
        }

        let store = FjallStore::open(dir.path()).unwrap();
        let found = store
            .find_holdings(&FundKey::Name("Late Fund".to_string()))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(store.report_dates().await.unwrap(), vec![october()]);
    }

    #[tokio::test]
    async fn test_sector_backfill_updates_in_place() {
        let dir = tempdir().unwrap();
        let store = FjallStore::open(dir.path()).unwrap();
        store
            .insert_holdings(&[
                record(Some("1"), "Fund A", "Infosys Ltd", october()),
                record(Some("1"), "Fund A", "Wipro Ltd", october()),
            ])
            .await
            .unwrap();

        let pending = store.unclassified().await.unwrap();
        assert_eq!(pending.len(), 2);
        let updates: Vec<_> = pending
            .iter()
            .map(|h| (h.id.clone(), "IT".to_string()))
            .collect();
        store.set_sectors(&updates).await.unwrap();

        assert!(store.unclassified().await.unwrap().is_empty());
        assert_eq!(store.count().await.unwrap(), 2);
        let all = store.all_holdings().await.unwrap();
        assert!(all.iter().all(|r| r.sector.as_deref() == Some("IT")));
    }

    #[tokio::test]
    async fn test_catalog_round_trip() {
        let dir = tempdir().unwrap();
        let store = FjallStore::open(dir.path()).unwrap();
        store
            .load_funds(&[
                FundEntry {
                    scheme_code: Some("120503".to_string()),
                    scheme_name: Some("Axis Bluechip Fund".to_string()),
                    name: None,
                },
                FundEntry {
                    scheme_code: None,
                    scheme_name: None,
                    name: Some("Unlisted Fund".to_string()),
                },
            ])
            .unwrap();

        assert_eq!(store.funds().await.unwrap().len(), 2);
        assert_eq!(
            store.resolve_scheme_code("AXIS Bluechip Sep 2026").await.unwrap(),
            Some("120503".to_string())
        );
        assert_eq!(store.resolve_scheme_code("Unlisted").await.unwrap(), None);
    }
}
