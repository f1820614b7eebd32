use crate::core::{Conversion, Currency, PairCode, Quote, ReferenceStore, UnitOfWork};
use anyhow::{Context, Result};
use fjall::{Batch, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use serde::{Serialize, de::DeserializeOwned};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

const CURRENCIES: &str = "currencies";
const CONVERSIONS: &str = "conversions";
const QUOTES: &str = "quotes";

/// Reference store persisted in a fjall keyspace.
///
/// Currencies are keyed by code, conversions by pair code and quotes by their
/// big-endian id, so partition order is code order and insertion order
/// respectively. Values are JSON.
pub struct DiskStore {
    keyspace: Keyspace,
    currencies: PartitionHandle,
    conversions: PartitionHandle,
    quotes: PartitionHandle,
}

impl DiskStore {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create store directory: {}", path.display()))?;

        let keyspace = fjall::Config::new(path)
            .open()
            .with_context(|| format!("Failed to open store at {}", path.display()))?;
        let currencies = keyspace.open_partition(CURRENCIES, PartitionCreateOptions::default())?;
        let conversions = keyspace.open_partition(CONVERSIONS, PartitionCreateOptions::default())?;
        let quotes = keyspace.open_partition(QUOTES, PartitionCreateOptions::default())?;
        debug!("Opened store at {}", path.display());

        Ok(Self {
            keyspace,
            currencies,
            conversions,
            quotes,
        })
    }

    fn read<T: DeserializeOwned>(partition: &PartitionHandle, key: &str) -> Result<Option<T>> {
        match partition.get(key.as_bytes())? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    fn scan<T: DeserializeOwned>(partition: &PartitionHandle) -> Result<Vec<T>> {
        partition
            .iter()
            .map(|item| -> Result<T> {
                let (_, value) = item?;
                Ok(serde_json::from_slice(&value)?)
            })
            .collect()
    }

    fn last_quote_id(&self) -> Result<u64> {
        match self.quotes.last_key_value()? {
            Some((key, _)) => {
                let bytes: [u8; 8] = key[..]
                    .try_into()
                    .context("Corrupt quote key in store")?;
                Ok(u64::from_be_bytes(bytes))
            }
            None => Ok(0),
        }
    }
}

impl ReferenceStore for DiskStore {
    fn find_currency(&self, code: &str) -> Result<Option<Currency>> {
        Self::read(&self.currencies, code)
    }

    fn find_conversion(&self, pair: &PairCode) -> Result<Option<Conversion>> {
        Self::read(&self.conversions, &pair.to_string())
    }

    fn currencies(&self) -> Result<Vec<Currency>> {
        Self::scan(&self.currencies)
    }

    fn conversions(&self) -> Result<Vec<Conversion>> {
        Self::scan(&self.conversions)
    }

    fn quotes(&self) -> Result<Vec<Quote>> {
        Self::scan(&self.quotes)
    }

    fn begin(&self) -> Result<Box<dyn UnitOfWork + '_>> {
        Ok(Box::new(DiskUnitOfWork {
            store: self,
            batch: self.keyspace.batch(),
            staged: 0,
            pending_currencies: HashSet::new(),
            pending_conversions: HashSet::new(),
            next_quote_id: self.last_quote_id()? + 1,
        }))
    }
}

/// Writes staged in a fjall batch, applied atomically on commit.
struct DiskUnitOfWork<'a> {
    store: &'a DiskStore,
    batch: Batch,
    staged: usize,
    pending_currencies: HashSet<String>,
    pending_conversions: HashSet<String>,
    next_quote_id: u64,
}

impl DiskUnitOfWork<'_> {
    fn stage<T: Serialize>(
        &mut self,
        partition: &PartitionHandle,
        key: Vec<u8>,
        value: &T,
    ) -> Result<()> {
        self.batch.insert(partition, key, serde_json::to_vec(value)?);
        self.staged += 1;
        Ok(())
    }
}

impl UnitOfWork for DiskUnitOfWork<'_> {
    fn insert_currency_if_absent(&mut self, currency: Currency) -> Result<bool> {
        if self.pending_currencies.contains(&currency.code)
            || self.store.currencies.contains_key(currency.code.as_bytes())?
        {
            return Ok(false);
        }
        let partition = self.store.currencies.clone();
        self.stage(&partition, currency.code.as_bytes().to_vec(), &currency)?;
        self.pending_currencies.insert(currency.code);
        Ok(true)
    }

    fn insert_conversion_if_absent(&mut self, conversion: Conversion) -> Result<bool> {
        let key = conversion.pair().to_string();
        if self.pending_conversions.contains(&key)
            || self.store.conversions.contains_key(key.as_bytes())?
        {
            return Ok(false);
        }
        let partition = self.store.conversions.clone();
        self.stage(&partition, key.as_bytes().to_vec(), &conversion)?;
        self.pending_conversions.insert(key);
        Ok(true)
    }

    fn append_quote(&mut self, mut quote: Quote) -> Result<u64> {
        let id = self.next_quote_id;
        quote.id = id;
        let partition = self.store.quotes.clone();
        self.stage(&partition, id.to_be_bytes().to_vec(), &quote)?;
        self.next_quote_id += 1;
        Ok(id)
    }

    fn commit(self: Box<Self>) -> Result<()> {
        let staged = self.staged;
        self.batch.commit().context("Failed to commit store batch")?;
        self.store
            .keyspace
            .persist(PersistMode::SyncAll)
            .context("Failed to persist store")?;
        debug!("Committed {} staged writes", staged);
        Ok(())
    }

    fn rollback(self: Box<Self>) {
        debug!("Discarding {} staged writes", self.staged);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use tempfile::tempdir;

    fn currency(code: &str, name: &str) -> Currency {
        Currency {
            code: code.to_string(),
            name: name.to_string(),
        }
    }

    fn quote(pair: &PairCode, bid: i64) -> Quote {
        Quote {
            id: 0,
            conversion: pair.clone(),
            code: pair.base.clone(),
            codein: pair.destination.clone(),
            name: pair.to_string(),
            high: Decimal::new(bid + 1, 4),
            low: Decimal::new(bid - 1, 4),
            var_bid: Decimal::ZERO,
            pct_change: Decimal::ZERO,
            bid: Decimal::new(bid, 4),
            ask: Decimal::new(bid + 2, 4),
            timestamp: "1697040000".to_string(),
            create_date: "2023-10-11 13:00:00".to_string(),
        }
    }

    #[test]
    fn test_insert_if_absent_checks_committed_and_pending() {
        let dir = tempdir().unwrap();
        let store = DiskStore::open(dir.path()).unwrap();

        let mut work = store.begin().unwrap();
        assert!(work.insert_currency_if_absent(currency("USD", "Dollar")).unwrap());
        assert!(!work.insert_currency_if_absent(currency("USD", "Other")).unwrap());
        work.commit().unwrap();

        let mut work = store.begin().unwrap();
        assert!(!work.insert_currency_if_absent(currency("USD", "Renamed")).unwrap());
        work.commit().unwrap();

        let usd = store.find_currency("USD").unwrap().unwrap();
        assert_eq!(usd.name, "Dollar");
        assert_eq!(store.currencies().unwrap().len(), 1);
    }

    #[test]
    fn test_uncommitted_writes_are_invisible_and_rollback_discards() {
        let dir = tempdir().unwrap();
        let store = DiskStore::open(dir.path()).unwrap();

        let mut work = store.begin().unwrap();
        work.insert_currency_if_absent(currency("EUR", "Euro")).unwrap();
        assert!(store.find_currency("EUR").unwrap().is_none());
        work.rollback();

        assert!(store.find_currency("EUR").unwrap().is_none());
        assert!(store.currencies().unwrap().is_empty());
    }

    #[test]
    fn test_conversions_are_keyed_by_pair() {
        let dir = tempdir().unwrap();
        let store = DiskStore::open(dir.path()).unwrap();
        let conversion = Conversion {
            base: "USD".to_string(),
            destination: "BRL".to_string(),
            name: "Dólar Americano/Real Brasileiro".to_string(),
            created_at: Utc::now(),
        };

        let mut work = store.begin().unwrap();
        assert!(work.insert_conversion_if_absent(conversion.clone()).unwrap());
        // The reverse direction is a different conversion
        let reverse = Conversion {
            base: "BRL".to_string(),
            destination: "USD".to_string(),
            ..conversion.clone()
        };
        assert!(work.insert_conversion_if_absent(reverse).unwrap());
        assert!(!work.insert_conversion_if_absent(conversion.clone()).unwrap());
        work.commit().unwrap();

        let found = store
            .find_conversion(&PairCode::new("USD", "BRL"))
            .unwrap()
            .unwrap();
        assert_eq!(found, conversion);
        let pairs: Vec<String> = store
            .conversions()
            .unwrap()
            .iter()
            .map(|c| c.pair().to_string())
            .collect();
        assert_eq!(pairs, vec!["BRL-USD", "USD-BRL"]);
    }

    #[test]
    fn test_quote_ids_increase_across_units_of_work() {
        let dir = tempdir().unwrap();
        let store = DiskStore::open(dir.path()).unwrap();
        let pair = PairCode::new("USD", "BRL");

        let mut work = store.begin().unwrap();
        assert_eq!(work.append_quote(quote(&pair, 50456)).unwrap(), 1);
        assert_eq!(work.append_quote(quote(&pair, 50460)).unwrap(), 2);
        work.commit().unwrap();

        let mut work = store.begin().unwrap();
        assert_eq!(work.append_quote(quote(&pair, 50470)).unwrap(), 3);
        work.rollback();

        let mut work = store.begin().unwrap();
        assert_eq!(work.append_quote(quote(&pair, 50480)).unwrap(), 3);
        work.commit().unwrap();

        let quotes = store.quotes().unwrap();
        let ids: Vec<u64> = quotes.iter().map(|q| q.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(quotes[2].bid.to_string(), "5.0480");
    }

    #[test]
    fn test_committed_data_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = DiskStore::open(dir.path()).unwrap();
            let mut work = store.begin().unwrap();
            work.insert_currency_if_absent(currency("JPY", "Yen")).unwrap();
            work.commit().unwrap();
        }

        let store = DiskStore::open(dir.path()).unwrap();
        assert_eq!(
            store.find_currency("JPY").unwrap(),
            Some(currency("JPY", "Yen"))
        );
    }
}
