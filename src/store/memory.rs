use crate::core::{Conversion, Currency, PairCode, Quote, ReferenceStore, UnitOfWork};
use anyhow::{Result, anyhow};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

#[derive(Default)]
struct MemoryState {
    currencies: BTreeMap<String, Currency>,
    conversions: BTreeMap<String, Conversion>,
    quotes: Vec<Quote>,
}

/// In-memory reference store, used by tests
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.inner
            .lock()
            .map_err(|_| anyhow!("Memory store lock poisoned"))
    }
}

impl ReferenceStore for MemoryStore {
    fn find_currency(&self, code: &str) -> Result<Option<Currency>> {
        Ok(self.state()?.currencies.get(code).cloned())
    }

    fn find_conversion(&self, pair: &PairCode) -> Result<Option<Conversion>> {
        Ok(self.state()?.conversions.get(&pair.to_string()).cloned())
    }

    fn currencies(&self) -> Result<Vec<Currency>> {
        Ok(self.state()?.currencies.values().cloned().collect())
    }

    fn conversions(&self) -> Result<Vec<Conversion>> {
        Ok(self.state()?.conversions.values().cloned().collect())
    }

    fn quotes(&self) -> Result<Vec<Quote>> {
        Ok(self.state()?.quotes.clone())
    }

    fn begin(&self) -> Result<Box<dyn UnitOfWork + '_>> {
        let next_quote_id = self.state()?.quotes.last().map_or(1, |q| q.id + 1);
        Ok(Box::new(MemoryUnitOfWork {
            store: self,
            currencies: BTreeMap::new(),
            conversions: BTreeMap::new(),
            quotes: Vec::new(),
            next_quote_id,
        }))
    }
}

struct MemoryUnitOfWork<'a> {
    store: &'a MemoryStore,
    currencies: BTreeMap<String, Currency>,
    conversions: BTreeMap<String, Conversion>,
    quotes: Vec<Quote>,
    next_quote_id: u64,
}

impl UnitOfWork for MemoryUnitOfWork<'_> {
    fn insert_currency_if_absent(&mut self, currency: Currency) -> Result<bool> {
        if self.currencies.contains_key(&currency.code)
            || self.store.state()?.currencies.contains_key(&currency.code)
        {
            return Ok(false);
        }
        self.currencies.insert(currency.code.clone(), currency);
        Ok(true)
    }

    fn insert_conversion_if_absent(&mut self, conversion: Conversion) -> Result<bool> {
        let key = conversion.pair().to_string();
        if self.conversions.contains_key(&key)
            || self.store.state()?.conversions.contains_key(&key)
        {
            return Ok(false);
        }
        self.conversions.insert(key, conversion);
        Ok(true)
    }

    fn append_quote(&mut self, mut quote: Quote) -> Result<u64> {
        let id = self.next_quote_id;
        quote.id = id;
        self.quotes.push(quote);
        self.next_quote_id += 1;
        Ok(id)
    }

    fn commit(self: Box<Self>) -> Result<()> {
        let MemoryUnitOfWork {
            store,
            currencies,
            conversions,
            quotes,
            ..
        } = *self;
        let staged = currencies.len() + conversions.len() + quotes.len();
        let mut state = store.state()?;
        for (code, currency) in currencies {
            state.currencies.entry(code).or_insert(currency);
        }
        for (key, conversion) in conversions {
            state.conversions.entry(key).or_insert(conversion);
        }
        state.quotes.extend(quotes);
        debug!("Committed {} staged writes", staged);
        Ok(())
    }

    fn rollback(self: Box<Self>) {
        debug!(
            "Discarding {} staged writes",
            self.currencies.len() + self.conversions.len() + self.quotes.len()
        );
    }
}
