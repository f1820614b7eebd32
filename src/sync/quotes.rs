use crate::core::config::DEFAULT_BATCH_SIZE;
use crate::core::{
    Conversion, PairCode, PriceSource, Quote, QuoteRecord, ReferenceStore, SyncError, SyncOutcome,
    UnitOfWork,
};
use crate::providers::util::join_pairs;
use crate::sync::{Pacer, in_unit_of_work};
use anyhow::Result;
use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};

/// Fetches last quotes for every known conversion in fixed-size batches and
/// appends them to the store.
///
/// Each batch is committed on its own, so a failure only loses the batch in
/// flight. Batches after a failed one are not attempted.
pub struct QuoteSynchronizer<'a> {
    source: &'a dyn PriceSource,
    store: &'a dyn ReferenceStore,
    pacer: &'a dyn Pacer,
    batch_size: usize,
}

impl<'a> QuoteSynchronizer<'a> {
    pub fn new(
        source: &'a dyn PriceSource,
        store: &'a dyn ReferenceStore,
        pacer: &'a dyn Pacer,
    ) -> Self {
        QuoteSynchronizer {
            source,
            store,
            pacer,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Runs one pass over all conversions.
    ///
    /// `on_batch` is called after every batch with the number of batches
    /// processed so far and the total.
    pub async fn sync_quotes(
        &self,
        on_batch: &(dyn Fn(usize, usize) + Send + Sync),
    ) -> SyncOutcome<BTreeMap<String, QuoteRecord>> {
        info!("Synchronizing currency quotes");

        let conversions = match self.store.conversions() {
            Ok(conversions) => conversions,
            Err(e) => {
                error!("Error loading currency conversions: {e:#}");
                return SyncOutcome::failed(SyncError::Store(e));
            }
        };
        if conversions.is_empty() {
            warn!("No currency conversions found in the store");
            return SyncOutcome::NothingToDo;
        }

        let total = conversions.len().div_ceil(self.batch_size);
        let mut all_quotes = BTreeMap::new();

        for (index, batch) in conversions.chunks(self.batch_size).enumerate() {
            match self.sync_batch(batch).await {
                Ok(Some(quotes)) => {
                    all_quotes.extend(quotes);
                    on_batch(index + 1, total);
                    if index + 1 < total {
                        self.pacer.pause().await;
                    }
                }
                Ok(None) => {
                    debug!(batch = index + 1, "No valid pairs in batch, skipping");
                    on_batch(index + 1, total);
                }
                Err(error) => {
                    error!(batch = index + 1, total, "Error synchronizing quotes: {error}");
                    return SyncOutcome::Failed {
                        error,
                        partial: all_quotes,
                    };
                }
            }
        }

        info!(
            quotes = all_quotes.len(),
            batches = total,
            "Currency quotes saved to the store"
        );
        SyncOutcome::Synced(all_quotes)
    }

    /// Returns `None` when no conversion of the batch could be resolved.
    async fn sync_batch(
        &self,
        batch: &[Conversion],
    ) -> Result<Option<BTreeMap<String, QuoteRecord>>, SyncError> {
        let pairs = self.resolve_pairs(batch).map_err(SyncError::Store)?;
        if pairs.is_empty() {
            return Ok(None);
        }

        info!("Fetching quotes for: {}", join_pairs(&pairs));
        let quotes = self
            .source
            .fetch_last_quotes(&pairs)
            .await
            .map_err(SyncError::Transport)?;

        let appended = in_unit_of_work(self.store, |work| self.append_quotes(work, &quotes))
            .map_err(SyncError::Store)?;
        debug!(received = quotes.len(), appended, "Quote batch committed");

        Ok(Some(quotes))
    }

    fn resolve_pairs(&self, batch: &[Conversion]) -> Result<Vec<PairCode>> {
        let mut pairs = Vec::with_capacity(batch.len());
        for conversion in batch {
            let base = self.store.find_currency(&conversion.base)?;
            let destination = self.store.find_currency(&conversion.destination)?;
            match (base, destination) {
                (Some(base), Some(destination)) => {
                    pairs.push(PairCode::new(&base.code, &destination.code))
                }
                _ => warn!(
                    "Could not resolve currencies for conversion {}, omitting it",
                    conversion.pair()
                ),
            }
        }
        Ok(pairs)
    }

    fn append_quotes(
        &self,
        work: &mut dyn UnitOfWork,
        quotes: &BTreeMap<String, QuoteRecord>,
    ) -> Result<usize> {
        let mut appended = 0;
        for (key, record) in quotes {
            let pair = record.pair();
            if self.store.find_conversion(&pair)?.is_none() {
                warn!("No conversion found for quote {key} ({pair}), skipping");
                continue;
            }
            let id = work.append_quote(Quote::from_record(pair, record))?;
            debug!(id, "Added quote for: {}", record.name);
            appended += 1;
        }
        Ok(appended)
    }
}
