use crate::core::{Conversion, PairCode, PriceSource, ReferenceStore, SyncError, SyncOutcome};
use crate::sync::in_unit_of_work;
use chrono::Utc;
use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};

#[derive(Debug, Default)]
struct PairStats {
    inserted: usize,
    malformed: usize,
    unresolved: usize,
}

/// Pulls the available conversion pairs and stores the ones whose currencies
/// are already cataloged.
///
/// Malformed pair codes and pairs referencing unknown currencies are skipped
/// with a warning. Returns the pairs as received.
pub async fn sync_conversions(
    source: &dyn PriceSource,
    store: &dyn ReferenceStore,
) -> SyncOutcome<BTreeMap<String, String>> {
    info!("Synchronizing currency conversions");

    let available = match source.fetch_available_pairs().await {
        Ok(available) => available,
        Err(e) => {
            error!("Error fetching currency conversions: {e:#}");
            return SyncOutcome::failed(SyncError::Transport(e));
        }
    };
    info!("Retrieved {} currency conversions from source", available.len());

    let created_at = Utc::now();
    let result = in_unit_of_work(store, |work| {
        let mut stats = PairStats::default();
        for (pair_code, name) in &available {
            let pair: PairCode = match pair_code.parse() {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("Skipping conversion: {e}");
                    stats.malformed += 1;
                    continue;
                }
            };

            let base = store.find_currency(&pair.base)?;
            let destination = store.find_currency(&pair.destination)?;
            if base.is_none() || destination.is_none() {
                warn!("Could not find currencies for conversion {pair_code}");
                stats.unresolved += 1;
                continue;
            }

            let conversion = Conversion {
                base: pair.base,
                destination: pair.destination,
                name: name.clone(),
                created_at,
            };
            if work.insert_conversion_if_absent(conversion)? {
                debug!("Added new conversion: {pair_code} - {name}");
                stats.inserted += 1;
            }
        }
        Ok(stats)
    });

    match result {
        Ok(stats) => {
            info!(
                received = available.len(),
                inserted = stats.inserted,
                malformed = stats.malformed,
                unresolved = stats.unresolved,
                "Currency conversions saved to the store"
            );
            SyncOutcome::Synced(available)
        }
        Err(e) => {
            error!("Error saving currency conversions: {e:#}");
            SyncOutcome::failed(SyncError::Store(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::sync::testing::{FailingStore, StubSource, capture_logs, seed_currencies};

    fn stored_pairs(store: &MemoryStore) -> Vec<String> {
        store
            .conversions()
            .unwrap()
            .iter()
            .map(|c| c.pair().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_pairs_are_stored_when_currencies_known() {
        let store = MemoryStore::new();
        seed_currencies(&store, &["USD", "EUR", "BRL"]);
        let source = StubSource::with_pairs(&[
            ("USD-BRL", "Dólar Americano/Real Brasileiro"),
            ("EUR-BRL", "Euro/Real Brasileiro"),
        ]);

        let outcome = sync_conversions(&source, &store).await;

        assert_eq!(outcome.into_data().len(), 2);
        assert_eq!(stored_pairs(&store), vec!["EUR-BRL", "USD-BRL"]);
        let conversion = store
            .find_conversion(&PairCode::new("USD", "BRL"))
            .unwrap()
            .unwrap();
        assert_eq!(conversion.name, "Dólar Americano/Real Brasileiro");
    }

    #[tokio::test]
    async fn test_pairs_before_catalog_creates_nothing() {
        let store = MemoryStore::new();
        let source = StubSource::with_pairs(&[("USD-BRL", "Dólar"), ("EUR-BRL", "Euro")]);
        let (_guard, logs) = capture_logs();

        let outcome = sync_conversions(&source, &store).await;

        assert!(matches!(outcome, SyncOutcome::Synced(_)));
        assert!(store.conversions().unwrap().is_empty());
        let logs = logs.contents();
        let warnings: Vec<&str> = logs
            .lines()
            .filter(|line| line.contains("WARN"))
            .collect();
        assert_eq!(warnings.len(), 2, "unexpected log output: {logs}");
        assert!(warnings[0].contains("EUR-BRL"));
        assert!(warnings[1].contains("USD-BRL"));
    }

    #[tokio::test]
    async fn test_pair_store_failure_writes_nothing() {
        let inner = MemoryStore::new();
        seed_currencies(&inner, &["USD", "EUR", "BRL"]);
        let store = FailingStore::new(inner, 1);
        let source = StubSource::with_pairs(&[
            ("USD-BRL", "Dólar Americano/Real Brasileiro"),
            ("EUR-BRL", "Euro/Real Brasileiro"),
        ]);

        let outcome = sync_conversions(&source, &store).await;

        assert!(matches!(outcome.error(), Some(SyncError::Store(_))));
        assert_eq!(store.rollbacks(), 1);
        assert!(store.conversions().unwrap().is_empty());
        assert_eq!(store.currencies().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_malformed_pair_is_skipped() {
        let store = MemoryStore::new();
        seed_currencies(&store, &["USD", "EUR"]);
        let source = StubSource::with_pairs(&[
            ("USDEUR", "no separator"),
            ("USD-EUR-BRL", "too many tokens"),
            ("USD-EUR", "Dólar Americano/Euro"),
        ]);

        let outcome = sync_conversions(&source, &store).await;

        assert!(matches!(outcome, SyncOutcome::Synced(_)));
        assert_eq!(stored_pairs(&store), vec!["USD-EUR"]);
    }

    #[tokio::test]
    async fn test_pair_sync_is_idempotent() {
        let store = MemoryStore::new();
        seed_currencies(&store, &["USD", "EUR"]);
        let source = StubSource::with_pairs(&[("USD-EUR", "Dólar Americano/Euro")]);

        sync_conversions(&source, &store).await;
        let first = store.conversions().unwrap();
        sync_conversions(&source, &store).await;

        // created_at of the first pass is kept
        assert_eq!(store.conversions().unwrap(), first);
    }

    #[tokio::test]
    async fn test_pair_transport_failure_writes_nothing() {
        let store = MemoryStore::new();
        seed_currencies(&store, &["USD", "EUR"]);

        let outcome = sync_conversions(&StubSource::default(), &store).await;

        assert!(outcome.is_failed());
        assert!(store.conversions().unwrap().is_empty());
    }
}
