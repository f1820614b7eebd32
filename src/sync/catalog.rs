use crate::core::{Currency, PriceSource, ReferenceStore, SyncError, SyncOutcome};
use crate::sync::in_unit_of_work;
use std::collections::BTreeMap;
use tracing::{debug, error, info};

/// Pulls the currency catalog and stores currencies not seen before.
///
/// Existing currencies keep the name they were first stored with. Returns the
/// catalog as received.
pub async fn sync_catalog(
    source: &dyn PriceSource,
    store: &dyn ReferenceStore,
) -> SyncOutcome<BTreeMap<String, String>> {
    info!("Synchronizing currency catalog");

    let catalog = match source.fetch_currencies().await {
        Ok(catalog) => catalog,
        Err(e) => {
            error!("Error fetching currency catalog: {e:#}");
            return SyncOutcome::failed(SyncError::Transport(e));
        }
    };

    let result = in_unit_of_work(store, |work| {
        let mut inserted = 0usize;
        for (code, name) in &catalog {
            let currency = Currency {
                code: code.clone(),
                name: name.clone(),
            };
            if work.insert_currency_if_absent(currency)? {
                debug!("Added new currency: {code} - {name}");
                inserted += 1;
            }
        }
        Ok(inserted)
    });

    match result {
        Ok(inserted) => {
            info!(
                received = catalog.len(),
                inserted, "Currency catalog saved to the store"
            );
            SyncOutcome::Synced(catalog)
        }
        Err(e) => {
            error!("Error saving currency catalog: {e:#}");
            SyncOutcome::failed(SyncError::Store(e))
        }
    }
}
