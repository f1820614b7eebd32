//! Synchronization stages pulling reference data from a [`PriceSource`] into
//! a [`ReferenceStore`]
//!
//! [`PriceSource`]: crate::core::PriceSource

pub mod catalog;
pub mod pacing;
pub mod pairs;
pub mod quotes;

pub use catalog::sync_catalog;
pub use pacing::{FixedDelay, NoDelay, Pacer};
pub use pairs::sync_conversions;
pub use quotes::QuoteSynchronizer;

use crate::core::{ReferenceStore, UnitOfWork};
use anyhow::Result;

/// Runs `f` inside a fresh unit of work, committing on success and rolling
/// back on any error.
pub(crate) fn in_unit_of_work<'s, T>(
    store: &'s dyn ReferenceStore,
    f: impl FnOnce(&mut (dyn UnitOfWork + 's)) -> Result<T>,
) -> Result<T> {
    let mut work = store.begin()?;
    match f(work.as_mut()) {
        Ok(value) => {
            work.commit()?;
            Ok(value)
        }
        Err(e) => {
            work.rollback();
            Err(e)
        }
    }
}
