//! Remote price source abstraction

use crate::core::model::{PairCode, QuoteRecord};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Full currency catalog as `code -> name`.
    async fn fetch_currencies(&self) -> Result<BTreeMap<String, String>>;

    /// Available conversion pairs as raw `"BASE-DEST" -> name` entries.
    async fn fetch_available_pairs(&self) -> Result<BTreeMap<String, String>>;

    /// Last quote for each pair, keyed by the source's pair key.
    async fn fetch_last_quotes(&self, pairs: &[PairCode]) -> Result<BTreeMap<String, QuoteRecord>>;
}
