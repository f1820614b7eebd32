use crate::core::{PairCode, PriceSource, QuoteRecord};
use crate::providers::util::{join_pairs, with_retry};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// JSON price source serving the currency catalog, available pairs and last
/// quotes for comma separated pair lists.
pub struct AwesomeApiSource {
    base_url: String,
    client: reqwest::Client,
    retries: usize,
    retry_delay_ms: u64,
}

impl AwesomeApiSource {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("fxsync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(AwesomeApiSource {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            retries: 3,
            retry_delay_ms: 500,
        })
    }

    pub fn with_retry_policy(mut self, retries: usize, retry_delay_ms: u64) -> Self {
        self.retries = retries;
        self.retry_delay_ms = retry_delay_ms;
        self
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path);
        debug!("Requesting {}", url);

        let response = with_retry(
            || async { self.client.get(&url).send().await?.error_for_status() },
            self.retries,
            self.retry_delay_ms,
        )
        .await
        .with_context(|| format!("Request to {url} failed"))?;

        let response_text = response
            .text()
            .await
            .with_context(|| format!("Failed to read response body from {url}"))?;

        if response_text.trim().is_empty() {
            return Err(anyhow!("Received empty response from {}", url));
        }

        serde_json::from_str(&response_text)
            .with_context(|| format!("Failed to parse response from {url}: '{response_text}'"))
    }
}

#[async_trait]
impl PriceSource for AwesomeApiSource {
    async fn fetch_currencies(&self) -> Result<BTreeMap<String, String>> {
        self.get_json("json/available/uniq").await
    }

    async fn fetch_available_pairs(&self) -> Result<BTreeMap<String, String>> {
        self.get_json("json/available").await
    }

    #[instrument(skip(self, pairs), fields(pairs = pairs.len()))]
    async fn fetch_last_quotes(&self, pairs: &[PairCode]) -> Result<BTreeMap<String, QuoteRecord>> {
        if pairs.is_empty() {
            return Ok(BTreeMap::new());
        }
        self.get_json(&format!("json/last/{}", join_pairs(pairs)))
            .await
    }
}
