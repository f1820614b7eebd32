//! Reference data entities stored by the synchronizers

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Separator between the two currency codes of a pair code.
pub const PAIR_SEPARATOR: char = '-';

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    pub code: String,
    pub name: String,
}

/// An ordered `BASE-DEST` pair of currency codes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PairCode {
    pub base: String,
    pub destination: String,
}

impl PairCode {
    pub fn new(base: &str, destination: &str) -> Self {
        PairCode {
            base: base.to_string(),
            destination: destination.to_string(),
        }
    }
}

impl Display for PairCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}{}", self.base, PAIR_SEPARATOR, self.destination)
    }
}

/// Codes end up comma-joined in request paths, so they must be plain tokens.
fn is_code(token: &str) -> bool {
    !token.is_empty()
        && !token
            .chars()
            .any(|c| c.is_whitespace() || c == ',' || c == '/')
}

impl FromStr for PairCode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = s.split(PAIR_SEPARATOR).collect();
        match tokens.as_slice() {
            [base, destination] if is_code(base) && is_code(destination) => {
                Ok(PairCode::new(base, destination))
            }
            _ => Err(anyhow!(
                "Invalid pair code '{}': expected BASE{}DEST",
                s,
                PAIR_SEPARATOR
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversion {
    pub base: String,
    pub destination: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Conversion {
    pub fn pair(&self) -> PairCode {
        PairCode::new(&self.base, &self.destination)
    }
}

/// Quote record as returned by the remote price source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRecord {
    pub code: String,
    pub codein: String,
    pub name: String,
    pub high: Decimal,
    pub low: Decimal,
    #[serde(rename = "varBid")]
    pub var_bid: Decimal,
    #[serde(rename = "pctChange")]
    pub pct_change: Decimal,
    pub bid: Decimal,
    pub ask: Decimal,
    pub timestamp: String,
    pub create_date: String,
}

impl QuoteRecord {
    pub fn pair(&self) -> PairCode {
        PairCode::new(&self.code, &self.codein)
    }
}

/// Append-only quote snapshot owned by a conversion.
///
/// `id` is assigned by the store when the unit of work appending it is
/// committed, and only orders quotes; joins always go through `conversion`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: u64,
    pub conversion: PairCode,
    pub code: String,
    pub codein: String,
    pub name: String,
    pub high: Decimal,
    pub low: Decimal,
    pub var_bid: Decimal,
    pub pct_change: Decimal,
    pub bid: Decimal,
    pub ask: Decimal,
    pub timestamp: String,
    pub create_date: String,
}

impl Quote {
    pub fn from_record(conversion: PairCode, record: &QuoteRecord) -> Self {
        Quote {
            id: 0,
            conversion,
            code: record.code.clone(),
            codein: record.codein.clone(),
            name: record.name.clone(),
            high: record.high,
            low: record.low,
            var_bid: record.var_bid,
            pct_change: record.pct_change,
            bid: record.bid,
            ask: record.ask,
            timestamp: record.timestamp.clone(),
            create_date: record.create_date.clone(),
        }
    }
}
