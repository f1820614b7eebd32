//! Reference store abstractions
//!
//! Reads always see committed state. Writes go through a [`UnitOfWork`] that
//! is either committed as a whole or rolled back.

use crate::core::model::{Conversion, Currency, PairCode, Quote};
use anyhow::Result;

pub trait ReferenceStore: Send + Sync {
    fn find_currency(&self, code: &str) -> Result<Option<Currency>>;

    fn find_conversion(&self, pair: &PairCode) -> Result<Option<Conversion>>;

    fn currencies(&self) -> Result<Vec<Currency>>;

    /// All conversions ordered by pair code.
    fn conversions(&self) -> Result<Vec<Conversion>>;

    /// All quotes in insertion order.
    fn quotes(&self) -> Result<Vec<Quote>>;

    fn begin(&self) -> Result<Box<dyn UnitOfWork + '_>>;
}

pub trait UnitOfWork: Send {
    /// Inserts the currency unless its code is already known. Returns whether
    /// a row was added.
    fn insert_currency_if_absent(&mut self, currency: Currency) -> Result<bool>;

    /// Inserts the conversion unless its pair is already known. Returns
    /// whether a row was added.
    fn insert_conversion_if_absent(&mut self, conversion: Conversion) -> Result<bool>;

    /// Appends a quote and returns the id it will be stored under.
    fn append_quote(&mut self, quote: Quote) -> Result<u64>;

    fn commit(self: Box<Self>) -> Result<()>;

    fn rollback(self: Box<Self>);
}
