//! Core domain types and abstractions

pub mod config;
pub mod log;
pub mod model;
pub mod outcome;
pub mod source;
pub mod store;

// Re-export main types for cleaner imports
pub use model::{Conversion, Currency, PairCode, Quote, QuoteRecord};
pub use outcome::{SyncError, SyncOutcome};
pub use source::PriceSource;
pub use store::{ReferenceStore, UnitOfWork};
