//! Flattened CSV export of stored quotes

use crate::core::{Conversion, PairCode, ReferenceStore};
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

pub const EXPORT_HEADER: [&str; 5] = [
    "base_currency",
    "destination_currency",
    "purchase_value",
    "sale_value",
    "date_time",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    pub base_currency: String,
    pub destination_currency: String,
    pub purchase_value: Decimal,
    pub sale_value: Decimal,
    pub date_time: String,
}

/// Joins every stored quote with its conversion, in insertion order.
pub fn normalize(store: &dyn ReferenceStore) -> Result<Vec<ExportRow>> {
    let known: HashSet<PairCode> = store
        .conversions()?
        .iter()
        .map(Conversion::pair)
        .collect();

    let mut rows = Vec::new();
    for quote in store.quotes()? {
        if !known.contains(&quote.conversion) {
            warn!(
                "Quote {} references unknown conversion {}, skipping",
                quote.id, quote.conversion
            );
            continue;
        }
        rows.push(ExportRow {
            base_currency: quote.code,
            destination_currency: quote.codein,
            purchase_value: quote.bid,
            sale_value: quote.ask,
            date_time: quote.create_date,
        });
    }
    Ok(rows)
}

/// Writes the flattened quotes to `output_path`, replacing any existing file.
///
/// The data is written to a temporary file next to the destination and moved
/// over it once complete. Returns the number of data rows written.
pub fn export_quotes(store: &dyn ReferenceStore, output_path: &Path) -> Result<usize> {
    info!("Exporting quotes to {}", output_path.display());
    let rows = normalize(store).context("Failed to read quotes from the store")?;

    let dir = match output_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;

    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file.as_file_mut());
        writer.write_record(EXPORT_HEADER)?;
        for row in &rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
    }
    file.as_file().sync_all()?;

    file.persist(output_path)
        .with_context(|| format!("Failed to write export to {}", output_path.display()))?;

    info!("Exported {} quotes to {}", rows.len(), output_path.display());
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Quote;
    use crate::store::MemoryStore;
    use crate::sync::testing::{quote_record, seed_conversions, seed_currencies};
    use std::fs;
    use tempfile::tempdir;

    fn store_with_quotes(pairs: &[PairCode]) -> MemoryStore {
        let store = MemoryStore::new();
        seed_currencies(&store, &["USD", "EUR", "BRL", "JPY"]);
        seed_conversions(&store, pairs);
        let mut work = store.begin().unwrap();
        for pair in pairs {
            work.append_quote(Quote::from_record(pair.clone(), &quote_record(pair)))
                .unwrap();
        }
        work.commit().unwrap();
        store
    }

    #[test]
    fn test_export_writes_header_and_rows() {
        let pairs = vec![
            PairCode::new("USD", "BRL"),
            PairCode::new("EUR", "BRL"),
            PairCode::new("JPY", "BRL"),
        ];
        let store = store_with_quotes(&pairs);
        let dir = tempdir().unwrap();
        let path = dir.path().join("quotes.csv");

        let count = export_quotes(&store, &path).unwrap();

        assert_eq!(count, 3);
        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[0],
            "base_currency,destination_currency,purchase_value,sale_value,date_time"
        );
        assert_eq!(lines[1], "USD,BRL,5.0456123,5.0461000,2023-10-11 13:00:00");
        assert_eq!(lines[2], "EUR,BRL,5.0456123,5.0461000,2023-10-11 13:00:00");
        assert_eq!(lines[3], "JPY,BRL,5.0456123,5.0461000,2023-10-11 13:00:00");
    }

    #[test]
    fn test_export_overwrites_existing_file() {
        let store = store_with_quotes(&[PairCode::new("USD", "EUR")]);
        let dir = tempdir().unwrap();
        let path = dir.path().join("quotes.csv");
        fs::write(&path, "stale\ncontent\nthat\nis\nlonger\n").unwrap();

        export_quotes(&store, &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(!content.contains("stale"));
    }

    #[test]
    fn test_export_without_quotes_writes_header_only() {
        let store = MemoryStore::new();
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.csv");

        assert_eq!(export_quotes(&store, &path).unwrap(), 0);
        assert_eq!(
            fs::read_to_string(&path).unwrap().trim_end(),
            EXPORT_HEADER.join(",")
        );
    }

    #[test]
    fn test_export_to_missing_directory_fails_without_output() {
        let store = store_with_quotes(&[PairCode::new("USD", "EUR")]);
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("quotes.csv");

        assert!(export_quotes(&store, &path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_quotes_of_unknown_conversions_are_not_exported() {
        let store = store_with_quotes(&[PairCode::new("USD", "EUR")]);
        let orphan = PairCode::new("GBP", "JPY");
        let mut work = store.begin().unwrap();
        work.append_quote(Quote::from_record(orphan.clone(), &quote_record(&orphan)))
            .unwrap();
        work.commit().unwrap();

        let rows = normalize(&store).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].base_currency, "USD");
    }
}
