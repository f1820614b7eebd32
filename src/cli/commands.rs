use super::ui;
use crate::core::config::AppConfig;
use crate::core::{PriceSource, QuoteRecord, ReferenceStore, SyncOutcome};
use crate::export::export_quotes;
use crate::sync::{FixedDelay, QuoteSynchronizer, sync_catalog, sync_conversions};
use anyhow::Result;
use comfy_table::Cell;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{error, info};

/// Prints a one line summary of a sync pass.
fn report<T>(label: &str, outcome: &SyncOutcome<BTreeMap<String, T>>) {
    let line = match outcome {
        SyncOutcome::Synced(data) => ui::style_text(
            &format!("{label}: {} entries synchronized", data.len()),
            ui::StyleType::Success,
        ),
        SyncOutcome::NothingToDo => ui::style_text(
            &format!("{label}: nothing to synchronize"),
            ui::StyleType::Warning,
        ),
        SyncOutcome::Failed { error, partial } => ui::style_text(
            &format!(
                "{label}: failed after {} entries, try again later ({error})",
                partial.len()
            ),
            ui::StyleType::Error,
        ),
    };
    println!("{line}");
}

pub async fn currencies(source: &dyn PriceSource, store: &dyn ReferenceStore) -> Result<()> {
    let outcome = sync_catalog(source, store).await;
    report("Currencies", &outcome);
    Ok(())
}

pub async fn conversions(source: &dyn PriceSource, store: &dyn ReferenceStore) -> Result<()> {
    let outcome = sync_conversions(source, store).await;
    report("Conversions", &outcome);
    Ok(())
}

pub async fn quotes(
    source: &dyn PriceSource,
    store: &dyn ReferenceStore,
    config: &AppConfig,
) -> Result<()> {
    let pacer = FixedDelay(config.sync.pace());
    let synchronizer =
        QuoteSynchronizer::new(source, store, &pacer).with_batch_size(config.sync.batch_size);

    let pb = ui::new_progress_bar(0, true);
    pb.set_message("Fetching quotes...");
    let outcome = synchronizer
        .sync_quotes(&|done, total| {
            pb.set_length(total as u64);
            pb.set_position(done as u64);
        })
        .await;
    pb.finish_and_clear();

    if let SyncOutcome::Synced(quotes) | SyncOutcome::Failed { partial: quotes, .. } = &outcome
        && !quotes.is_empty()
    {
        println!("{}", quotes_table(quotes));
    }
    report("Quotes", &outcome);
    Ok(())
}

fn quotes_table(quotes: &BTreeMap<String, QuoteRecord>) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Pair"),
        ui::header_cell("Name"),
        ui::header_cell("Bid"),
        ui::header_cell("Ask"),
        ui::header_cell("Change (%)"),
        ui::header_cell("Date"),
    ]);
    for record in quotes.values() {
        table.add_row(vec![
            Cell::new(record.pair().to_string()),
            Cell::new(&record.name),
            ui::number_cell(record.bid),
            ui::number_cell(record.ask),
            ui::number_cell(record.pct_change),
            Cell::new(&record.create_date),
        ]);
    }
    table.to_string()
}

pub fn export(store: &dyn ReferenceStore, output_path: &Path) -> Result<()> {
    match export_quotes(store, output_path) {
        Ok(count) => {
            println!(
                "{}",
                ui::style_text(
                    &format!("Exported {count} quotes to {}", output_path.display()),
                    ui::StyleType::Success,
                )
            );
        }
        Err(e) => {
            error!("Error exporting quotes: {e:#}");
            println!(
                "{}",
                ui::style_text(&format!("Export failed: {e:#}"), ui::StyleType::Error)
            );
        }
    }
    Ok(())
}

/// Shows stored row counts and the latest quote of every conversion.
pub fn status(store: &dyn ReferenceStore) -> Result<()> {
    let currencies = store.currencies()?;
    let conversions = store.conversions()?;
    let quotes = store.quotes()?;
    info!(
        currencies = currencies.len(),
        conversions = conversions.len(),
        quotes = quotes.len(),
        "Loaded store status"
    );

    let mut counts = ui::new_styled_table();
    counts.set_header(vec![ui::header_cell("Entity"), ui::header_cell("Rows")]);
    counts.add_row(vec![Cell::new("Currencies"), ui::number_cell(currencies.len())]);
    counts.add_row(vec![Cell::new("Conversions"), ui::number_cell(conversions.len())]);
    counts.add_row(vec![Cell::new("Quotes"), ui::number_cell(quotes.len())]);
    println!("{}\n{counts}", ui::style_text("Store", ui::StyleType::Title));

    if conversions.is_empty() {
        return Ok(());
    }

    // Quotes are in insertion order, so the last one per pair is the latest
    let latest: HashMap<_, _> = quotes.iter().map(|q| (&q.conversion, q)).collect();

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Conversion"),
        ui::header_cell("Name"),
        ui::header_cell("Bid"),
        ui::header_cell("Ask"),
        ui::header_cell("Quoted at"),
    ]);
    for conversion in &conversions {
        let quote = latest.get(&conversion.pair()).copied();
        table.add_row(vec![
            Cell::new(conversion.pair().to_string()),
            Cell::new(&conversion.name),
            ui::format_optional_cell(quote, |q| q.bid.to_string()),
            ui::format_optional_cell(quote, |q| q.ask.to_string()),
            match quote {
                Some(q) => Cell::new(&q.create_date),
                None => Cell::new(ui::style_text("never", ui::StyleType::Subtle)),
            },
        ]);
    }
    println!(
        "\n{}\n{table}",
        ui::style_text("Latest quotes", ui::StyleType::Title)
    );
    Ok(())
}
