pub mod cli;
pub mod core;
pub mod export;
pub mod providers;
pub mod store;
pub mod sync;

use anyhow::Result;
use std::path::PathBuf;
use tracing::{debug, info};

pub enum AppCommand {
    Currencies,
    Conversions,
    Quotes,
    Export { output: Option<PathBuf> },
    Status,
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let config = match config_path {
        Some(path) => crate::core::config::AppConfig::load_from_path(path)?,
        None => crate::core::config::AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let store = crate::store::open_store(&config)?;
    let source = crate::providers::AwesomeApiSource::new(&config.api.base_url)?
        .with_retry_policy(config.api.retries, config.api.retry_delay_ms);

    match command {
        AppCommand::Currencies => {
            info!("Starting currency catalog synchronization");
            cli::commands::currencies(&source, &store).await
        }
        AppCommand::Conversions => {
            info!("Starting currency conversion synchronization");
            cli::commands::conversions(&source, &store).await
        }
        AppCommand::Quotes => {
            info!("Starting currency quote synchronization");
            cli::commands::quotes(&source, &store, &config).await
        }
        AppCommand::Export { output } => {
            let output = output.unwrap_or_else(|| config.export.output_path.clone());
            cli::commands::export(&store, &output)
        }
        AppCommand::Status => cli::commands::status(&store),
    }
}
