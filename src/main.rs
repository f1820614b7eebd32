use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use fxsync::core::log::init_logging;
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for fxsync::AppCommand {
    fn from(cmd: Commands) -> fxsync::AppCommand {
        match cmd {
            Commands::Currencies => fxsync::AppCommand::Currencies,
            Commands::Conversions => fxsync::AppCommand::Conversions,
            Commands::Quotes => fxsync::AppCommand::Quotes,
            Commands::Export { output } => fxsync::AppCommand::Export { output },
            Commands::Status => fxsync::AppCommand::Status,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Synchronize the currency catalog
    Currencies,
    /// Synchronize available conversion pairs
    Conversions,
    /// Fetch the latest quote of every known conversion
    Quotes,
    /// Export stored quotes to a CSV file
    Export {
        /// Destination file, overrides the configured output path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show what is in the local store
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => fxsync::cli::setup::setup(),
        Some(cmd) => fxsync::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
