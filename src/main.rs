use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use mfholdings::core::log::init_logging;
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

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration and sector mapping
    Setup,
    /// Download portfolio disclosure PDFs
    Scrape {
        /// Download at most this many PDFs without asking
        #[arg(long)]
        max_downloads: Option<usize>,
    },
    /// Extract holdings from downloaded PDFs
    Parse,
    /// Load parsed holdings into the store
    Import,
    /// Assign sectors to unclassified holdings
    Classify,
    /// Run scrape, parse, import and classify in sequence
    Pipeline {
        /// Download at most this many PDFs without asking
        #[arg(long)]
        max_downloads: Option<usize>,
    },
    /// Scrape holdings for catalog funds from MoneyControl and ValueResearch
    Fetch,
    /// Display a summary of stored holdings
    Status,
    /// Manage the fund catalog
    Catalog {
        #[command(subcommand)]
        command: CatalogCommands,
    },
}

#[derive(Subcommand)]
enum CatalogCommands {
    /// Load funds from a JSON array of {schemeCode, schemeName, name}
    Load { file: PathBuf },
}

impl From<Commands> for mfholdings::AppCommand {
    fn from(cmd: Commands) -> mfholdings::AppCommand {
        use mfholdings::AppCommand;
        match cmd {
            Commands::Scrape { max_downloads } => AppCommand::Scrape { max_downloads },
            Commands::Parse => AppCommand::Parse,
            Commands::Import => AppCommand::Import,
            Commands::Classify => AppCommand::Classify,
            Commands::Pipeline { max_downloads } => AppCommand::Pipeline { max_downloads },
            Commands::Fetch => AppCommand::Fetch,
            Commands::Status => AppCommand::Status,
            Commands::Catalog {
                command: CatalogCommands::Load { file },
            } => AppCommand::CatalogLoad { file },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => mfholdings::cli::setup::setup_at_path(path),
            None => mfholdings::cli::setup::setup(),
        },
        Some(cmd) => mfholdings::run_command(cmd.into(), cli.config_path.as_deref()).await,
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
