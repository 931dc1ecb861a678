pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::config::{AppConfig, WorkPaths};
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Commands that run against a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    /// Download disclosure PDFs listed on the AMFI page.
    Scrape { max_downloads: Option<usize> },
    /// Extract holdings from downloaded PDFs.
    Parse,
    /// Load parsed holdings into the store.
    Import,
    /// Backfill sectors for stored holdings.
    Classify,
    /// Scrape, parse, import and classify in sequence.
    Pipeline { max_downloads: Option<usize> },
    /// Scrape holdings pages for catalog funds.
    Fetch,
    /// Summarize the store contents.
    Status,
    /// Seed the fund catalog from a JSON file.
    CatalogLoad { file: PathBuf },
}

/// Loads the configuration. A config given by path picks up the sector
/// mapping written next to it by `setup`.
fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let Some(path) = config_path else {
        return AppConfig::load();
    };
    let mut config = AppConfig::load_from_path(path)?;
    if config.sector_mapping_path.is_none() {
        let sibling = Path::new(path).with_file_name("sector_mapping.json");
        if sibling.exists() {
            config.sector_mapping_path = Some(sibling.display().to_string());
        }
    }
    Ok(config)
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("mfholdings starting...");
    let config = load_config(config_path)?;
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Scrape { max_downloads } => {
            cli::scrape::run(&config, max_downloads).await?;
        }
        AppCommand::Parse => {
            cli::parse::run(&config)?;
        }
        AppCommand::Import => {
            let store = store::open_store(&config)?;
            let work = WorkPaths::new(config.work_dir()?);
            cli::import::run(&work, &store, &store).await?;
        }
        AppCommand::Classify => {
            let store = store::open_store(&config)?;
            let classifier = cli::classify::load_classifier(&config)?;
            cli::classify::run(&store, &classifier).await?;
        }
        AppCommand::Pipeline { max_downloads } => {
            cli::pipeline::run(&config, max_downloads).await?;
        }
        AppCommand::Fetch => {
            let store = store::open_store(&config)?;
            let chain = providers::source_chain(&config);
            cli::fetch::run(&config, &chain, &store, &store).await?;
        }
        AppCommand::Status => {
            let store = store::open_store(&config)?;
            cli::status::run(&store).await?;
        }
        AppCommand::CatalogLoad { file } => {
            let store = store::open_store(&config)?;
            cli::catalog::load(&file, &store)?;
        }
    }
    Ok(())
}
