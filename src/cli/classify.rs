use super::ui;
use crate::core::config::AppConfig;
use crate::core::sector::{DEFAULT_SECTOR_MAPPING, MappingClassifier, SectorClassifier};
use crate::core::stats::{SectorCount, sector_distribution};
use crate::core::store::HoldingsStore;
use anyhow::{Context, Result};
use comfy_table::Cell;
use tracing::{debug, info};

const PROGRESS_EVERY: usize = 100;
const BATCH_SIZE: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifyReport {
    pub classified: usize,
    pub distribution: Vec<SectorCount>,
}

/// The mapping document at the configured path. The built-in mapping is used
/// when no path was configured and the default location is empty.
pub fn load_classifier(config: &AppConfig) -> Result<MappingClassifier> {
    let path = config.sector_mapping_path()?;
    if path.exists() || config.sector_mapping_path.is_some() {
        return MappingClassifier::load(&path);
    }
    debug!(path = %path.display(), "No sector mapping on disk, using built-in mapping");
    MappingClassifier::from_json(DEFAULT_SECTOR_MAPPING)
}

/// Assigns a sector to every stored record that has none.
pub async fn run(
    store: &dyn HoldingsStore,
    classifier: &dyn SectorClassifier,
) -> Result<ClassifyReport> {
    let pending = store
        .unclassified()
        .await
        .context("Failed to read unclassified holdings")?;
    let total = pending.len();
    println!("Found {total} holdings to classify");

    let pb = ui::new_progress_bar(total as u64, false);
    let mut batch: Vec<(Vec<u8>, String)> = Vec::with_capacity(BATCH_SIZE.min(total));
    let mut classified = 0;

    for holding in pending {
        let sector = classifier.classify(&holding.record.security);
        batch.push((holding.id, sector));
        classified += 1;

        if classified % PROGRESS_EVERY == 0 {
            pb.set_position(classified as u64);
        }
        if batch.len() >= BATCH_SIZE {
            store.set_sectors(&batch).await?;
            debug!(classified, "Flushed sector batch");
            batch.clear();
        }
    }
    if !batch.is_empty() {
        store.set_sectors(&batch).await?;
    }
    pb.finish_and_clear();
    info!(classified, classifier = classifier.name(), "Classification finished");

    let distribution = sector_distribution(&store.all_holdings().await?);
    println!(
        "{} {} holdings",
        ui::style_text("Classified", ui::StyleType::TotalLabel),
        ui::style_text(&classified.to_string(), ui::StyleType::Success)
    );
    if !distribution.is_empty() {
        let mut table = ui::new_styled_table();
        table.set_header(vec![ui::header_cell("Sector"), ui::header_cell("Holdings")]);
        for row in &distribution {
            table.add_row(vec![Cell::new(&row.sector), ui::count_cell(row.holdings)]);
        }
        println!("\n{}", ui::style_text("Sector Distribution", ui::StyleType::Title));
        println!("{table}");
    }

    Ok(ClassifyReport {
        classified,
        distribution,
    })
}
