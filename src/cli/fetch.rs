use super::ui;
use crate::core::config::AppConfig;
use crate::core::holding::{NormalizedHolding, Snapshot};
use crate::core::importer::HoldingsImporter;
use crate::core::normalize::normalize_scraped;
use crate::core::sector::{KeywordClassifier, SectorClassifier};
use crate::core::source::SourceChain;
use crate::core::store::{FundCatalog, HoldingsStore};
use anyhow::{Context, Result};
use comfy_table::Cell;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FetchReport {
    pub succeeded: usize,
    pub failed: usize,
}

fn print_top_holdings(holdings: &[NormalizedHolding]) {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("#"),
        ui::header_cell("Security"),
        ui::header_cell("Weight"),
        ui::header_cell("Sector"),
    ]);
    for (i, h) in holdings.iter().take(5).enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(ui::truncate(&h.security, 40)),
            ui::format_optional_cell(h.weight, |w| format!("{w:.2}%")),
            Cell::new(h.sector.as_deref().unwrap_or("-")),
        ]);
    }
    println!("{table}");
}

/// Scrapes holdings for catalog funds through the source chain and replaces
/// each fund's stored holdings with the result.
pub async fn run(
    config: &AppConfig,
    chain: &SourceChain,
    store: &dyn HoldingsStore,
    catalog: &dyn FundCatalog,
) -> Result<FetchReport> {
    let funds: Vec<_> = catalog
        .funds()
        .await
        .context("Failed to read the fund catalog")?
        .into_iter()
        .filter(|f| f.scheme_code.is_some())
        .take(config.fetch.fund_limit)
        .collect();
    if funds.is_empty() {
        anyhow::bail!("No funds with a scheme code in the catalog. Run `catalog load` first.");
    }
    println!(
        "Found {} funds, trying {}",
        funds.len(),
        chain.source_names().join(", ")
    );

    store
        .ensure_indexes()
        .await
        .context("Failed to create holdings indexes")?;
    let importer = HoldingsImporter::new(store, catalog);
    let classifier = KeywordClassifier;
    let fund_delay = config.throttle.fund_delay();
    let total = funds.len();
    let mut report = FetchReport::default();

    for (i, fund) in funds.iter().enumerate() {
        if i > 0 && !fund_delay.is_zero() {
            tokio::time::sleep(fund_delay).await;
        }
        let fund_name = fund.display_name();
        ui::print_banner(
            &format!("[{}/{}] {}", i + 1, total, fund_name),
            "Fetching holdings",
        );

        let Some(hit) = chain.fetch(fund_name).await else {
            println!(
                "{}",
                ui::style_text("Could not fetch holdings", ui::StyleType::Error)
            );
            report.failed += 1;
            continue;
        };

        let holdings: Vec<NormalizedHolding> = normalize_scraped(&hit.rows)
            .into_iter()
            .map(|mut h| {
                h.sector = Some(classifier.classify(&h.security));
                h
            })
            .collect();
        println!("Found {} holdings on {}", holdings.len(), hit.source);

        let written = importer
            .import_holdings(
                fund.scheme_code.as_deref(),
                fund_name,
                &holdings,
                Snapshot::Now,
            )
            .await
            .with_context(|| format!("Failed to import holdings for {fund_name}"))?;
        if written == 0 {
            println!(
                "{}",
                ui::style_text("No usable holdings rows", ui::StyleType::Error)
            );
            report.failed += 1;
            continue;
        }

        println!(
            "{} {written} holdings",
            ui::style_text("Imported", ui::StyleType::Success)
        );
        print_top_holdings(&holdings);
        report.succeeded += 1;

        if report.succeeded >= config.fetch.stop_after {
            println!("\nFetched {} funds, stopping.", report.succeeded);
            break;
        }
    }

    info!(
        succeeded = report.succeeded,
        failed = report.failed,
        "Fetch finished"
    );
    ui::print_separator();
    println!(
        "{} {}",
        ui::style_text("Successful:", ui::StyleType::TotalLabel),
        ui::style_text(&report.succeeded.to_string(), ui::StyleType::Success)
    );
    println!(
        "{} {}",
        ui::style_text("Failed:", ui::StyleType::TotalLabel),
        report.failed
    );
    Ok(report)
}
