use super::ui;
use crate::core::stats::{StoreStats, compute_stats};
use crate::core::store::HoldingsStore;
use anyhow::{Context, Result};
use comfy_table::Cell;

const TOP_N: usize = 5;

fn display(stats: &StoreStats) {
    println!(
        "{} {} holdings across {} funds",
        ui::style_text("Total:", ui::StyleType::TotalLabel),
        ui::style_text(&stats.total.to_string(), ui::StyleType::Success),
        stats.funds
    );

    let mut funds = ui::new_styled_table();
    funds.set_header(vec![
        ui::header_cell("Fund"),
        ui::header_cell("Scheme Code"),
        ui::header_cell("Holdings"),
        ui::header_cell("Latest Report"),
    ]);
    for fund in &stats.top_funds {
        funds.add_row(vec![
            Cell::new(ui::truncate(&fund.fund_name, 50)),
            Cell::new(fund.scheme_code.as_deref().unwrap_or("-")),
            ui::count_cell(fund.holdings),
            Cell::new(fund.latest_report.format("%Y-%m-%d")),
        ]);
    }
    println!("\n{}", ui::style_text("Top Funds", ui::StyleType::Title));
    println!("{funds}");

    println!(
        "\n{} {}/{} ({:.1}%)",
        ui::style_text("Sector coverage:", ui::StyleType::TotalLabel),
        stats.classified,
        stats.total,
        stats.coverage()
    );
    if !stats.top_sectors.is_empty() {
        let mut sectors = ui::new_styled_table();
        sectors.set_header(vec![ui::header_cell("Sector"), ui::header_cell("Holdings")]);
        for sector in &stats.top_sectors {
            sectors.add_row(vec![Cell::new(&sector.sector), ui::count_cell(sector.holdings)]);
        }
        println!("{sectors}");
    }

    if let Some(first) = stats.sample.first() {
        let mut sample = ui::new_styled_table();
        sample.set_header(vec![
            ui::header_cell("Security"),
            ui::header_cell("Weight"),
            ui::header_cell("Sector"),
        ]);
        for h in &stats.sample {
            sample.add_row(vec![
                Cell::new(ui::truncate(&h.security, 40)),
                ui::format_optional_cell(h.weight, |w| format!("{w:.2}%")),
                Cell::new(h.sector.as_deref().unwrap_or("-")),
            ]);
        }
        println!(
            "\n{} {}",
            ui::style_text("Sample:", ui::StyleType::Title),
            first.fund_name
        );
        println!("{sample}");
    }
}

/// Summarizes the store contents. An empty store is an error.
pub async fn run(store: &dyn HoldingsStore) -> Result<StoreStats> {
    let records = store
        .all_holdings()
        .await
        .context("Failed to read holdings")?;
    if records.is_empty() {
        anyhow::bail!("No holdings in the store. Run `pipeline` or `fetch` first.");
    }
    let stats = compute_stats(&records, TOP_N);
    display(&stats);
    Ok(stats)
}
