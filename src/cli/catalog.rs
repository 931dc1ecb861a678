use super::ui;
use crate::core::artifacts::read_json;
use crate::core::store::FundEntry;
use crate::store::FjallStore;
use anyhow::{Context, Result};
use std::path::Path;

/// Seeds the fund catalog from a JSON array of
/// `{"schemeCode", "schemeName", "name"}` objects.
pub fn load(file: &Path, store: &FjallStore) -> Result<usize> {
    let funds: Vec<FundEntry> = read_json(file)?;
    let loaded = store
        .load_funds(&funds)
        .context("Failed to write the fund catalog")?;
    let without_code = funds.iter().filter(|f| f.scheme_code.is_none()).count();

    println!(
        "{} {} funds from {}",
        ui::style_text("Loaded", ui::StyleType::TotalLabel),
        ui::style_text(&loaded.to_string(), ui::StyleType::Success),
        file.display()
    );
    if without_code > 0 {
        println!(
            "{}",
            ui::style_text(
                &format!("{without_code} funds have no scheme code and are never fetched"),
                ui::StyleType::Warning
            )
        );
    }
    Ok(loaded)
}
