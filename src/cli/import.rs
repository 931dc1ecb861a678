use super::ui;
use crate::core::artifacts::{ParsedDocument, read_json};
use crate::core::config::WorkPaths;
use crate::core::holding::Snapshot;
use crate::core::importer::HoldingsImporter;
use crate::core::store::{FundCatalog, HoldingsStore};
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
    pub records: usize,
    pub total_in_store: usize,
}

fn parsed_files(work: &WorkPaths) -> Result<Vec<PathBuf>> {
    let dir = work.parsed_dir();
    if !dir.is_dir() {
        anyhow::bail!("Directory not found: {}. Run `parse` first.", dir.display());
    }
    let mut files: Vec<PathBuf> = std::fs::read_dir(&dir)
        .with_context(|| format!("Failed to list {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
            name.ends_with(".json") && !name.starts_with('_')
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Loads every parsed document into the store as the current month's
/// disclosure snapshot. Unreadable files are skipped; store failures abort.
pub async fn run(
    work: &WorkPaths,
    store: &dyn HoldingsStore,
    catalog: &dyn FundCatalog,
) -> Result<ImportReport> {
    let files = parsed_files(work)?;
    store
        .ensure_indexes()
        .await
        .context("Failed to create holdings indexes")?;
    let importer = HoldingsImporter::new(store, catalog);

    println!("Importing {} funds...", files.len());
    let mut report = ImportReport {
        imported: 0,
        skipped: 0,
        records: 0,
        total_in_store: 0,
    };

    for file in files {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let document: ParsedDocument = match read_json(&file) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(file = %file.display(), error = %e, "Skipping unreadable file");
                println!(
                    "  {} {} - {e:#}",
                    ui::style_text("✗", ui::StyleType::Error),
                    ui::truncate(&name, 50)
                );
                report.skipped += 1;
                continue;
            }
        };
        let fund = ui::truncate(&document.fund_name, 50);
        if document.holdings.is_empty() {
            println!(
                "  {} {fund} - No holdings data",
                ui::style_text("!", ui::StyleType::Warning)
            );
            report.skipped += 1;
            continue;
        }

        let written = importer
            .import_holdings(
                None,
                &document.fund_name,
                &document.holdings,
                Snapshot::MonthStart,
            )
            .await
            .with_context(|| format!("Failed to import holdings for {}", document.fund_name))?;
        println!(
            "  {} {fund} - {written} holdings",
            ui::style_text("✓", ui::StyleType::Success)
        );
        report.imported += 1;
        report.records += written;
    }

    report.total_in_store = store.count().await?;
    println!(
        "\n{} {} funds, skipped {}",
        ui::style_text("Imported:", ui::StyleType::TotalLabel),
        ui::style_text(&report.imported.to_string(), ui::StyleType::Success),
        report.skipped
    );
    println!("Total holdings in store: {}", report.total_in_store);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::artifacts::write_json;
    use crate::core::holding::{FundKey, NormalizedHolding};
    use crate::core::store::FundEntry;
    use crate::store::memory::MemoryStore;
    use tempfile::TempDir;

    fn holding(security: &str, weight: Option<f64>) -> NormalizedHolding {
        NormalizedHolding {
            security: security.to_string(),
            weight,
            market_value: None,
            sector: None,
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_import_parsed_documents() -> Result<()> {
        let dir = TempDir::new()?;
        let work = WorkPaths::new(dir.path());
        let parsed = work.parsed_dir();
        write_json(
            &parsed.join("axis.json"),
            &ParsedDocument::new(
                "Axis Bluechip Fund",
                "axis.pdf",
                vec![holding("Infosys Ltd", Some(6.1)), holding("Treasury Bill", None)],
            ),
        )?;
        write_json(
            &parsed.join("empty.json"),
            &ParsedDocument::new("Empty Fund", "empty.pdf", vec![]),
        )?;
        std::fs::write(parsed.join("broken.json"), "{not json")?;
        std::fs::write(parsed.join("_summary.json"), "{}")?;

        let store = MemoryStore::new();
        store.load_funds(&[FundEntry {
            scheme_code: Some("120503".to_string()),
            scheme_name: Some("Axis Bluechip Fund - Direct".to_string()),
            name: None,
        }]);

        let report = run(&work, &store, &store).await?;
        assert_eq!(
            report,
            ImportReport {
                imported: 1,
                skipped: 2,
                records: 2,
                total_in_store: 2,
            }
        );

        let stored = store
            .find_holdings(&FundKey::Code("120503".to_string()))
            .await?;
        assert_eq!(stored.len(), 2);

        // Running the stage again replaces the month's snapshot.
        run(&work, &store, &store).await?;
        assert_eq!(store.count().await?, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_import_without_parsed_dir_fails() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        let err = run(&WorkPaths::new(dir.path()), &store, &store)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Run `parse` first"));
    }
}
