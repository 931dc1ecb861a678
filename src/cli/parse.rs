use super::ui;
use crate::core::artifacts::{
    ParseSummary, ParsedDocument, ParsedFundSummary, ScrapeMetadata, read_json, write_json,
};
use crate::core::config::{AppConfig, WorkPaths};
use crate::providers::pdf_table::PdfHoldingsReader;
use anyhow::{Context, Result};
use chrono::Utc;
use std::path::Path;
use tracing::{debug, warn};

pub fn run(config: &AppConfig) -> Result<ParseSummary> {
    let work = WorkPaths::new(config.work_dir()?);
    parse_documents(&work, &PdfHoldingsReader::default())
}

/// Parses every downloaded document listed in the scrape metadata into
/// `parsed_holdings/`. Documents without a usable holdings table are skipped.
pub fn parse_documents(work: &WorkPaths, reader: &PdfHoldingsReader) -> Result<ParseSummary> {
    let metadata_file = work.metadata_file();
    if !metadata_file.exists() {
        anyhow::bail!(
            "No metadata file found at {}. Run `scrape` first.",
            metadata_file.display()
        );
    }
    let metadata: ScrapeMetadata = read_json(&metadata_file)?;
    let parsed_dir = work.parsed_dir();
    std::fs::create_dir_all(&parsed_dir)
        .with_context(|| format!("Failed to create directory: {}", parsed_dir.display()))?;

    let documents: Vec<_> = metadata.pdfs.iter().filter(|p| p.is_downloaded()).collect();
    println!("Parsing {} PDFs...", documents.len());

    let pb = ui::new_progress_bar(documents.len() as u64, true);
    let mut funds = Vec::new();
    let mut skipped = 0;

    for doc in documents {
        pb.inc(1);
        let Some(local_path) = doc.local_path.as_deref() else {
            continue;
        };
        let path = Path::new(local_path);
        pb.set_message(ui::truncate(&doc.filename, 40));
        if !path.exists() {
            pb.println(format!("  File not found: {}", path.display()));
            skipped += 1;
            continue;
        }

        let holdings = match reader.read(path) {
            Ok(holdings) if !holdings.is_empty() => holdings,
            Ok(_) => {
                pb.println(format!("  {} no holdings rows", doc.filename));
                skipped += 1;
                continue;
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Skipping document");
                pb.println(format!(
                    "  {} {}: {e}",
                    ui::style_text("✗", ui::StyleType::Warning),
                    doc.filename
                ));
                skipped += 1;
                continue;
            }
        };

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| doc.filename.replace(".pdf", ""));
        let output_file = parsed_dir.join(format!("{stem}.json"));
        let parsed = ParsedDocument::new(&doc.fund_name, &doc.filename, holdings);
        write_json(&output_file, &parsed)?;
        debug!(file = %output_file.display(), holdings = parsed.total_holdings, "Wrote parsed holdings");

        funds.push(ParsedFundSummary {
            fund_name: doc.fund_name.clone(),
            filename: format!("{stem}.json"),
            holdings_count: parsed.total_holdings,
            output_file: output_file.display().to_string(),
        });
    }
    pb.finish_and_clear();

    let summary = ParseSummary {
        parsed_at: Utc::now(),
        total_parsed: funds.len(),
        skipped,
        funds,
    };
    write_json(&work.parse_summary_file(), &summary)?;

    println!(
        "{} {} funds, {} skipped",
        ui::style_text("Parsed", ui::StyleType::TotalLabel),
        ui::style_text(&summary.total_parsed.to_string(), ui::StyleType::Success),
        summary.skipped
    );
    println!("Output saved to {}", parsed_dir.display());
    Ok(summary)
}
