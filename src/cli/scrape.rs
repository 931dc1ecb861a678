use super::ui;
use crate::core::artifacts::{PdfSourceMetadata, ScrapeMetadata, write_json};
use crate::core::config::{AppConfig, WorkPaths};
use crate::providers::amfi_disclosures::AmfiDisclosures;
use anyhow::{Context, Result};
use chrono::Utc;
use console::Term;
use tracing::{info, warn};

/// How many of `total` documents to fetch. An explicit cap wins; otherwise
/// the user is asked, and anything but `y` fetches only the preview count.
fn download_count(
    total: usize,
    max_downloads: Option<usize>,
    preview: usize,
    confirm_all: impl FnOnce() -> Result<bool>,
) -> Result<usize> {
    let count = match max_downloads {
        Some(cap) => cap,
        None if confirm_all()? => total,
        None => preview,
    };
    Ok(count.min(total))
}

fn ask_download_all(total: usize) -> Result<bool> {
    let term = Term::stdout();
    if !term.is_term() {
        return Ok(false);
    }
    term.write_str(&format!("\nDownload all {total} PDFs? (y/n): "))?;
    let answer = term.read_line()?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

/// Lists disclosure documents, downloads the chosen subset and rewrites the
/// scrape metadata file.
pub async fn run(config: &AppConfig, max_downloads: Option<usize>) -> Result<ScrapeMetadata> {
    let work = WorkPaths::new(config.work_dir()?);
    let amfi = AmfiDisclosures::new(&config.sources.amfi_disclosures);

    let documents = amfi
        .list_documents()
        .await
        .context("Failed to read the disclosure listing")?;
    if documents.is_empty() {
        anyhow::bail!(
            "No portfolio PDFs found on {}",
            config.sources.amfi_disclosures
        );
    }

    println!("Found {} portfolio PDFs", documents.len());
    for doc in documents.iter().take(5) {
        println!("  • {}", ui::truncate(&doc.fund_name, 60));
    }

    let count = download_count(
        documents.len(),
        max_downloads,
        config.scrape.preview_downloads,
        || ask_download_all(documents.len()),
    )?;
    println!("\nDownloading {count} PDFs...");

    let pdf_dir = work.pdf_dir();
    let delay = config.throttle.download_delay();
    let pb = ui::new_progress_bar(count as u64, true);
    let mut attempted: Vec<PdfSourceMetadata> = Vec::with_capacity(count);

    for (i, mut doc) in documents.iter().take(count).cloned().enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        pb.set_message(ui::truncate(&doc.filename, 40));
        match amfi.download(&doc, &pdf_dir).await {
            Ok(downloaded) => {
                doc.local_path = Some(downloaded.path.display().to_string());
                doc.downloaded_at = Some(Utc::now());
                doc.file_size = Some(downloaded.size);
            }
            Err(e) => {
                warn!(url = %doc.url, error = %e, "Download failed");
                pb.println(format!(
                    "  {} {}: {e}",
                    ui::style_text("✗", ui::StyleType::Error),
                    doc.filename
                ));
                doc.error = Some(format!("{e:#}"));
            }
        }
        attempted.push(doc);
        pb.inc(1);
    }
    pb.finish_and_clear();

    let metadata = ScrapeMetadata::new(documents.len(), attempted);
    write_json(&work.metadata_file(), &metadata)?;
    info!(
        downloaded = metadata.downloaded,
        failed = metadata.failed,
        "Scrape finished"
    );

    println!(
        "{} {}",
        ui::style_text("Downloaded:", ui::StyleType::TotalLabel),
        ui::style_text(&metadata.downloaded.to_string(), ui::StyleType::Success)
    );
    println!(
        "{} {}",
        ui::style_text("Failed:", ui::StyleType::TotalLabel),
        metadata.failed
    );
    println!("Metadata saved to {}", work.metadata_file().display());
    Ok(metadata)
}
