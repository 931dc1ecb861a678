use super::{classify, import, parse, scrape, ui};
use crate::core::config::{AppConfig, WorkPaths};
use crate::store::open_store;
use anyhow::Result;
use comfy_table::Cell;
use std::fmt::Display;
use std::time::{Duration, Instant};
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Scrape,
    Parse,
    Import,
    Classify,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Scrape, Stage::Parse, Stage::Import, Stage::Classify];

    fn description(&self) -> &'static str {
        match self {
            Stage::Scrape => "Download portfolio disclosure PDFs",
            Stage::Parse => "Extract holdings tables from the PDFs",
            Stage::Import => "Load parsed holdings into the store",
            Stage::Classify => "Assign sectors to unclassified holdings",
        }
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Scrape => "Scrape",
            Stage::Parse => "Parse",
            Stage::Import => "Import",
            Stage::Classify => "Classify",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug)]
pub struct StageOutcome {
    pub stage: Stage,
    pub error: Option<anyhow::Error>,
}

#[derive(Debug)]
pub struct PipelineReport {
    pub outcomes: Vec<StageOutcome>,
    pub elapsed: Duration,
}

impl PipelineReport {
    pub fn halted_at(&self) -> Option<Stage> {
        self.outcomes
            .iter()
            .find(|o| o.error.is_some())
            .map(|o| o.stage)
    }

    pub fn display(&self) {
        ui::print_separator();
        println!("{}", ui::style_text("Pipeline Summary", ui::StyleType::Title));
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Stage"),
            ui::header_cell("Status"),
            ui::header_cell("Error"),
        ]);
        for (i, outcome) in self.outcomes.iter().enumerate() {
            table.add_row(vec![
                Cell::new(format!("{}. {}", i + 1, outcome.stage)),
                ui::status_cell(outcome.error.is_none()),
                Cell::new(
                    outcome
                        .error
                        .as_ref()
                        .map(|e| format!("{e:#}"))
                        .unwrap_or_default(),
                ),
            ]);
        }
        println!("{table}");
        println!("Total time: {:.1} seconds", self.elapsed.as_secs_f64());
        match self.halted_at() {
            Some(stage) => println!(
                "{}",
                ui::style_text(&format!("Pipeline stopped at: {stage}"), ui::StyleType::Error)
            ),
            None => println!(
                "{}",
                ui::style_text("All stages completed successfully", ui::StyleType::Success)
            ),
        }
    }
}

/// Runs the stages in order and stops at the first one that fails.
pub async fn drive<F>(mut run_stage: F) -> PipelineReport
where
    F: AsyncFnMut(Stage) -> Result<()>,
{
    let start = Instant::now();
    let mut outcomes = Vec::with_capacity(Stage::ALL.len());
    for stage in Stage::ALL {
        ui::print_banner(&format!("Stage: {stage}"), stage.description());
        let result = run_stage(stage).await;
        let failed = result.is_err();
        match &result {
            Ok(()) => info!(%stage, "Stage completed"),
            Err(e) => error!(%stage, error = %e, "Stage failed"),
        }
        outcomes.push(StageOutcome {
            stage,
            error: result.err(),
        });
        if failed {
            break;
        }
    }
    PipelineReport {
        outcomes,
        elapsed: start.elapsed(),
    }
}

pub async fn run(config: &AppConfig, max_downloads: Option<usize>) -> Result<()> {
    let store = open_store(config)?;
    let work = WorkPaths::new(config.work_dir()?);

    let report = drive(async |stage| match stage {
        Stage::Scrape => scrape::run(config, max_downloads).await.map(|_| ()),
        Stage::Parse => parse::run(config).map(|_| ()),
        Stage::Import => import::run(&work, &store, &store).await.map(|_| ()),
        Stage::Classify => {
            let classifier = classify::load_classifier(config)?;
            classify::run(&store, &classifier).await.map(|_| ())
        }
    })
    .await;
    report.display();

    match report.halted_at() {
        Some(stage) => anyhow::bail!("Pipeline stopped at stage {stage}"),
        None => Ok(()),
    }
}
