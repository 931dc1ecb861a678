use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("in", "mfholdings", "mfholdings")
        .context("Could not determine project directories")
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct SourcesConfig {
    pub moneycontrol: String,
    pub valueresearch: String,
    pub amfi_disclosures: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        SourcesConfig {
            moneycontrol: "https://www.moneycontrol.com".to_string(),
            valueresearch: "https://www.valueresearchonline.com".to_string(),
            amfi_disclosures:
                "https://www.amfiindia.com/research-information/portfolio-disclosures".to_string(),
        }
    }
}

/// Fixed pauses between requests, in seconds.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ThrottleConfig {
    pub adapter_delay_secs: u64,
    pub fund_delay_secs: u64,
    pub download_delay_secs: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        ThrottleConfig {
            adapter_delay_secs: 2,
            fund_delay_secs: 3,
            download_delay_secs: 2,
        }
    }
}

impl ThrottleConfig {
    pub fn adapter_delay(&self) -> Duration {
        Duration::from_secs(self.adapter_delay_secs)
    }

    pub fn fund_delay(&self) -> Duration {
        Duration::from_secs(self.fund_delay_secs)
    }

    pub fn download_delay(&self) -> Duration {
        Duration::from_secs(self.download_delay_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct FetchConfig {
    /// Catalog funds considered per run.
    pub fund_limit: usize,
    /// Stop once this many funds were imported.
    pub stop_after: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            fund_limit: 20,
            stop_after: 5,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ScrapeConfig {
    /// Documents downloaded when the user declines a full download.
    pub preview_downloads: usize,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        ScrapeConfig {
            preview_downloads: 5,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub data_path: Option<String>,
    pub work_dir: Option<String>,
    pub sector_mapping_path: Option<String>,
    pub sources: SourcesConfig,
    pub throttle: ThrottleConfig,
    pub fetch: FetchConfig,
    pub scrape: ScrapeConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join("config.yaml"))
    }

    /// Location of the fjall keyspace.
    pub fn data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        Ok(project_dirs()?.data_dir().join("store"))
    }

    /// Root of the intermediate files shared by the scrape, parse and
    /// import stages.
    pub fn work_dir(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.work_dir {
            return Ok(PathBuf::from(custom_path));
        }
        Ok(project_dirs()?.data_dir().join("work"))
    }

    pub fn sector_mapping_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.sector_mapping_path {
            return Ok(PathBuf::from(custom_path));
        }
        Ok(project_dirs()?.config_dir().join("sector_mapping.json"))
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}

/// Paths of the intermediate artifacts under the work directory.
#[derive(Debug, Clone)]
pub struct WorkPaths {
    root: PathBuf,
}

impl WorkPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn metadata_file(&self) -> PathBuf {
        self.root.join("pdf_metadata.json")
    }

    pub fn pdf_dir(&self) -> PathBuf {
        self.root.join("pdfs")
    }

    pub fn parsed_dir(&self) -> PathBuf {
        self.root.join("parsed_holdings")
    }

    pub fn parse_summary_file(&self) -> PathBuf {
        self.parsed_dir().join("_summary.json")
    }
}
