use crate::core::config::AppConfig;
use crate::core::sector::DEFAULT_SECTOR_MAPPING;
use anyhow::{Context, Result};
use std::path::Path;

const EXAMPLE_CONFIG: &str = include_str!("../../docs/example_config.yaml");

fn write_new(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        anyhow::bail!("File already exists at {}", path.display());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!("Created {}", path.display());
    Ok(())
}

/// Creates the default configuration file and sector mapping at the default
/// locations.
pub fn setup() -> Result<()> {
    let path = AppConfig::default_config_path()?;
    setup_at_path(&path)
}

/// Creates a configuration file at `path`, plus the default sector mapping
/// next to it unless one is already there.
pub fn setup_at_path<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }
    write_new(path, EXAMPLE_CONFIG)?;

    let mapping = path.with_file_name("sector_mapping.json");
    if !mapping.exists() {
        write_new(&mapping, DEFAULT_SECTOR_MAPPING)?;
    }
    println!("Created configuration at {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_setup_creates_config_and_mapping() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("config.yaml");

        setup_at_path(&config_path)?;

        let content = fs::read_to_string(&config_path)?;
        assert!(content.contains("# Example configuration file for mfholdings"));
        assert!(content.contains("sources:"));
        assert!(content.contains("throttle:"));
        assert!(temp_dir.path().join("sector_mapping.json").exists());
        Ok(())
    }

    #[test]
    fn test_setup_fails_if_config_exists() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(&config_path, "test")?;

        let result = setup_at_path(&config_path);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("already exists"));
        Ok(())
    }

    #[test]
    fn test_example_config_is_valid_yaml() -> Result<()> {
        let config: AppConfig =
            serde_yaml::from_str(EXAMPLE_CONFIG).context("Failed to parse example config")?;
        assert_eq!(config.fetch.stop_after, 5);
        assert_eq!(config.throttle.adapter_delay_secs, 2);
        assert!(config.sources.moneycontrol.starts_with("https://"));
        Ok(())
    }
}
