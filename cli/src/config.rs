use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

use pacer_core::sync::SyncConfig;

/// Overrides the platform data directory when set.
pub const DATA_DIR_ENV: &str = "PACER_DATA_DIR";

pub struct Config {
    pub data_dir: PathBuf,
    pub sync: SyncConfig,
}

impl Config {
    pub fn load() -> Result<Self> {
        let data_dir = match std::env::var_os(DATA_DIR_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => ProjectDirs::from("", "", "pacer")
                .context("Could not determine home directory")?
                .data_dir()
                .to_path_buf(),
        };

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        Ok(Config {
            data_dir,
            sync: SyncConfig::default(),
        })
    }
}
