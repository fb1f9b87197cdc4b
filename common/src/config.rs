use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::AegisError;

/// Raw shape of the on-disk config document; every field is optional and
/// falls back to the Level-0 defaults below.
#[derive(Debug, Clone, Deserialize, Default)]
struct RawConfig {
    root_dir: Option<String>,
    metadata_file: Option<String>,
    journal_file: Option<String>,
    data_dir: Option<String>,
    log_dir: Option<String>,
}

/// Resolved configuration: every path is absolute and rooted at `root_dir`.
#[derive(Debug, Clone)]
pub struct Config {
    pub root_dir: PathBuf,
    pub metadata_file: PathBuf,
    pub journal_file: PathBuf,
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AegisError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let raw: RawConfig = serde_json::from_str(&text)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, AegisError> {
        let root_str = raw.root_dir.as_deref().unwrap_or(".");
        std::fs::create_dir_all(root_str)?;
        let root_dir = std::fs::canonicalize(root_str)?;

        Ok(Self {
            metadata_file: root_dir.join(
                raw.metadata_file
                    .unwrap_or_else(|| "mds_metadata.json".to_string()),
            ),
            journal_file: root_dir.join(
                raw.journal_file
                    .unwrap_or_else(|| "mds_journal.log".to_string()),
            ),
            data_dir: root_dir.join(raw.data_dir.unwrap_or_else(|| "data".to_string())),
            log_dir: root_dir.join(raw.log_dir.unwrap_or_else(|| "logs".to_string())),
            root_dir,
        })
    }

    /// Resolves the config document from `AEGISFS_CONFIG`, defaulting to
    /// `./config.json`, mirroring `load_level0_config` in the original.
    pub fn load() -> Result<Self, AegisError> {
        let path = std::env::var("AEGISFS_CONFIG").unwrap_or_else(|_| "./config.json".to_string());
        Self::from_file(path)
    }
}
