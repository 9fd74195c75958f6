use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Run configuration: where the yearly budget books live and where the
/// output store goes. Loaded from an optional YAML file; a missing file
/// means defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory of yearly source files.
    pub raw_dir: PathBuf,
    /// SQLite database the run writes.
    pub db_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("raw"),
            db_path: PathBuf::from("exports/budgets.db"),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_yaml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }
}
